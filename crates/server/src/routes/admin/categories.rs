//! Category tree management.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tireshop_core::CategoryId;

use crate::db::{CategoryRepository, categories::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::category::{CategoryQuery, build_tree};
use crate::models::{Audience, Category, CategoryPatch, NewCategory};
use crate::response::ApiResponse;
use crate::routes::slug_for_create;
use crate::state::AppState;

/// Flat page, or with `?tree=true` the whole tree including inactive nodes.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<Response> {
    let repo = CategoryRepository::new(state.pool());
    if query.wants_tree() {
        let all = repo.list_all(false).await?;
        return Ok(ApiResponse::ok(build_tree(all)).into_response());
    }

    let filter = query.filter(Audience::Admin)?;
    let page = query.catalog.list.page_request(Audience::Admin);
    let sort = query.catalog.list.sort(&SORT_COLUMNS);
    let (items, total) = repo.list(&filter, sort, page).await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)).into_response())
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<ApiResponse<Category>> {
    let category = CategoryRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    Ok(ApiResponse::ok(category))
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewCategory>,
) -> Result<ApiResponse<Category>> {
    let slug = slug_for_create(new.slug.as_deref(), &new.name)?;
    let category = CategoryRepository::new(state.pool())
        .create(&new, &slug)
        .await?;
    Ok(ApiResponse::created(category).with_message("Category created"))
}

/// Re-parenting under one of its own descendants is rejected with 400.
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ValidJson(patch): ValidJson<CategoryPatch>,
) -> Result<ApiResponse<Category>> {
    let category = CategoryRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Category"))?;
    Ok(ApiResponse::ok(category).with_message("Category updated"))
}

/// Categories with subcategories cannot be deleted (400).
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<ApiResponse<serde_json::Value>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Category"))?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(ApiResponse::message_only("Category deleted"))
}
