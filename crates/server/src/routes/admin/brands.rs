//! Brand management.

use axum::extract::State;
use tireshop_core::BrandId;

use crate::db::{BrandRepository, brands::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::{Audience, Brand, BrandPatch, CatalogQuery, NewBrand};
use crate::response::ApiResponse;
use crate::routes::slug_for_create;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<ApiResponse<Vec<Brand>>> {
    let filter = query.filter(Audience::Admin)?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = BrandRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BrandId>,
) -> Result<ApiResponse<Brand>> {
    let brand = BrandRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Brand"))?;
    Ok(ApiResponse::ok(brand))
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewBrand>,
) -> Result<ApiResponse<Brand>> {
    let slug = slug_for_create(new.slug.as_deref(), &new.name)?;
    let brand = BrandRepository::new(state.pool()).create(&new, &slug).await?;
    Ok(ApiResponse::created(brand).with_message("Brand created"))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BrandId>,
    ValidJson(patch): ValidJson<BrandPatch>,
) -> Result<ApiResponse<Brand>> {
    let brand = BrandRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Brand"))?;
    Ok(ApiResponse::ok(brand).with_message("Brand updated"))
}

/// Products of a deleted brand keep existing with no brand.
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BrandId>,
) -> Result<ApiResponse<serde_json::Value>> {
    BrandRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Brand"))?;
    Ok(ApiResponse::message_only("Brand deleted"))
}
