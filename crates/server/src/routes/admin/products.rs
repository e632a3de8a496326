//! Product management.

use axum::extract::State;
use tireshop_core::ProductId;

use crate::db::{ProductRepository, products::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::product::ProductQuery;
use crate::models::{Audience, NewProduct, Product, ProductPatch};
use crate::response::ApiResponse;
use crate::routes::slug_for_create;
use crate::state::AppState;

/// `GET /api/admin/products` - all products, including inactive ones.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<ApiResponse<Vec<Product>>> {
    let filter = query.filter(Audience::Admin)?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = ProductRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::ok(product))
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewProduct>,
) -> Result<ApiResponse<Product>> {
    let slug = slug_for_create(new.slug.as_deref(), &new.name)?;
    let product = ProductRepository::new(state.pool())
        .create(&new, &slug)
        .await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    Ok(ApiResponse::created(product).with_message("Product created"))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ValidJson(patch): ValidJson<ProductPatch>,
) -> Result<ApiResponse<Product>> {
    let product = ProductRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Product"))?;
    Ok(ApiResponse::ok(product).with_message("Product updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<serde_json::Value>> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Product"))?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(ApiResponse::message_only("Product deleted"))
}
