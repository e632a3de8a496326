//! Homepage hero banner management.

use axum::extract::State;
use tireshop_core::HeroBannerId;

use crate::db::{HeroBannerRepository, hero_banners::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::{
    Audience, CatalogQuery, HeroBanner, HeroBannerPatch, NewHeroBanner, ReorderRequest,
};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<ApiResponse<Vec<HeroBanner>>> {
    let filter = query.filter(Audience::Admin)?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = HeroBannerRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<HeroBannerId>,
) -> Result<ApiResponse<HeroBanner>> {
    let banner = HeroBannerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Hero banner"))?;
    Ok(ApiResponse::ok(banner))
}

/// Without `sortOrder` the banner goes to the end of the list.
pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewHeroBanner>,
) -> Result<ApiResponse<HeroBanner>> {
    let banner = HeroBannerRepository::new(state.pool()).create(&new).await?;
    Ok(ApiResponse::created(banner).with_message("Hero banner created"))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<HeroBannerId>,
    ValidJson(patch): ValidJson<HeroBannerPatch>,
) -> Result<ApiResponse<HeroBanner>> {
    let banner = HeroBannerRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Hero banner"))?;
    Ok(ApiResponse::ok(banner).with_message("Hero banner updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<HeroBannerId>,
) -> Result<ApiResponse<serde_json::Value>> {
    HeroBannerRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Hero banner"))?;
    Ok(ApiResponse::message_only("Hero banner deleted"))
}

/// `PUT /api/admin/hero-banners/reorder` - `{"items": [{"id", "sortOrder"}]}`,
/// applied atomically. Returns every banner in the new order.
pub async fn reorder(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ReorderRequest>,
) -> Result<ApiResponse<Vec<HeroBanner>>> {
    let banners = HeroBannerRepository::new(state.pool())
        .reorder(&request)
        .await
        .map_err(|e| AppError::from_repo(e, "Hero banner"))?;
    Ok(ApiResponse::ok(banners).with_message("Hero banners reordered"))
}
