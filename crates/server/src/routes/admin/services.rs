//! Workshop services and service categories.

use axum::extract::State;
use tireshop_core::{ServiceCategoryId, ServiceId};

use crate::db::services::{CATEGORY_SORT_COLUMNS, SORT_COLUMNS};
use crate::db::{ServiceCategoryRepository, ServiceRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::service::ServiceQuery;
use crate::models::{
    Audience, CatalogQuery, NewService, NewServiceCategory, Service, ServiceCategory,
    ServiceCategoryPatch, ServicePatch,
};
use crate::response::ApiResponse;
use crate::routes::slug_for_create;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceQuery>,
) -> Result<ApiResponse<Vec<Service>>> {
    let filter = query.filter(Audience::Admin)?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = ServiceRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceId>,
) -> Result<ApiResponse<Service>> {
    let service = ServiceRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Service"))?;
    Ok(ApiResponse::ok(service))
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewService>,
) -> Result<ApiResponse<Service>> {
    let slug = slug_for_create(new.slug.as_deref(), &new.name)?;
    let service = ServiceRepository::new(state.pool())
        .create(&new, &slug)
        .await?;
    Ok(ApiResponse::created(service).with_message("Service created"))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceId>,
    ValidJson(patch): ValidJson<ServicePatch>,
) -> Result<ApiResponse<Service>> {
    let service = ServiceRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Service"))?;
    Ok(ApiResponse::ok(service).with_message("Service updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceId>,
) -> Result<ApiResponse<serde_json::Value>> {
    ServiceRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Service"))?;
    Ok(ApiResponse::message_only("Service deleted"))
}

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<ApiResponse<Vec<ServiceCategory>>> {
    let filter = query.filter(Audience::Admin)?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&CATEGORY_SORT_COLUMNS);

    let (items, total) = ServiceCategoryRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceCategoryId>,
) -> Result<ApiResponse<ServiceCategory>> {
    let category = ServiceCategoryRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Service category"))?;
    Ok(ApiResponse::ok(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewServiceCategory>,
) -> Result<ApiResponse<ServiceCategory>> {
    let slug = slug_for_create(new.slug.as_deref(), &new.name)?;
    let category = ServiceCategoryRepository::new(state.pool())
        .create(&new, &slug)
        .await?;
    Ok(ApiResponse::created(category).with_message("Service category created"))
}

pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceCategoryId>,
    ValidJson(patch): ValidJson<ServiceCategoryPatch>,
) -> Result<ApiResponse<ServiceCategory>> {
    let category = ServiceCategoryRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Service category"))?;
    Ok(ApiResponse::ok(category).with_message("Service category updated"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ServiceCategoryId>,
) -> Result<ApiResponse<serde_json::Value>> {
    ServiceCategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Service category"))?;
    Ok(ApiResponse::message_only("Service category deleted"))
}
