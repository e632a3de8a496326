//! Read-only catalog endpoints. Inactive rows are invisible here.

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::db::{
    BrandRepository, CategoryRepository, HeroBannerRepository, ProductRepository,
    ServiceCategoryRepository, ServiceRepository, brands, categories, products, services,
};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::models::category::{CategoryQuery, build_tree};
use crate::models::product::ProductQuery;
use crate::models::service::ServiceQuery;
use crate::models::{
    Audience, Brand, CatalogQuery, Category, HeroBanner, Product, Service, ServiceCategory,
};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<ApiResponse<Vec<Product>>> {
    let filter = query.filter(Audience::Public)?;
    let page = query.list.page_request(Audience::Public);
    let sort = query.list.sort(&products::SORT_COLUMNS);

    let (items, total) = ProductRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug, true)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::ok(product))
}

pub async fn list_brands(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<ApiResponse<Vec<Brand>>> {
    let filter = query.filter(Audience::Public)?;
    let page = query.list.page_request(Audience::Public);
    let sort = query.list.sort(&brands::SORT_COLUMNS);

    let (items, total) = BrandRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get_brand(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse<Brand>> {
    let brand = BrandRepository::new(state.pool())
        .get_by_slug(&slug, true)
        .await?
        .ok_or_else(|| AppError::not_found("Brand"))?;
    Ok(ApiResponse::ok(brand))
}

/// Flat page by default; `?tree=true` returns every active category nested.
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<axum::response::Response> {
    use axum::response::IntoResponse;

    let repo = CategoryRepository::new(state.pool());
    if query.wants_tree() {
        let all = repo.list_all(true).await?;
        return Ok(ApiResponse::ok(build_tree(all)).into_response());
    }

    let filter = query.filter(Audience::Public)?;
    let page = query.catalog.list.page_request(Audience::Public);
    let sort = query.catalog.list.sort(&categories::SORT_COLUMNS);
    let (items, total) = repo.list(&filter, sort, page).await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)).into_response())
}

/// A category with its direct (active) subcategories.
#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse<CategoryDetail>> {
    let repo = CategoryRepository::new(state.pool());
    let category = repo
        .get_by_slug(&slug, true)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    let children = repo.children(category.id, true).await?;
    Ok(ApiResponse::ok(CategoryDetail { category, children }))
}

pub async fn list_services(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceQuery>,
) -> Result<ApiResponse<Vec<Service>>> {
    let filter = query.filter(Audience::Public)?;
    let page = query.list.page_request(Audience::Public);
    let sort = query.list.sort(&services::SORT_COLUMNS);

    let (items, total) = ServiceRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get_service(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse<Service>> {
    let service = ServiceRepository::new(state.pool())
        .get_by_slug(&slug, true)
        .await?
        .ok_or_else(|| AppError::not_found("Service"))?;
    Ok(ApiResponse::ok(service))
}

pub async fn list_service_categories(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ServiceCategory>>> {
    let items = ServiceCategoryRepository::new(state.pool())
        .list_active()
        .await?;
    Ok(ApiResponse::ok(items))
}

pub async fn list_hero_banners(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<HeroBanner>>> {
    let banners = HeroBannerRepository::new(state.pool())
        .list_live(Utc::now())
        .await?;
    Ok(ApiResponse::ok(banners))
}
