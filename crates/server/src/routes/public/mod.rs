//! Public storefront API: catalog browsing plus quote and booking requests.

pub mod bookings;
pub mod catalog;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::get_product))
        .route("/brands", get(catalog::list_brands))
        .route("/brands/{slug}", get(catalog::get_brand))
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{slug}", get(catalog::get_category))
        .route("/services", get(catalog::list_services))
        .route("/services/{slug}", get(catalog::get_service))
        .route("/service-categories", get(catalog::list_service_categories))
        .route("/hero-banners", get(catalog::list_hero_banners))
        .route("/quotes", post(bookings::request_quote))
        .route("/appointments", post(bookings::book_appointment))
}
