//! Admin back-office API.
//!
//! Every route here sits behind [`require_admin`]; handlers never check
//! roles themselves.

pub mod appointments;
pub mod brands;
pub mod categories;
pub mod hero_banners;
pub mod products;
pub mod quotes;
pub mod services;
pub mod stats;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post, put},
};

use crate::middleware::require_admin;
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for multipart framing and the `folder` field on top of the file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/brands", get(brands::list).post(brands::create))
        .route(
            "/brands/{id}",
            get(brands::get).put(brands::update).delete(brands::delete),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/{id}",
            get(services::get).put(services::update).delete(services::delete),
        )
        .route(
            "/service-categories",
            get(services::list_categories).post(services::create_category),
        )
        .route(
            "/service-categories/{id}",
            get(services::get_category)
                .put(services::update_category)
                .delete(services::delete_category),
        )
        .route("/quotes", get(quotes::list).post(quotes::create))
        .route(
            "/quotes/{id}",
            get(quotes::get).put(quotes::update).delete(quotes::delete),
        )
        .route("/quotes/{id}/send", post(quotes::send))
        .route("/appointments", get(appointments::list))
        .route("/appointments/stats", get(appointments::stats))
        .route(
            "/appointments/{id}",
            get(appointments::get)
                .put(appointments::update)
                .delete(appointments::delete),
        )
        .route(
            "/hero-banners",
            get(hero_banners::list).post(hero_banners::create),
        )
        .route("/hero-banners/reorder", put(hero_banners::reorder))
        .route(
            "/hero-banners/{id}",
            get(hero_banners::get)
                .put(hero_banners::update)
                .delete(hero_banners::delete),
        )
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/stats", get(stats::dashboard))
        .route_layer(from_fn(require_admin))
}
