//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready
//!
//! # Public catalog
//! GET  /api/products                 - Paginated, filterable product list
//! GET  /api/products/{slug}
//! GET  /api/brands                   GET /api/brands/{slug}
//! GET  /api/categories[?tree=true]   GET /api/categories/{slug}
//! GET  /api/services                 GET /api/services/{slug}
//! GET  /api/service-categories
//! GET  /api/hero-banners             - Active banners inside their schedule
//!
//! # Public requests
//! POST /api/quotes                   - Quote request, priced server-side
//! POST /api/appointments             - Booking
//!
//! # Auth
//! POST /api/auth/register | login | logout
//! GET  /api/auth/session
//!
//! # Admin (behind the admin gate)
//! /api/admin/{products,brands,categories,services,service-categories,
//!             quotes,appointments,hero-banners}[/{id}]
//! POST /api/admin/quotes/{id}/send
//! GET  /api/admin/appointments/stats
//! PUT  /api/admin/hero-banners/reorder
//! POST /api/admin/uploads
//! GET  /api/admin/stats
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod public;

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{FieldErrors, resolve_slug};

/// Every `/api` route, admin routes included (already gated).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(public::routes())
        .nest("/auth", auth::routes())
        .nest("/admin", admin::routes())
}

/// Slug for a new record, or a 400 naming the `slug` field.
pub(crate) fn slug_for_create(explicit: Option<&str>, name: &str) -> Result<String, AppError> {
    resolve_slug(explicit, name).ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add("slug", "must contain at least one letter or digit");
        AppError::Validation(errors)
    })
}
