//! Tire shop storefront and back-office API.
//!
//! The crate is a library so the router can be exercised in-process by the
//! integration tests; `main.rs` only wires configuration and serves it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::error::AppError;
use crate::state::AppState;

/// Path prefix uploaded files are served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Build the complete application router.
///
/// The session store is a parameter so tests can run without a database.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let uploads = ServeDir::new(&state.config().uploads.dir);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api", routes::api_routes())
        .nest_service(UPLOADS_ROUTE, uploads)
        .fallback(route_not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::internal_error_detail_middleware,
        ))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode, header};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::ServerConfig;
    use crate::services::{LocalStorage, LogMailer};

    fn test_app(upload_dir: &std::path::Path) -> Router {
        let dir = upload_dir.display().to_string();
        let config = ServerConfig::from_lookup(move |key: &str| match key {
            "TIRESHOP_DATABASE_URL" => Some("postgres://localhost/tireshop_test".to_string()),
            "TIRESHOP_BASE_URL" => Some("http://localhost:3000".to_string()),
            "TIRESHOP_UPLOAD_DIR" => Some(dir.clone()),
            _ => None,
        })
        .unwrap();
        // Never connects unless a handler touches the database.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tireshop_test")
            .unwrap();
        let storage = Arc::new(LocalStorage::from_config(&config.uploads));
        let state = AppState::new(config, pool, Arc::new(LogMailer), storage);
        app(state, SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> Response {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        app.oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = send(test_app(dir.path()), Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_admin_routes_require_login() {
        let dir = tempfile::tempdir().unwrap();
        for uri in ["/api/admin/products", "/api/admin/stats", "/api/admin/quotes/1"] {
            let response = send(test_app(dir.path()), Method::GET, uri, None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(
                body_json(response).await,
                serde_json::json!({"success": false, "message": "Authentication required"})
            );
        }
    }

    #[tokio::test]
    async fn test_anonymous_session_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let response = send(test_app(dir.path()), Method::GET, "/api/auth/session", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_booking_is_rejected_before_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let response = send(
            test_app(dir.path()),
            Method::POST,
            "/api/appointments",
            Some(r#"{"customerName": ""}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let response = send(test_app(dir.path()), Method::GET, "/api/nope", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": false, "message": "Route not found"})
        );
    }

    #[tokio::test]
    async fn test_serves_uploaded_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("banners")).unwrap();
        std::fs::write(dir.path().join("banners/a.txt"), "hello").unwrap();

        let response = send(test_app(dir.path()), Method::GET, "/uploads/banners/a.txt", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");
    }
}
