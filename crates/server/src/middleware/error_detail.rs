//! Internal error detail for non-production deployments.
//!
//! [`AppError`](crate::error::AppError) always renders a 5xx as
//! "Internal server error" and attaches the real message as an
//! [`InternalErrorDetail`] extension. Outside production this layer swaps the
//! detail into the response body so developers see what failed.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::response::ErrorBody;
use crate::state::AppState;

/// The underlying error text of a 5xx response.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

pub async fn internal_error_detail_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config().is_production() {
        return response;
    }
    match response.extensions().get::<InternalErrorDetail>() {
        Some(InternalErrorDetail(detail)) => {
            ErrorBody::new(detail.clone()).into_response_with(response.status())
        }
        None => response,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::error::AppError;
    use crate::state::test_state;

    async fn failing_message(environment: &'static str) -> String {
        let state = test_state(environment);
        let router: Router = Router::new()
            .route(
                "/boom",
                get(|| async { AppError::Internal("pool exhausted".to_string()) }),
            )
            .route("/gone", get(|| async { AppError::not_found("Product") }))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                internal_error_detail_middleware,
            ))
            .with_state(state);

        let gone = router
            .clone()
            .oneshot(axum::http::Request::get("/gone").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(axum::http::Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        json["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_development_shows_detail() {
        assert_eq!(failing_message("development").await, "Internal error: pool exhausted");
    }

    #[tokio::test]
    async fn test_production_hides_detail() {
        assert_eq!(failing_message("production").await, "Internal server error");
    }
}
