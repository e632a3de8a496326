//! Router behaviour that never reaches the database.

use axum::http::StatusCode;
use serde_json::json;
use tireshop_integration_tests::TestApp;

#[tokio::test]
async fn admin_api_requires_a_session() {
    let mut app = TestApp::without_database();
    for uri in [
        "/api/admin/products",
        "/api/admin/quotes/7",
        "/api/admin/appointments/stats",
        "/api/admin/hero-banners",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["message"], "Authentication required");
    }
}

#[tokio::test]
async fn admin_writes_are_gated_before_body_parsing() {
    let mut app = TestApp::without_database();
    let response = app.post("/api/admin/products", json!({"not": "a product"})).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let upload = app
        .upload("/api/admin/uploads", None, "a.png", "image/png", b"png")
        .await;
    assert_eq!(upload.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_session_is_null() {
    let mut app = TestApp::without_database();
    let response = app.get("/api/auth/session").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"success": true, "data": null}));
}

#[tokio::test]
async fn booking_in_the_past_lists_the_field() {
    let mut app = TestApp::without_database();
    let response = app
        .post(
            "/api/appointments",
            json!({
                "customerName": "Ana Ruiz",
                "customerEmail": "ana@example.com",
                "customerPhone": "+34 600 000 000",
                "scheduledDate": "2000-01-01",
                "scheduledTime": "10:00:00"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Validation failed");
    assert_eq!(response.body["errors"]["scheduledDate"], "cannot be in the past");
}

#[tokio::test]
async fn quote_request_needs_items() {
    let mut app = TestApp::without_database();
    let response = app
        .post(
            "/api/quotes",
            json!({"customerName": "Ana", "customerEmail": "ana@example.com", "items": []}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errors"]["items"], "at least one item is required");
}

#[tokio::test]
async fn malformed_json_uses_the_envelope() {
    let mut app = TestApp::without_database();
    let response = app
        .request(axum::http::Method::POST, "/api/quotes", Some(json!("just a string")))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn login_is_rate_limited_per_client() {
    let mut app = TestApp::without_database();
    // Missing fields fail at the extractor, so no database is needed.
    for _ in 0..5 {
        let response = app.post("/api/auth/login", json!({})).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
    let response = app.post("/api/auth/login", json!({})).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.body,
        json!({"success": false, "message": "Too many requests, please try again later"})
    );
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let mut app = TestApp::without_database();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers.get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers.contains_key("x-request-id"));
}
