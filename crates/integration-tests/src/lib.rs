//! Shared harness for the end-to-end API tests.
//!
//! The full router runs in-process (`tower::ServiceExt::oneshot`) with an
//! in-memory session store, a recording mailer and uploads in a temp dir.
//!
//! # Running Tests
//!
//! ```bash
//! # Database-free tests
//! cargo test -p tireshop-integration-tests
//!
//! # Everything, against a scratch PostgreSQL server
//! DATABASE_URL=postgres://localhost/tireshop_test \
//!     cargo test -p tireshop-integration-tests -- --include-ignored
//! ```
//!
//! Database tests use `#[sqlx::test]`, which creates a fresh database per
//! test and applies the server migrations.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use tireshop_core::UserRole;
use tireshop_server::config::ServerConfig;
use tireshop_server::services::email::{EmailError, Mailer, OutgoingEmail};
use tireshop_server::services::{AuthService, LocalStorage};
use tireshop_server::state::AppState;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "correct horse battery";

/// Mailer that keeps every message in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// A decoded API response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// One client session against a fresh router.
pub struct TestApp {
    router: Router,
    pub mailer: RecordingMailer,
    cookie: Option<String>,
    client_ip: String,
    _uploads: TempDir,
}

fn test_config(upload_dir: &str) -> ServerConfig {
    let upload_dir = upload_dir.to_string();
    ServerConfig::from_lookup(move |key: &str| match key {
        "TIRESHOP_DATABASE_URL" => Some("postgres://localhost/tireshop_test".to_string()),
        "TIRESHOP_BASE_URL" => Some("http://localhost:3000".to_string()),
        "TIRESHOP_UPLOAD_DIR" => Some(upload_dir.clone()),
        _ => None,
    })
    .unwrap()
}

impl TestApp {
    /// Router backed by `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = test_config(&uploads.path().display().to_string());
        let mailer = RecordingMailer::default();
        let storage = Arc::new(LocalStorage::from_config(&config.uploads));
        let state = AppState::new(config, pool, Arc::new(mailer.clone()), storage);
        let router = tireshop_server::app(state, SessionManagerLayer::new(MemoryStore::default()));
        Self {
            router,
            mailer,
            cookie: None,
            client_ip: "203.0.113.7".to_string(),
            _uploads: uploads,
        }
    }

    /// Router whose pool never connects; for tests that stop before the database.
    #[must_use]
    pub fn without_database() -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tireshop_unused")
            .unwrap();
        Self::new(pool)
    }

    /// Send a JSON request, keeping the session cookie between calls.
    pub async fn request(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        match body {
            Some(json) => {
                self.send(method, uri, Some("application/json"), Body::from(json.to_string()))
                    .await
            }
            None => self.send(method, uri, None, Body::empty()).await,
        }
    }

    /// Send a request with an arbitrary body.
    pub async fn send(
        &mut self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", &self.client_ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap_or_default();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, headers, body }
    }

    /// `multipart/form-data` with an optional `folder` part and one `file` part.
    pub async fn upload(
        &mut self,
        uri: &str,
        folder: Option<&str>,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> TestResponse {
        const BOUNDARY: &str = "tireshop-test-boundary";
        let mut body = Vec::new();
        if let Some(folder) = folder {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        self.send(Method::POST, uri, Some(&content_type), Body::from(body))
            .await
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Create an account with `role` directly and log this client in as it.
    pub async fn login_as(&mut self, pool: &PgPool, email: &str, role: UserRole) {
        AuthService::new(pool)
            .register(email, PASSWORD, "Test User", role)
            .await
            .unwrap();
        let response = self
            .post(
                "/api/auth/login",
                serde_json::json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    pub async fn login_as_admin(&mut self, pool: &PgPool) {
        self.login_as(pool, "admin@tireshop.test", UserRole::Admin).await;
    }
}
