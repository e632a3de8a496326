//! Authorization gate and identity extractors.
//!
//! [`require_admin`] is the only authorization check; handlers behind it read
//! the user from request extensions instead of re-checking the role.
//!
//! - session layer missing or unreadable → 500 "Authentication error"
//! - nobody logged in → 401 "Authentication required"
//! - logged in without the admin role → 403 "Admin access required"

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::response::ErrorBody;

/// Why a request was refused by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No session layer, or the session store failed.
    SessionUnavailable,
    NotLoggedIn,
    NotAdmin,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::SessionUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
            }
            Self::NotLoggedIn => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        ErrorBody::new(message).into_response_with(status)
    }
}

/// Read the logged-in user from the request's session.
async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AuthFailure> {
    if let Some(user) = parts.extensions.get::<CurrentUser>() {
        return Ok(Some(user.clone()));
    }
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthFailure::SessionUnavailable)?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read session");
            AuthFailure::SessionUnavailable
        })
}

async fn resolve_admin(parts: &Parts) -> Result<CurrentUser, AuthFailure> {
    let user = session_user(parts).await?.ok_or(AuthFailure::NotLoggedIn)?;
    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Admin access denied");
        return Err(AuthFailure::NotAdmin);
    }
    Ok(user)
}

/// Route layer guarding `/api/admin/**`.
///
/// On success the [`CurrentUser`] is inserted into the request extensions.
pub async fn require_admin(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    match resolve_admin(&parts).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.id.as_i32());
            parts.extensions.insert(user);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(failure) => failure.into_response(),
    }
}

/// Extractor for the current user, if any.
///
/// Never rejects; a broken session reads as anonymous.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await.ok().flatten()))
    }
}

/// Store the logged-in user, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {

    use axum::{Router, body::Body, http::Request as HttpRequest, routing::get};
    use http_body_util::BodyExt;
    use tireshop_core::{Email, UserId, UserRole};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("someone@example.com").unwrap(),
            name: "Someone".to_string(),
            role,
        }
    }

    /// `/login/{role}` stores a user; `/admin` sits behind the gate.
    fn router() -> Router {
        async fn login(session: Session, axum::extract::Path(role): axum::extract::Path<String>) {
            let role = if role == "admin" { UserRole::Admin } else { UserRole::Customer };
            set_current_user(&session, &user(role)).await.unwrap();
        }

        async fn whoami(OptionalUser(user): OptionalUser) -> String {
            user.map_or_else(|| "anonymous".to_string(), |u| u.email.to_string())
        }

        Router::new()
            .route(
                "/admin",
                get(|| async { "ok" }).route_layer(axum::middleware::from_fn(require_admin)),
            )
            .route("/me", get(whoami))
            .route("/login/{role}", get(login))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn call(router: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn login_cookie(router: &Router, role: &str) -> String {
        let response = call(router, &format!("/login/{role}"), None).await;
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn message(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        json["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_gate_without_login_is_401() {
        let router = router();
        let response = call(&router, "/admin", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(response).await, "Authentication required");
    }

    #[tokio::test]
    async fn test_gate_for_customer_is_403() {
        let router = router();
        let cookie = login_cookie(&router, "customer").await;
        let response = call(&router, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(message(response).await, "Admin access required");

        let response = call(&router, "/me", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"someone@example.com");
    }

    #[tokio::test]
    async fn test_optional_user_reads_anonymous() {
        let router = router();
        let response = call(&router, "/me", None).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"anonymous");
    }

    #[tokio::test]
    async fn test_gate_for_admin_passes() {
        let router = router();
        let cookie = login_cookie(&router, "admin").await;
        let response = call(&router, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_gate_without_session_layer_is_500() {
        let router = Router::new().route(
            "/admin",
            get(|| async { "ok" }).route_layer(axum::middleware::from_fn(require_admin)),
        );
        let response = call(&router, "/admin", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message(response).await, "Authentication error");
    }
}
