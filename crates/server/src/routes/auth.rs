//! Session-based authentication endpoints.

use axum::{
    Router,
    extract::State,
    middleware::from_fn,
    routing::{get, post},
};
use tireshop_core::UserRole;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::ValidJson;
use crate::middleware::{
    OptionalUser, auth_rate_limiter, clear_current_user, rate_limit_envelope, set_current_user,
};
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::models::{CurrentUser, User};
use crate::response::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(auth_rate_limiter())
        .route_layer(from_fn(rate_limit_envelope))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Log the user into this session.
async fn start_session(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user.clone());
    set_current_user(session, &current)
        .await
        .map_err(session_error)?;
    set_sentry_user(current.id.as_i32(), current.email.as_str());
    Ok(current)
}

/// `POST /api/auth/register` - always creates a customer account.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .register(
            &request.email,
            &request.password,
            &request.name,
            UserRole::Customer,
        )
        .await?;
    tracing::info!(user_id = %user.id, "User registered");

    let current = start_session(&session, &user).await?;
    Ok(ApiResponse::created(current).with_message("Account created"))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<ApiResponse<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;
    tracing::info!(user_id = %user.id, "User logged in");

    let current = start_session(&session, &user).await?;
    Ok(ApiResponse::ok(current).with_message("Logged in"))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<ApiResponse<serde_json::Value>> {
    clear_current_user(&session).await.map_err(session_error)?;
    clear_sentry_user();
    Ok(ApiResponse::message_only("Logged out"))
}

/// `GET /api/auth/session` - the logged-in user, or `data: null`.
pub async fn current_session(
    OptionalUser(user): OptionalUser,
) -> ApiResponse<Option<CurrentUser>> {
    ApiResponse::ok(user)
}
