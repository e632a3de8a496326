//! Unified error handling for the API.
//!
//! Every handler returns `Result<_, AppError>`; the `IntoResponse` impl turns
//! it into the failure envelope `{"success": false, "message", "errors"?}`.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tireshop_core::pricing::PricingError;

use crate::db::RepositoryError;
use crate::middleware::InternalErrorDetail;
use crate::response::ErrorBody;
use crate::services::auth::AuthError;
use crate::services::storage::StorageError;
use crate::validation::FieldErrors;

/// Application-level error type for every route.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed or was refused.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication flow failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upload could not be stored.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Quote could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Payload failed field validation.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// `404` with the usual "X not found" message.
    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    /// Map a repository `NotFound` to a resource-specific 404.
    #[must_use]
    pub fn from_repo(err: RepositoryError, what: &str) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found(what),
            other => Self::Database(other),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Rejected(_)
                | RepositoryError::Invalid(_)
                | RepositoryError::Pricing(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Storage(err) => {
                if err.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            Self::Pricing(_) | Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client for a non-500 error.
    fn client_message(&self) -> String {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Invalid(_) => "Validation failed".to_string(),
                RepositoryError::Conflict(msg) | RepositoryError::Rejected(msg) => msg.clone(),
                other => other.to_string(),
            },
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            other => other.to_string(),
        }
    }

    fn field_errors(self) -> Option<FieldErrors> {
        match self {
            Self::Validation(errors) | Self::Database(RepositoryError::Invalid(errors)) => {
                Some(errors)
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            let mut response =
                ErrorBody::new("Internal server error").into_response_with(status);
            response
                .extensions_mut()
                .insert(InternalErrorDetail(self.to_string()));
            return response;
        }

        let mut body = ErrorBody::new(self.client_message());
        if let Some(errors) = self.field_errors() {
            body = body.with_errors(errors);
        }
        body.into_response_with(status)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Attach the logged-in user to Sentry events.
pub fn set_sentry_user(user_id: i32, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop associating events with a user (on logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use http_body_util::BodyExt;
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// Stand-in for a driver error carrying a constraint-violation kind.
    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_conflict() {
        let db_err = sqlx::Error::Database(Box::new(FakeDbError(ErrorKind::UniqueViolation)));
        let err = AppError::from(RepositoryError::from_write(
            db_err,
            "Quote number already exists, please retry",
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "success": false,
                "message": "Quote number already exists, please retry"
            })
        );
    }

    #[test]
    fn test_foreign_key_violation_maps_to_conflict() {
        let db_err = sqlx::Error::Database(Box::new(FakeDbError(ErrorKind::ForeignKeyViolation)));
        let err = AppError::from(RepositoryError::from_write(db_err, "missing parent"));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_other_database_errors_are_internal() {
        let err = AppError::from(RepositoryError::from_write(sqlx::Error::RowNotFound, "unused"));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(AppError::not_found("Product")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::Database(RepositoryError::Rejected("no".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Pricing(PricingError::NegativeDiscount)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.add("name", "is required");
        let response = AppError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "success": false,
                "message": "Validation failed",
                "errors": {"name": "is required"}
            })
        );
    }

    #[tokio::test]
    async fn test_internal_details_travel_as_extension() {
        let response = AppError::Internal("pool exhausted".into()).into_response();
        assert_eq!(
            response.extensions().get::<InternalErrorDetail>().map(|d| d.0.as_str()),
            Some("Internal error: pool exhausted")
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": false, "message": "Internal server error"})
        );
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let response = AppError::from_repo(RepositoryError::NotFound, "Quote").into_response();
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": false, "message": "Quote not found"})
        );
    }
}
