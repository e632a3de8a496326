//! JSON response envelope.
//!
//! Success: `{"success": true, "data": …, "message"?: …, "pagination"?: …}`
//! Failure: `{"success": false, "message": …, "errors"?: {field: message}}`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tireshop_core::listing::Pagination;

use crate::validation::FieldErrors;

/// Successful API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` with data.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }

    /// `201 Created` with data.
    pub const fn created(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            pagination: None,
            status: StatusCode::CREATED,
        }
    }

    /// `200 OK` with a page of data.
    pub const fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            data,
            message: None,
            pagination: Some(pagination),
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<serde_json::Value> {
    /// `200 OK` with `data: null` and a message (e.g. after a delete).
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::ok(serde_json::Value::Null).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Failure body shared by [`crate::error::AppError`] and the middleware gates.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Pair with a status code to form a response.
    #[must_use]
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}
