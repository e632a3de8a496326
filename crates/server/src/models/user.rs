//! Accounts and the session identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::{Email, UserId, UserRole};

use crate::validation::{FieldErrors, Validate};

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A registered account (never carries the password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session-stored identity.
///
/// Minimal data stored in the session to identify the logged-in user and
/// make authorization decisions without a database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

/// `POST /api/auth/register`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = Email::parse(&self.email) {
            errors.add("email", e.to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
        errors.required_text("name", &self.name, 120);
        errors.finish()
    }
}

/// `POST /api/auth/login`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("email", &self.email, Email::MAX_LENGTH);
        if self.password.is_empty() {
            errors.add("password", "is required");
        }
        errors.finish()
    }
}
