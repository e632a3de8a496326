//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! tireshop admin create -e admin@example.com -n "Shop Admin" -p 'a long password'
//! tireshop admin promote -e owner@example.com
//! ```

use thiserror::Error;
use tireshop_core::{Email, UserRole};
use tireshop_server::db::{RepositoryError, UserRepository};
use tireshop_server::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("No user with email: {0}")]
    UnknownUser(String),

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns an error if the email is invalid or taken, the password is too
/// weak, or the database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), AdminError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .register(email, password, name, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            AuthError::InvalidEmail(_) => AdminError::InvalidEmail(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!("Admin user created successfully!");
    tracing::info!("  ID: {}", user.id);
    tracing::info!("  Email: {}", user.email);
    tracing::info!("  Name: {}", user.name);
    Ok(())
}

/// Grant the admin role to an existing account.
///
/// # Errors
///
/// Returns an error if the email is invalid or no account uses it.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&parsed, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User promoted to admin");
    Ok(())
}
