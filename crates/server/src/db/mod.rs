//! Database operations for the shop `PostgreSQL` database.
//!
//! # Tables
//!
//! - `app_user` - Accounts with a `customer`/`admin` role
//! - `brand`, `category`, `product` - Tire catalog (`category` is a tree via `parent_id`)
//! - `service_category`, `service` - Workshop services
//! - `quote`, `quote_item` - Priced offers and their lines
//! - `appointment` - Service bookings
//! - `hero_banner` - Ordered homepage promotions
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tireshop-cli -- migrate
//! ```
//!
//! All queries are built at runtime (`query_as` / `QueryBuilder`) with bound
//! parameters; identifiers that vary per request come from allow-lists only.

pub mod appointments;
pub mod brands;
pub mod categories;
pub mod hero_banners;
pub mod listing;
pub mod products;
pub mod quotes;
pub mod services;
pub mod stats;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tireshop_core::pricing::PricingError;

use crate::validation::FieldErrors;

pub use appointments::AppointmentRepository;
pub use brands::BrandRepository;
pub use categories::CategoryRepository;
pub use hero_banners::HeroBannerRepository;
pub use products::ProductRepository;
pub use quotes::QuoteRepository;
pub use services::{ServiceCategoryRepository, ServiceRepository};
pub use stats::StatsRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The write would break a business rule (e.g., deleting an accepted quote).
    #[error("{0}")]
    Rejected(String),

    /// The merged row fails field rules (e.g., an illegal status change).
    #[error("validation failed")]
    Invalid(FieldErrors),

    /// Quote lines or discount cannot be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl RepositoryError {
    /// Classify a write error, turning unique and foreign-key violations into
    /// [`RepositoryError::Conflict`] with the given message.
    pub(crate) fn from_write(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(conflict_message.to_string());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
