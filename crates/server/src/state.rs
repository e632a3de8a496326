//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::{LocalStorage, LogMailer, Mailer, ObjectStorage, SmtpMailer};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Mailer and storage are trait objects so
/// tests can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Assemble state from explicit parts.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mailer,
                storage,
            }),
        }
    }

    /// Build state with the mailer and storage the configuration asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn from_config(config: ServerConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let mailer: Arc<dyn Mailer> = match &config.email {
            Some(email) => Arc::new(SmtpMailer::new(email)?),
            None => {
                tracing::warn!("SMTP not configured, outgoing emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let storage: Arc<dyn ObjectStorage> = Arc::new(LocalStorage::from_config(&config.uploads));
        Ok(Self::new(config, pool, mailer, storage))
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }

    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }
}

/// State for handler tests: a lazy pool that never connects unless a query
/// runs, the logging mailer, and uploads under the configured default dir.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state(environment: &'static str) -> AppState {
    let config = ServerConfig::from_lookup(move |key: &str| match key {
        "TIRESHOP_DATABASE_URL" => Some("postgres://localhost/tireshop_test".to_string()),
        "TIRESHOP_BASE_URL" => Some("http://localhost:3000".to_string()),
        "TIRESHOP_ENV" => Some(environment.to_string()),
        _ => None,
    })
    .unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/tireshop_test")
        .unwrap();
    let storage = Arc::new(LocalStorage::from_config(&config.uploads));
    AppState::new(config, pool, Arc::new(LogMailer), storage)
}
