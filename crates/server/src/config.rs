//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TIRESHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `TIRESHOP_BASE_URL` - Public URL of the API
//!
//! ## Optional
//! - `TIRESHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `TIRESHOP_PORT` - Listen port (default: 3000)
//! - `TIRESHOP_ENV` - `development` | `production` | `test` (default: development)
//! - `TIRESHOP_LOG_JSON` - Emit JSON logs when set to `1`/`true`
//! - `TIRESHOP_UPLOAD_DIR` - Directory for uploaded images (default: uploads)
//! - `TIRESHOP_UPLOAD_URL` - Public URL prefix for uploads (default: `{base_url}/uploads`)
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   outgoing email; when `SMTP_HOST` is unset emails are logged instead of sent
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    pub environment: Environment,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    pub uploads: UploadConfig,
    /// SMTP settings; `None` means emails are logged and dropped
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Where uploaded files are written and served from.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    /// Public URL prefix that maps onto `dir`
    pub public_url: String,
}

/// SMTP configuration for transactional email.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Source of raw configuration values, keyed by variable name.
trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key).filter(|v| !v.trim().is_empty())
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = &lookup;

        let database_url = get_database_url(env, "TIRESHOP_DATABASE_URL")?;
        let host = parse_env(env, "TIRESHOP_HOST", "127.0.0.1")?;
        let port = parse_env(env, "TIRESHOP_PORT", "3000")?;
        let base_url = get_required_env(env, "TIRESHOP_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let environment_raw = get_env_or_default(env, "TIRESHOP_ENV", "development");
        let environment = Environment::parse(&environment_raw).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "TIRESHOP_ENV".to_string(),
                format!("unknown environment '{environment_raw}'"),
            )
        })?;

        let log_json = get_optional_env(env, "TIRESHOP_LOG_JSON")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let uploads = UploadConfig {
            dir: PathBuf::from(get_env_or_default(env, "TIRESHOP_UPLOAD_DIR", "uploads")),
            public_url: get_optional_env(env, "TIRESHOP_UPLOAD_URL")
                .map_or_else(|| format!("{base_url}/uploads"), |u| u.trim_end_matches('/').to_string()),
        };

        let email = EmailConfig::from_lookup(env)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            log_json,
            uploads,
            email,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env(env, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env(env, "SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl EmailConfig {
    /// The SMTP group is optional as a whole, but once `SMTP_HOST` is set the
    /// credentials and sender become required.
    fn from_lookup(env: &impl Lookup) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env(env, "SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env(env, "SMTP_PORT", "587")?,
            smtp_username: get_required_env(env, "SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env(env, "SMTP_PASSWORD")?),
            from_address: get_required_env(env, "SMTP_FROM")?,
        }))
    }
}

fn get_required_env(env: &impl Lookup, key: &str) -> Result<String, ConfigError> {
    env.get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_database_url(env: &impl Lookup, primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first, then the generic DATABASE_URL used by sqlx tooling
    env.get(primary_key)
        .or_else(|| env.get("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(env: &impl Lookup, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_or_default(env: &impl Lookup, key: &str, default: &str) -> String {
    env.get(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(env: &impl Lookup, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(move |key: &str| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("TIRESHOP_DATABASE_URL", "postgres://localhost/tireshop"),
        ("TIRESHOP_BASE_URL", "https://shop.example.com/"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.log_json);
        assert_eq!(config.uploads.dir, PathBuf::from("uploads"));
        assert_eq!(config.uploads.public_url, "https://shop.example.com/uploads");
        assert!(config.email.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("TIRESHOP_DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "TIRESHOP_BASE_URL"));

        let err = load(&[("TIRESHOP_BASE_URL", "http://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "TIRESHOP_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("TIRESHOP_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
    }

    #[test]
    fn test_invalid_port_and_env() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("TIRESHOP_PORT", "eighty"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(key, _) if key == "TIRESHOP_PORT"
        ));

        let mut vars = MINIMAL.to_vec();
        vars.push(("TIRESHOP_ENV", "staging"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(key, _) if key == "TIRESHOP_ENV"
        ));
    }

    #[test]
    fn test_production_flag() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("TIRESHOP_ENV", "Production"));
        vars.push(("TIRESHOP_LOG_JSON", "true"));
        let config = load(&vars).unwrap();
        assert!(config.is_production());
        assert!(config.log_json);
    }

    #[test]
    fn test_smtp_group() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SMTP_HOST", "smtp.example.com"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::MissingEnvVar(key) if key == "SMTP_USERNAME"
        ));

        vars.extend([
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "hunter2hunter2"),
            ("SMTP_FROM", "Taller <taller@example.com>"),
        ]);
        let email = load(&vars).unwrap().email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert!(!format!("{email:?}").contains("hunter2"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SMTP_HOST", "  "));
        vars.push(("TIRESHOP_UPLOAD_URL", "https://cdn.example.com/u/"));
        let config = load(&vars).unwrap();
        assert!(config.email.is_none());
        assert_eq!(config.uploads.public_url, "https://cdn.example.com/u");
    }
}
