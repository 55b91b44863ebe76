//! Share service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CRM_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either the in-memory store is used)
//! - `CRM_HOST` - Bind address (default: 127.0.0.1)
//! - `CRM_PORT` - Listen port (default: 3002)
//! - `CRM_BASE_URL` - Public URL of the share site (default: <http://localhost:3002>)
//! - `CRM_ALLOCATION_MAX_ATTEMPTS` - Identifiers tried per create (default: 16)
//! - `CRM_STORE_MAX_RETRIES` - Retries for transient store failures (default: 3)
//! - `CRM_STORE_RETRY_BASE_MS` - First retry delay (default: 50)
//! - `CRM_STORE_RETRY_MAX_MS` - Maximum retry delay (default: 1000)
//! - `CRM_SHARE_VISIT_LIMIT` - Completed visits returned per read (default: 50)
//! - `CRM_SHARE_MAX_FAILED_UNLOCKS` - Wrong passwords allowed per link (default: 5)
//! - `CRM_SHARE_UNLOCK_WINDOW_SECS` - How long wrong passwords count (default: 900)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::{GatewayLimits, RetryPolicy};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Share service configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for share links
    pub base_url: String,
    /// Identifiers tried per customer create
    pub allocation_max_attempts: u32,
    /// Backoff for transient store failures
    pub store_retry: RetryPolicy,
    /// Share gateway limits
    pub gateway: GatewayLimits,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3002,
            base_url: "http://localhost:3002".to_string(),
            allocation_max_attempts: 16,
            store_retry: RetryPolicy::default(),
            gateway: GatewayLimits::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CrmConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CRM_DATABASE_URL");
        let host = parse_env("CRM_HOST", "127.0.0.1")?;
        let port = parse_env("CRM_PORT", "3002")?;
        let base_url = get_env_or_default("CRM_BASE_URL", "http://localhost:3002");

        let store_retry = RetryPolicy {
            max_retries: parse_env("CRM_STORE_MAX_RETRIES", "3")?,
            base_delay: Duration::from_millis(parse_env("CRM_STORE_RETRY_BASE_MS", "50")?),
            max_delay: Duration::from_millis(parse_env("CRM_STORE_RETRY_MAX_MS", "1000")?),
        };
        let gateway = GatewayLimits {
            visit_limit: parse_env("CRM_SHARE_VISIT_LIMIT", "50")?,
            max_failed_unlocks: parse_env("CRM_SHARE_MAX_FAILED_UNLOCKS", "5")?,
            unlock_window: Duration::from_secs(parse_env("CRM_SHARE_UNLOCK_WINDOW_SECS", "900")?),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            allocation_max_attempts: parse_env("CRM_ALLOCATION_MAX_ATTEMPTS", "16")?,
            store_retry,
            gateway,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// The database URL, for commands that cannot fall back to memory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no database is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CRM_DATABASE_URL".to_string()))
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the share site is served over HTTPS (session cookies are
    /// marked `Secure`).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("CRM_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let host: IpAddr = parse_value("CRM_HOST", "0.0.0.0").unwrap();
        assert_eq!(host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_parse_value_invalid() {
        let err = parse_value::<u16>("CRM_PORT", "99999").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CRM_PORT"));
    }

    #[test]
    fn test_require_database_url() {
        let err = CrmConfig::default().require_database_url().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "CRM_DATABASE_URL"));

        let config = CrmConfig {
            database_url: Some(SecretString::from("postgres://db/crm")),
            ..CrmConfig::default()
        };
        assert_eq!(
            config.require_database_url().unwrap().expose_secret(),
            "postgres://db/crm"
        );
    }

    #[test]
    fn test_defaults() {
        let config = CrmConfig::default();
        assert_eq!(config.port, 3002);
        assert_eq!(config.allocation_max_attempts, 16);
        assert_eq!(config.gateway.visit_limit, 50);
        assert_eq!(config.gateway.max_failed_unlocks, 5);
        assert_eq!(config.store_retry.max_retries, 3);
        assert!(!config.is_https());
    }

    #[test]
    fn test_socket_addr() {
        let config = CrmConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 4000,
            ..CrmConfig::default()
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_https_base_url() {
        let config = CrmConfig {
            base_url: "https://share.example.com".to_string(),
            ..CrmConfig::default()
        };
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = CrmConfig {
            database_url: Some(SecretString::from("postgres://crm:hunter2@db/crm")),
            ..CrmConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://crm:hunter2@db/crm"
        );
    }
}
