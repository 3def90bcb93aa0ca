//! API configuration loaded from environment variables.
//!
//! Loaded once at startup and never mutated afterwards; the token signing key
//! lives here and is handed to the token service by reference.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MECAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MECAR_TOKEN_SECRET` - Bearer token signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MECAR_HOST` - Bind address (default: 127.0.0.1)
//! - `MECAR_PORT` - Listen port (default: 8000)
//! - `MECAR_TOKEN_TTL_HOURS` - Token lifetime in hours (default: 72)
//! - `MECAR_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `MECAR_DB_ACQUIRE_TIMEOUT_SECS` - Max wait for a pooled connection (default: 5)
//! - `MECAR_DB_STATEMENT_TIMEOUT_MS` - Server-side statement timeout (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Longest accepted token lifetime (ten years).
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Bearer token settings
    pub token: TokenConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// `PostgreSQL` pool configuration.
///
/// Every storage call is bounded: waiting for a connection by
/// `acquire_timeout`, running a statement by `statement_timeout`.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub url: SecretString,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Maximum time to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Server-side `statement_timeout` for every connection
    pub statement_timeout: Duration,
}

/// Bearer token configuration.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 signing key
    pub secret: SecretString,
    /// Lifetime of an issued token
    pub ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the token secret fails validation (length, placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("MECAR_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("MECAR_PORT", "8000")?;

        Ok(Self {
            host,
            port,
            database: DatabaseConfig::from_env()?,
            token: TokenConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load database settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or a numeric setting is
    /// unparseable or zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = get_database_url("MECAR_DATABASE_URL")?;
        let max_connections = parse_positive("MECAR_DB_MAX_CONNECTIONS", "10")?;
        let acquire_secs: u64 = parse_positive("MECAR_DB_ACQUIRE_TIMEOUT_SECS", "5")?;
        let statement_ms: u64 = parse_positive("MECAR_DB_STATEMENT_TIMEOUT_MS", "5000")?;

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_secs),
            statement_timeout: Duration::from_millis(statement_ms),
        })
    }
}

impl TokenConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("MECAR_TOKEN_SECRET")?;
        validate_secret_length(&secret, "MECAR_TOKEN_SECRET")?;
        let ttl_hours: u64 = parse_positive("MECAR_TOKEN_TTL_HOURS", "72")?;

        Ok(Self {
            secret,
            ttl: token_ttl("MECAR_TOKEN_TTL_HOURS", ttl_hours)?,
        })
    }
}

/// Convert a token lifetime in hours, refusing values no token could carry.
fn token_ttl(key: &str, hours: u64) -> Result<Duration, ConfigError> {
    if hours > MAX_TOKEN_TTL_HOURS {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be at most {MAX_TOKEN_TTL_HOURS}"),
        ));
    }

    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "out of range".to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a numeric environment variable that must be greater than zero.
fn parse_positive<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let value = parse_env_or_default::<T>(key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_well_known_key() {
        // The key the first prototype shipped with
        let result = validate_secret_strength("my secret jwt key", "MECAR_TOKEN_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("k".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_token_ttl_bounds() {
        assert_eq!(
            token_ttl("TEST", 72).unwrap(),
            Duration::from_secs(72 * 3600)
        );
        assert_eq!(
            token_ttl("TEST", MAX_TOKEN_TTL_HOURS).unwrap(),
            Duration::from_secs(MAX_TOKEN_TTL_HOURS * 3600)
        );
        for hours in [MAX_TOKEN_TTL_HOURS + 1, u64::MAX / 3600 + 1, u64::MAX] {
            assert!(
                matches!(token_ttl("TEST", hours), Err(ConfigError::InvalidEnvVar(_, _))),
                "{hours}"
            );
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            database: DatabaseConfig {
                url: SecretString::from("postgres://localhost/mecar"),
                max_connections: 10,
                acquire_timeout: Duration::from_secs(5),
                statement_timeout: Duration::from_millis(5000),
            },
            token: TokenConfig {
                secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6q"),
                ttl: Duration::from_secs(72 * 3600),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_token_config_debug_redacts_secret() {
        let config = TokenConfig {
            secret: SecretString::from("super_private_signing_key_value_1234"),
            ttl: Duration::from_secs(60),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_signing_key_value_1234"));
    }
}
