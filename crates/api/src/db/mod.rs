//! Database operations for the marketplace `PostgreSQL`.
//!
//! # Schema: `mecar`
//!
//! ## Tables
//!
//! - `customer` - Registered customers and their password digests
//! - `car` - The catalog; `is_available` flips to false exactly once
//! - `purchase` - One row per sold car, `UNIQUE (car_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p mecar-cli -- migrate
//! ```

pub mod cars;
pub mod customers;
pub mod purchases;

use std::str::FromStr;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use cars::CarRepository;
pub use customers::CustomerRepository;
pub use purchases::PurchaseRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the failure is temporary and the caller may retry as-is.
    ///
    /// Covers pool exhaustion, lost connections, statement timeouts and
    /// serialization failures. Nothing was committed when these surface.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        let Self::Database(err) = self else {
            return false;
        };

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .is_some_and(|code| is_transient_sqlstate(&code)),
            _ => false,
        }
    }
}

/// `57014` query canceled (statement timeout), `40001` serialization failure,
/// `40P01` deadlock, `08xxx` connection exceptions.
fn is_transient_sqlstate(code: &str) -> bool {
    matches!(code, "57014" | "40001" | "40P01") || code.starts_with("08")
}

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool.
///
/// Every connection gets a server-side `statement_timeout`, and waiting for
/// a connection is capped by `acquire_timeout`, so no storage call can hang.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = config.statement_timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(config.url.expose_secret())?
        .options([("statement_timeout", statement_timeout_ms.as_str())]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_sqlstates() {
        assert!(is_transient_sqlstate("57014"));
        assert!(is_transient_sqlstate("40001"));
        assert!(is_transient_sqlstate("40P01"));
        assert!(is_transient_sqlstate("08006"));
        assert!(!is_transient_sqlstate("23505"));
        assert!(!is_transient_sqlstate("42P01"));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = RepositoryError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn test_domain_errors_are_not_transient() {
        assert!(!RepositoryError::NotFound.is_transient());
        assert!(!RepositoryError::Conflict("username".to_owned()).is_transient());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_transient());
    }
}
