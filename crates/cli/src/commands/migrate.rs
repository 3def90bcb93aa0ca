//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mecar-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MECAR_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use thiserror::Error;
use tracing::info;

use mecar_api::config::{ConfigError, DatabaseConfig};
use mecar_api::db;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let config = DatabaseConfig::from_env()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&config).await?;

    info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
