//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::TokenConfig;
use crate::services::{PasswordHasher, TokenError, TokenService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The signing key and the
/// password hasher are built once here and never change afterwards.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the token key cannot be loaded.
    pub fn new(pool: PgPool, token: &TokenConfig) -> Result<Self, TokenError> {
        let tokens = TokenService::new(token)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                tokens,
                hasher: PasswordHasher::new(),
            }),
        })
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the password hasher.
    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.inner.hasher
    }
}
