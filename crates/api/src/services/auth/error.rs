//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::token::TokenError;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field is missing or a value is malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// Another customer already has this username.
    #[error("username is already taken")]
    UsernameTaken,

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// The token for the new session could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
