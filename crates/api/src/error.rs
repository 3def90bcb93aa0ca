//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`, and [`AppError::into_response`]
//! is the single place a domain error becomes an HTTP status. The body is
//! always JSON:
//!
//! ```json
//! { "error": "already_purchased", "message": "car has already been purchased" }
//! ```
//!
//! Server-side failures get an opaque message; their detail goes to the log
//! and Sentry only.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{
        HeaderValue, StatusCode,
        header::{RETRY_AFTER, WWW_AUTHENTICATE},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::GateError;
use crate::services::{AuthError, ProfileError, PurchaseError, TokenError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bearer credential missing, malformed, expired or forged.
    #[error("Authentication failed: {0}")]
    Gate(#[from] GateError),

    /// Registration or login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Purchase workflow failed.
    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    /// Profile workflow failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Status and kind for a storage failure nested in any domain error.
fn storage(err: &RepositoryError) -> (StatusCode, &'static str) {
    if err.is_transient() {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
    }
}

const fn internal() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
}

impl AppError {
    /// HTTP status and stable machine-readable kind.
    #[must_use]
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Gate(err) => match err {
                GateError::MissingCredential => (StatusCode::UNAUTHORIZED, "missing_credential"),
                GateError::InvalidCredentialFormat => {
                    (StatusCode::UNAUTHORIZED, "invalid_credential_format")
                }
                GateError::Token(TokenError::Expired) => {
                    (StatusCode::UNAUTHORIZED, "expired_token")
                }
                GateError::Token(TokenError::MalformedOrForged) => {
                    (StatusCode::UNAUTHORIZED, "invalid_token")
                }
                GateError::Token(TokenError::Signing(_)) => internal(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                AuthError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "weak_password"),
                AuthError::UsernameTaken => (StatusCode::CONFLICT, "username_taken"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::PasswordHash | AuthError::Token(_) => internal(),
                AuthError::Repository(e) => storage(e),
            },
            Self::Purchase(err) => match err {
                PurchaseError::CustomerNotFound => (StatusCode::NOT_FOUND, "customer_not_found"),
                PurchaseError::CarNotFound => (StatusCode::NOT_FOUND, "car_not_found"),
                PurchaseError::CarUnavailable => (StatusCode::CONFLICT, "car_unavailable"),
                PurchaseError::AlreadyPurchased => (StatusCode::CONFLICT, "already_purchased"),
                PurchaseError::Repository(e) => storage(e),
            },
            Self::Profile(err) => match err {
                ProfileError::CustomerNotFound => (StatusCode::NOT_FOUND, "customer_not_found"),
                ProfileError::NoFieldsProvided => (StatusCode::BAD_REQUEST, "no_fields_provided"),
                ProfileError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                ProfileError::UsernameTaken => (StatusCode::CONFLICT, "username_taken"),
                ProfileError::Token(_) => internal(),
                ProfileError::Repository(e) => storage(e),
            },
            Self::Database(e) => storage(e),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_owned(),
            StatusCode::SERVICE_UNAVAILABLE => {
                "Service temporarily unavailable, please retry".to_owned()
            }
            _ => match self {
                Self::Gate(e) => e.to_string(),
                Self::Auth(e) => e.to_string(),
                Self::Purchase(e) => e.to_string(),
                Self::Profile(e) => e.to_string(),
                other => other.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(error = %self, "Transient storage failure");
        }

        let body = ErrorBody {
            error: kind,
            message: self.public_message(status),
        };
        let mut response = (status, Json(body)).into_response();

        match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from_static("1"));
            }
            StatusCode::UNAUTHORIZED if matches!(self, Self::Gate(_)) => {
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            _ => {}
        }

        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the authenticated username.
pub fn set_sentry_user(username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}
