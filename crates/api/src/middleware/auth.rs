//! Bearer token authentication.
//!
//! [`authenticate`] is the gate; [`RequireAuth`] runs it as an extractor so
//! every protected handler gets an [`Identity`] or never runs.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use thiserror::Error;
use tracing::debug;

use mecar_core::Username;

use crate::error::{AppError, set_sentry_user};
use crate::models::Identity;
use crate::services::token::{TokenError, TokenService};
use crate::state::AppState;

/// Authorization scheme accepted by the gate.
const BEARER: &str = "Bearer";

/// Why a request failed authentication.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// No `Authorization` header.
    #[error("missing bearer credential")]
    MissingCredential,

    /// Header present but not `Bearer <token>`.
    #[error("authorization header must be 'Bearer <token>'")]
    InvalidCredentialFormat,

    /// The token itself was rejected.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Extract the raw token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively. The token must be a single
/// non-empty word.
///
/// # Errors
///
/// Returns `GateError::MissingCredential` if the header is absent and
/// `GateError::InvalidCredentialFormat` if it has the wrong shape.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GateError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(GateError::MissingCredential)?
        .to_str()
        .map_err(|_| GateError::InvalidCredentialFormat)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(GateError::InvalidCredentialFormat)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case(BEARER)
        || token.is_empty()
        || token.contains(char::is_whitespace)
    {
        return Err(GateError::InvalidCredentialFormat);
    }

    Ok(token)
}

/// Resolve the caller's identity from request headers.
///
/// # Errors
///
/// Returns the credential-shape errors from [`bearer_token`], or
/// `GateError::Token` with the token service's failure unchanged.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Identity, GateError> {
    let token = bearer_token(headers)?;
    let subject = tokens.verify(token)?;

    // A correctly signed token always carries a username we issued
    let username =
        Username::parse(&subject.username).map_err(|_| TokenError::MalformedOrForged)?;

    Ok(Identity::new(subject.customer_id, username))
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug)]
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = authenticate(&parts.headers, state.tokens()).map_err(|e| {
            debug!(error = %e, path = %parts.uri.path(), "Authentication failed");
            AppError::Gate(e)
        })?;

        set_sentry_user(identity.username.as_str());
        Ok(Self(identity))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use secrecy::SecretString;

    use mecar_core::CustomerId;

    use super::*;
    use crate::config::TokenConfig;

    fn tokens() -> TokenService {
        TokenService::new(&TokenConfig {
            secret: SecretString::from("k3Yf9!vQ2#pLm8@xR4$wZ7^tB1&nH6*c".to_owned()),
            ttl: Duration::from_secs(3600),
        })
        .unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            authenticate(&HeaderMap::new(), &tokens()),
            Err(GateError::MissingCredential)
        );
    }

    #[test]
    fn test_wrong_shapes() {
        for value in [
            "token-without-scheme",
            "Basic dXNlcjpwYXNz",
            "Bearer",
            "Bearer ",
            "Bearer two words",
        ] {
            assert_eq!(
                bearer_token(&headers(value)),
                Err(GateError::InvalidCredentialFormat),
                "{value:?}"
            );
        }
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_valid_token_resolves_identity() {
        let tokens = tokens();
        let token = tokens.issue_default("alice", CustomerId::new(12)).unwrap();

        let identity = authenticate(&headers(&format!("Bearer {token}")), &tokens).unwrap();
        assert_eq!(identity.username.as_str(), "alice");
        assert_eq!(identity.customer_id, CustomerId::new(12));
    }

    #[test]
    fn test_token_errors_pass_through_unchanged() {
        let tokens = tokens();
        let expired = tokens
            .issue("alice", CustomerId::new(12), Duration::ZERO)
            .unwrap();

        assert_eq!(
            authenticate(&headers(&format!("Bearer {expired}")), &tokens),
            Err(GateError::Token(TokenError::Expired))
        );
        assert_eq!(
            authenticate(&headers("Bearer not.a.token"), &tokens),
            Err(GateError::Token(TokenError::MalformedOrForged))
        );
    }
}
