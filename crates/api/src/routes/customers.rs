//! Signup and login handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use crate::error::Result;
use crate::services::AuthService;
use crate::services::auth::{Login, Registration};
use crate::state::AppState;

/// Response carrying a fresh bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: &'static str,
    pub token: String,
}

/// Register a customer.
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let Json(registration) = payload?;
    let session = AuthService::new(state.pool(), state.tokens(), state.hasher())
        .register(registration)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "Customer registered",
            token: session.token,
        }),
    ))
}

/// Log in with username and password.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Login>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(login) = payload?;
    let session = AuthService::new(state.pool(), state.tokens(), state.hasher())
        .login(login)
        .await?;

    Ok(Json(TokenResponse {
        message: "Login successful",
        token: session.token,
    }))
}
