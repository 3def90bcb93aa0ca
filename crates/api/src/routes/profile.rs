//! Profile handlers for the authenticated customer.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Profile;
use crate::services::ProfileService;
use crate::services::profile::ProfileChanges;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub user: Profile,
    /// Present only when the username changed.
    pub new_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

/// Get the caller's profile and purchase history.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let user = ProfileService::new(state.pool(), state.tokens())
        .get(&identity)
        .await?;

    Ok(Json(ProfileResponse { user }))
}

/// Update any subset of name, phone, address and username.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    payload: std::result::Result<Json<ProfileChanges>, JsonRejection>,
) -> Result<Json<ProfileUpdateResponse>> {
    let Json(changes) = payload?;
    let update = changes.validate()?;

    let updated = ProfileService::new(state.pool(), state.tokens())
        .update(&identity, update)
        .await?;

    Ok(Json(ProfileUpdateResponse {
        user: updated.profile,
        new_token: updated.new_token,
    }))
}

/// Delete the caller's account.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<DeletedResponse>> {
    ProfileService::new(state.pool(), state.tokens())
        .delete(&identity)
        .await?;

    Ok(Json(DeletedResponse {
        message: "Account deleted",
    }))
}
