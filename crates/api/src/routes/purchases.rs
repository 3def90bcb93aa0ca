//! Purchase handler.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use serde::Serialize;

use mecar_core::CarId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::PurchaseRecord;
use crate::services::PurchaseService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub message: &'static str,
    pub purchase: PurchaseRecord,
}

/// Buy a car. Authentication runs before the path is even parsed.
pub async fn purchase(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<(StatusCode, Json<PurchaseResponse>)> {
    let Path(car_id) = path?;
    let purchase = PurchaseService::new(state.pool())
        .purchase_as(&identity, CarId::new(car_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            message: "Car purchased",
            purchase,
        }),
    ))
}
