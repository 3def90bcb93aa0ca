//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::PathRejection, rejection::QueryRejection},
};
use serde::Serialize;
use tracing::instrument;

use mecar_core::CarId;

use crate::catalog::CarFilters;
use crate::db::CarRepository;
use crate::error::{AppError, Result};
use crate::models::{Car, CarSummary};
use crate::state::AppState;

/// One page of search results.
#[derive(Debug, Serialize)]
pub struct CarPage {
    pub cars: Vec<CarSummary>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct CarDetail {
    pub car: Car,
}

/// Search available cars.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    query: std::result::Result<Query<CarFilters>, QueryRejection>,
) -> Result<Json<CarPage>> {
    let Query(filters) = query?;
    let cars = CarRepository::new(state.pool()).search(&filters).await?;

    Ok(Json(CarPage {
        cars,
        limit: filters.effective_limit(),
        offset: filters.effective_offset(),
    }))
}

/// Car detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<CarDetail>> {
    let Path(car_id) = path?;
    let car = CarRepository::new(state.pool())
        .get_by_id(CarId::new(car_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("car {car_id}")))?;

    Ok(Json(CarDetail { car }))
}
