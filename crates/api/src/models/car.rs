//! Car catalog types.

use chrono::{DateTime, Utc};
use mecar_core::CarId;
use rust_decimal::Decimal;
use serde::Serialize;

/// A full catalog record, returned by the car detail endpoint.
///
/// Sold cars still resolve here with `is_available = false`; they are only
/// hidden from search.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Car {
    pub id: CarId,
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    /// Image URL or asset key.
    pub image_url: Option<String>,
    /// True until the car's single purchase commits.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// The subset of a car shown in search results.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CarSummary {
    pub id: CarId,
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    pub image_url: Option<String>,
}
