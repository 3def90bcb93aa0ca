//! Purchase domain types.

use chrono::{DateTime, Utc};
use mecar_core::{CarId, CustomerId, PurchaseId};
use rust_decimal::Decimal;
use serde::Serialize;

/// A committed purchase, returned to the buyer.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRecord {
    pub id: PurchaseId,
    pub customer_id: CustomerId,
    pub car_id: CarId,
    pub car_name: String,
    pub car_price: Decimal,
    /// Commit timestamp of the purchase row.
    pub purchased_at: DateTime<Utc>,
}

/// One line of a customer's purchase history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseHistoryEntry {
    pub purchase_id: PurchaseId,
    pub car_id: CarId,
    pub car_name: String,
    pub car_price: Decimal,
    pub car_image: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

/// Why a car cannot be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRejection {
    CarNotFound,
    CarUnavailable,
    AlreadyPurchased,
}

/// State of a car as seen under its row lock, inside the purchase
/// transaction.
#[derive(Debug, Clone)]
pub struct CarSnapshot {
    pub id: CarId,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
    /// A purchase row already references this car.
    pub purchased: bool,
}

impl CarSnapshot {
    /// Check a (possibly missing) car against the purchase preconditions.
    ///
    /// An existing purchase row wins over the availability flag, so a car
    /// that is both sold and flagged unavailable reports `AlreadyPurchased`.
    ///
    /// # Errors
    ///
    /// Returns the first precondition that fails.
    pub fn check(snapshot: Option<Self>) -> Result<Self, PurchaseRejection> {
        match snapshot {
            None => Err(PurchaseRejection::CarNotFound),
            Some(car) if car.purchased => Err(PurchaseRejection::AlreadyPurchased),
            Some(car) if !car.is_available => Err(PurchaseRejection::CarUnavailable),
            Some(car) => Ok(car),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(is_available: bool, purchased: bool) -> CarSnapshot {
        CarSnapshot {
            id: CarId::new(7),
            name: "Corolla".to_owned(),
            price: Decimal::new(1_850_000, 2),
            is_available,
            purchased,
        }
    }

    #[test]
    fn test_missing_car() {
        assert_eq!(
            CarSnapshot::check(None).unwrap_err(),
            PurchaseRejection::CarNotFound
        );
    }

    #[test]
    fn test_available_car_passes() {
        let car = CarSnapshot::check(Some(snapshot(true, false))).unwrap();
        assert_eq!(car.id, CarId::new(7));
    }

    #[test]
    fn test_unavailable_without_purchase() {
        assert_eq!(
            CarSnapshot::check(Some(snapshot(false, false))).unwrap_err(),
            PurchaseRejection::CarUnavailable
        );
    }

    #[test]
    fn test_purchase_row_wins_over_flag() {
        assert_eq!(
            CarSnapshot::check(Some(snapshot(false, true))).unwrap_err(),
            PurchaseRejection::AlreadyPurchased
        );
        // Flag not yet flipped, row already present
        assert_eq!(
            CarSnapshot::check(Some(snapshot(true, true))).unwrap_err(),
            PurchaseRejection::AlreadyPurchased
        );
    }
}
