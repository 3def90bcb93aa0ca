//! Customer domain types.
//!
//! [`Customer`] has no password digest field at all, so no code path can
//! serialize one back to a caller.

use chrono::{DateTime, Utc};
use mecar_core::{CustomerId, Username};
use serde::Serialize;

use super::purchase::PurchaseHistoryEntry;

/// A registered customer (domain type).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// Full name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Postal address, if given.
    pub address: Option<String>,
    /// Unique login name (case-sensitive).
    pub username: Username,
    /// When the customer registered.
    pub created_at: DateTime<Utc>,
    /// When the profile last changed.
    pub updated_at: DateTime<Utc>,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub username: Username,
}

/// A partial profile update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub username: Option<Username>,
}

impl CustomerUpdate {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.username.is_none()
    }
}

/// A customer together with their purchase history.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub customer: Customer,
    pub purchases: Vec<PurchaseHistoryEntry>,
}
