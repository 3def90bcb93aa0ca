//! Domain models for the marketplace.
//!
//! These types are what services return and handlers serialize. Row types
//! that carry storage-only columns (the password digest) stay private to
//! the `db` module.

pub mod car;
pub mod customer;
pub mod identity;
pub mod purchase;

pub use car::{Car, CarSummary};
pub use customer::{Customer, CustomerUpdate, NewCustomer, Profile};
pub use identity::Identity;
pub use purchase::{CarSnapshot, PurchaseHistoryEntry, PurchaseRecord};
