//! Core types for MeCar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod status;
pub mod username;

pub use id::*;
pub use status::PurchaseStatus;
pub use username::{Username, UsernameError};
