//! MeCar Core - Shared domain types.
//!
//! This crate provides the types shared by every MeCar component:
//! - `api` - The marketplace HTTP service (catalog, accounts, purchases)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Database encoding for the newtypes is behind the optional `postgres`
//! feature so the crate stays usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, the validated [`Username`], and the purchase state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
