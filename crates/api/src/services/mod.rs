//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `token` - Signing and verifying bearer tokens
//! - `auth` - Registration, login and password hashing
//! - `purchase` - The atomic purchase workflow
//! - `profile` - Read, update and delete of the caller's own record

pub mod auth;
mod normalize;
pub mod profile;
pub mod purchase;
pub mod token;

pub use auth::{AuthError, AuthService, PasswordHasher};
pub use profile::{ProfileError, ProfileService};
pub use purchase::{PurchaseError, PurchaseService};
pub use token::{TokenError, TokenService};
