//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (database reachable)
//!
//! # Catalog (public)
//! GET    /api/cars                   - Search available cars
//! GET    /api/car/{car_id}           - Car detail, sold or not
//!
//! # Customers (rate limited)
//! POST   /api/customer/signup        - Register, returns a token
//! POST   /api/customer/login         - Log in, returns a token
//!
//! # Profile (bearer token)
//! GET    /api/user/me                - Profile and purchase history
//! PUT    /api/user/me                - Partial update
//! DELETE /api/user/me                - Delete account
//!
//! # Purchases (bearer token)
//! POST   /api/car/{car_id}/purchase  - Buy a car
//! ```

pub mod cars;
pub mod customers;
pub mod health;
pub mod profile;
pub mod purchases;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(customers::signup))
        .route("/login", post(customers::login))
        .layer(auth_rate_limiter())
}

/// Create the car routes router.
pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/{car_id}", get(cars::show))
        .route("/{car_id}/purchase", post(purchases::purchase))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/cars", get(cars::search))
        .nest("/api/car", car_routes())
        .nest("/api/customer", customer_routes())
        .route(
            "/api/user/me",
            get(profile::show)
                .put(profile::update)
                .delete(profile::delete),
        )
}
