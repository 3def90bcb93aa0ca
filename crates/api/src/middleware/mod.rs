//! HTTP middleware stack for the marketplace API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed on the response)
//! 4. Rate limiting on signup/login only (governor)
//!
//! Authentication is not a layer: protected handlers take [`RequireAuth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{GateError, RequireAuth, authenticate};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
