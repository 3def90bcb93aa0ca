//! Caller identity resolved by the auth gate.

use mecar_core::{CustomerId, Username};

/// The authenticated caller: the customer id and username carried by a
/// verified bearer token.
///
/// Holding an `Identity` proves the token was valid when the request arrived,
/// not that the customer row still exists. Workflows re-resolve the row by
/// both id and username and report `CustomerNotFound` for stale tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub customer_id: CustomerId,
    pub username: Username,
}

impl Identity {
    #[must_use]
    pub const fn new(customer_id: CustomerId, username: Username) -> Self {
        Self {
            customer_id,
            username,
        }
    }
}
