//! Status enums for the purchase workflow.

use serde::{Deserialize, Serialize};

/// Stage of a single (customer, car) purchase attempt.
///
/// ```text
/// Requested -> Validated -> Committed
/// Requested -> Rejected
/// Validated -> Rejected      (lost the race at commit time)
/// ```
///
/// `Committed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// The attempt has been received but nothing has been checked yet.
    #[default]
    Requested,
    /// The car exists, is available and has no purchase row.
    Validated,
    /// The purchase row is written and the car is marked sold.
    Committed,
    /// The attempt was refused; nothing was written.
    Rejected,
}

impl PurchaseStatus {
    /// Whether the attempt can move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Validated | Self::Rejected)
                | (Self::Validated, Self::Committed | Self::Rejected)
        )
    }

    /// Whether the attempt has reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Validated => write!(f, "validated"),
            Self::Committed => write!(f, "committed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}
