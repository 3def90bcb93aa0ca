//! Purchase workflow.
//!
//! One attempt moves through [`PurchaseStatus`]:
//!
//! ```text
//! Requested --lock + check--> Validated --insert + flip + commit--> Committed
//!     \                            \
//!      `--> Rejected                `--> Rejected (lost the race)
//! ```
//!
//! Validation and commit run in the same transaction with the car row
//! locked and the buyer's row held against deletion. A unique violation on `purchase.car_id` at insert time is still
//! handled as `AlreadyPurchased`, and dropping the transaction rolls back
//! anything written before it.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument};

use mecar_core::{CarId, CustomerId, PurchaseStatus, Username};

use crate::db::{CustomerRepository, PurchaseRepository, RepositoryError};
use crate::models::purchase::PurchaseRejection;
use crate::models::{CarSnapshot, Identity, PurchaseRecord};

/// Errors from the purchase workflow.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The token's subject no longer maps to a customer.
    #[error("customer not found")]
    CustomerNotFound,

    #[error("car not found")]
    CarNotFound,

    /// The car is flagged unavailable but has no purchase row.
    #[error("car is not available for purchase")]
    CarUnavailable,

    #[error("car has already been purchased")]
    AlreadyPurchased,

    /// Repository/database error. Nothing was committed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PurchaseRejection> for PurchaseError {
    fn from(rejection: PurchaseRejection) -> Self {
        match rejection {
            PurchaseRejection::CarNotFound => Self::CarNotFound,
            PurchaseRejection::CarUnavailable => Self::CarUnavailable,
            PurchaseRejection::AlreadyPurchased => Self::AlreadyPurchased,
        }
    }
}

/// Tracks the attempt's state and refuses illegal moves.
#[derive(Debug)]
struct Attempt {
    status: PurchaseStatus,
}

impl Attempt {
    fn new() -> Self {
        Self {
            status: PurchaseStatus::Requested,
        }
    }

    fn advance(&mut self, next: PurchaseStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal purchase transition {} -> {next}",
            self.status
        );
        debug!(from = %self.status, to = %next, "Purchase transition");
        self.status = next;
    }

    fn reject(&mut self, error: PurchaseError) -> PurchaseError {
        self.advance(PurchaseStatus::Rejected);
        error
    }
}

/// Purchase service.
pub struct PurchaseService<'a> {
    purchases: PurchaseRepository<'a>,
}

impl<'a> PurchaseService<'a> {
    /// Create a new purchase service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            purchases: PurchaseRepository::new(pool),
        }
    }

    /// Purchase a car on behalf of the authenticated caller.
    ///
    /// The caller's row must still match both the token's customer id and
    /// username when the car lock is granted.
    ///
    /// # Errors
    ///
    /// Same as [`PurchaseService::purchase`].
    #[instrument(skip(self, identity), fields(username = %identity.username))]
    pub async fn purchase_as(
        &self,
        identity: &Identity,
        car_id: CarId,
    ) -> Result<PurchaseRecord, PurchaseError> {
        self.run(identity.customer_id, Some(&identity.username), car_id).await
    }

    /// Atomically validate and record the purchase of `car_id`.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::CustomerNotFound` if the buyer's row is gone
    /// by the time the car is locked.
    /// Returns `PurchaseError::CarNotFound` if the car doesn't exist.
    /// Returns `PurchaseError::AlreadyPurchased` if a purchase row exists or
    /// a concurrent purchase committed first.
    /// Returns `PurchaseError::CarUnavailable` if the car is flagged sold
    /// without a purchase row.
    /// Returns `PurchaseError::Repository` on storage failure; nothing is
    /// committed in that case.
    #[instrument(skip(self))]
    pub async fn purchase(
        &self,
        customer_id: CustomerId,
        car_id: CarId,
    ) -> Result<PurchaseRecord, PurchaseError> {
        self.run(customer_id, None, car_id).await
    }

    async fn run(
        &self,
        customer_id: CustomerId,
        username: Option<&Username>,
        car_id: CarId,
    ) -> Result<PurchaseRecord, PurchaseError> {
        let mut attempt = Attempt::new();
        let mut tx = self.purchases.begin().await?;

        let snapshot = PurchaseRepository::lock_car(&mut *tx, car_id).await?;

        // Taken after the car lock so a delete that landed while we waited is seen
        if !CustomerRepository::lock(&mut *tx, customer_id, username).await? {
            info!(%customer_id, "Buyer no longer exists");
            return Err(attempt.reject(PurchaseError::CustomerNotFound));
        }

        let car = match CarSnapshot::check(snapshot) {
            Ok(car) => car,
            Err(rejection) => {
                info!(?rejection, "Purchase rejected");
                return Err(attempt.reject(rejection.into()));
            }
        };
        attempt.advance(PurchaseStatus::Validated);

        let (purchase_id, purchased_at) =
            match PurchaseRepository::insert(&mut *tx, customer_id, car_id).await {
                Ok(row) => row,
                Err(RepositoryError::Conflict(_)) => {
                    info!("Purchase lost the race at insert");
                    return Err(attempt.reject(PurchaseError::AlreadyPurchased));
                }
                Err(e) => return Err(e.into()),
            };

        match PurchaseRepository::mark_sold(&mut *tx, car_id).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                info!("Car flipped unavailable under the row lock");
                return Err(attempt.reject(PurchaseError::AlreadyPurchased));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        attempt.advance(PurchaseStatus::Committed);

        info!(%purchase_id, "Purchase committed");

        Ok(PurchaseRecord {
            id: purchase_id,
            customer_id,
            car_id: car.id,
            car_name: car.name,
            car_price: car.price,
            purchased_at,
        })
    }
}
