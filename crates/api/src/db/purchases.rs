//! Purchase repository.
//!
//! The commit steps take a `&mut PgConnection` so the caller can run them
//! inside one transaction:
//!
//! ```text
//! BEGIN
//!   SELECT ... FROM mecar.car WHERE id = $1 FOR UPDATE   -- lock_car
//!   SELECT EXISTS (... mecar.purchase ...)               -- lock_car
//!   SELECT id FROM mecar.customer ... FOR KEY SHARE      -- CustomerRepository::lock
//!   INSERT INTO mecar.purchase ...                       -- insert
//!   UPDATE mecar.car SET is_available = FALSE ...        -- mark_sold
//! COMMIT
//! ```
//!
//! `UNIQUE (car_id)` on `mecar.purchase` is the final arbiter: if two
//! transactions both get past validation, the second insert fails and
//! [`PurchaseRepository::insert`] reports `RepositoryError::Conflict`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use mecar_core::{CarId, CustomerId, PurchaseId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{CarSnapshot, PurchaseHistoryEntry};

#[derive(sqlx::FromRow)]
struct LockedCarRow {
    id: CarId,
    name: String,
    price: Decimal,
    is_available: bool,
}

/// Repository for purchase database operations.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Start the purchase transaction.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    /// Lock the car row and read its purchase state.
    ///
    /// The existence check runs as a separate statement after the lock is
    /// granted, so it sees any purchase committed by a transaction we
    /// waited on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn lock_car(
        conn: &mut PgConnection,
        car_id: CarId,
    ) -> Result<Option<CarSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, LockedCarRow>(
            r"
            SELECT id, name, price, is_available
            FROM mecar.car
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(car_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let purchased: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM mecar.purchase WHERE car_id = $1)")
                .bind(car_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(Some(CarSnapshot {
            id: row.id,
            name: row.name,
            price: row.price,
            is_available: row.is_available,
            purchased,
        }))
    }

    /// Insert the purchase row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the car already has a purchase.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        conn: &mut PgConnection,
        customer_id: CustomerId,
        car_id: CarId,
    ) -> Result<(PurchaseId, DateTime<Utc>), RepositoryError> {
        sqlx::query_as::<_, (PurchaseId, DateTime<Utc>)>(
            r"
            INSERT INTO mecar.purchase (customer_id, car_id)
            VALUES ($1, $2)
            RETURNING id, created_at
            ",
        )
        .bind(customer_id)
        .bind(car_id)
        .fetch_one(conn)
        .await
        .map_err(|e| conflict_on_unique(e, "car already purchased"))
    }

    /// Flip the car's availability flag off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the car was not available.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_sold(conn: &mut PgConnection, car_id: CarId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE mecar.car SET is_available = FALSE WHERE id = $1 AND is_available")
                .bind(car_id)
                .execute(conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict("car already sold".to_owned()));
        }
        Ok(())
    }

    /// A customer's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PurchaseHistoryEntry>, RepositoryError> {
        let purchases = sqlx::query_as::<_, PurchaseHistoryEntry>(
            r"
            SELECT p.id AS purchase_id,
                   c.id AS car_id,
                   c.name AS car_name,
                   c.price AS car_price,
                   c.image_url AS car_image,
                   p.created_at AS purchased_at
            FROM mecar.purchase p
            JOIN mecar.car c ON c.id = p.car_id
            WHERE p.customer_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(purchases)
    }
}
