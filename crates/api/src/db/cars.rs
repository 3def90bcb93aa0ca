//! Car catalog repository.
//!
//! Reads only. The availability flag is written by the purchase
//! transaction in [`super::purchases`].

use mecar_core::CarId;
use sqlx::PgPool;

use super::RepositoryError;
use crate::catalog::{CarFilters, build_search_query};
use crate::models::{Car, CarSummary};

/// Repository for car catalog queries.
pub struct CarRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CarRepository<'a> {
    /// Create a new car repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get one car by ID, sold or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        let car = sqlx::query_as::<_, Car>(
            r"
            SELECT id, name, make, model, year, price, mileage, image_url,
                   is_available, created_at
            FROM mecar.car
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(car)
    }

    /// Search available cars. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filters: &CarFilters) -> Result<Vec<CarSummary>, RepositoryError> {
        let mut query = build_search_query(filters);
        let cars = query
            .build_query_as::<CarSummary>()
            .fetch_all(self.pool)
            .await?;

        Ok(cars)
    }
}
