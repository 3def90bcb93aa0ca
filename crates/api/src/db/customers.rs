//! Customer repository for database operations.
//!
//! The password digest is only ever read by [`CustomerRepository::get_credentials`]
//! and never leaves this module inside a [`Customer`].

use sqlx::{PgConnection, PgPool};

use mecar_core::{CustomerId, Username};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Customer, CustomerUpdate, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, username, created_at, updated_at";

/// Customer row joined with its password digest, for login.
#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    customer: Customer,
    password_hash: String,
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the customer a token names.
    ///
    /// Both the id and the username must match, so a token outlives neither a
    /// rename nor a delete followed by re-registration under the same name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_identity(
        &self,
        id: CustomerId,
        username: &Username,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM mecar.customer WHERE id = $1 AND username = $2"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    /// Lock a customer row against deletion for the rest of the transaction.
    ///
    /// `FOR KEY SHARE` blocks a concurrent `DELETE` until commit while still
    /// letting profile updates through. When `username` is given it must
    /// match as well. Returns `false` if no such customer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock(
        conn: &mut PgConnection,
        id: CustomerId,
        username: Option<&Username>,
    ) -> Result<bool, RepositoryError> {
        let row: Option<CustomerId> = sqlx::query_scalar(
            r"
            SELECT id FROM mecar.customer
            WHERE id = $1 AND ($2::TEXT IS NULL OR username = $2)
            FOR KEY SHARE
            ",
        )
        .bind(id)
        .bind(username)
        .fetch_optional(conn)
        .await?;

        Ok(row.is_some())
    }

    /// Get a customer and their password digest for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(Customer, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS}, password_hash FROM mecar.customer WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.customer, r.password_hash)))
    }

    /// Create a new customer with a password digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        customer: &NewCustomer,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            INSERT INTO mecar.customer (name, phone, address, username, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.address.as_deref())
        .bind(&customer.username)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username already exists"))
    }

    /// Apply a partial update to the customer with this id and username.
    ///
    /// Fields left as `None` keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no customer matches both.
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CustomerId,
        username: &Username,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            UPDATE mecar.customer
            SET name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                username = COALESCE($4, username),
                updated_at = NOW()
            WHERE id = $5 AND username = $6
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .bind(update.username.as_ref())
        .bind(id)
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a customer.
    ///
    /// Purchase rows keep their `customer_id` for audit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM mecar.customer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
