//! Profile workflow: the authenticated customer's own record.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use super::auth::{AuthError, parse_username};
use super::normalize::required_text;
use super::token::{TokenError, TokenService};
use crate::db::{CustomerRepository, PurchaseRepository, RepositoryError};
use crate::models::{Customer, CustomerUpdate, Identity, Profile};

/// Errors from the profile workflow.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The token's subject no longer maps to a customer.
    #[error("customer not found")]
    CustomerNotFound,

    #[error("no fields provided to update")]
    NoFieldsProvided,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("{0}")]
    InvalidInput(String),

    /// The replacement token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw partial update as sent by the client. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ProfileChanges {
    /// Validate into a [`CustomerUpdate`].
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidInput` for a blank or malformed field.
    pub fn validate(self) -> Result<CustomerUpdate, ProfileError> {
        let text = |field: &str, value: Option<String>| {
            value
                .map(|v| required_text(field, &v))
                .transpose()
                .map_err(ProfileError::InvalidInput)
        };

        let username = self
            .username
            .map(|raw| parse_username(&raw))
            .transpose()
            .map_err(|e| match e {
                AuthError::InvalidInput(msg) => ProfileError::InvalidInput(msg),
                other => ProfileError::InvalidInput(other.to_string()),
            })?;

        Ok(CustomerUpdate {
            name: text("name", self.name)?,
            phone: text("phone", self.phone)?,
            address: text("address", self.address)?,
            username,
        })
    }
}

/// Result of a profile update.
#[derive(Debug)]
pub struct UpdatedProfile {
    pub profile: Profile,
    /// Set only when the username changed; the old token's subject is stale.
    pub new_token: Option<String>,
}

/// Profile service.
pub struct ProfileService<'a> {
    customers: CustomerRepository<'a>,
    purchases: PurchaseRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> ProfileService<'a> {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
            purchases: PurchaseRepository::new(pool),
            tokens,
        }
    }

    /// The caller's profile with purchase history.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::CustomerNotFound` if the identity is stale.
    pub async fn get(&self, identity: &Identity) -> Result<Profile, ProfileError> {
        let customer = self.resolve(identity).await?;
        self.with_history(customer).await
    }

    /// Apply a non-empty partial update.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NoFieldsProvided` if `update` changes nothing.
    /// Returns `ProfileError::UsernameTaken` if the new username collides.
    /// Returns `ProfileError::CustomerNotFound` if the row vanished.
    #[instrument(skip(self, update), fields(username = %identity.username))]
    pub async fn update(
        &self,
        identity: &Identity,
        update: CustomerUpdate,
    ) -> Result<UpdatedProfile, ProfileError> {
        if update.is_empty() {
            return Err(ProfileError::NoFieldsProvided);
        }

        let customer = self
            .customers
            .update(identity.customer_id, &identity.username, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ProfileError::CustomerNotFound,
                RepositoryError::Conflict(_) => ProfileError::UsernameTaken,
                other => ProfileError::Repository(other),
            })?;

        let new_token = if customer.username == identity.username {
            None
        } else {
            info!(new_username = %customer.username, "Username changed, issuing new token");
            Some(self.tokens.issue_default(customer.username.as_str(), customer.id)?)
        };

        let profile = self.with_history(customer).await?;
        Ok(UpdatedProfile { profile, new_token })
    }

    /// Delete the caller's account.
    ///
    /// Purchase rows are kept with their `customer_id` for audit.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::CustomerNotFound` if already gone.
    #[instrument(skip(self), fields(username = %identity.username))]
    pub async fn delete(&self, identity: &Identity) -> Result<(), ProfileError> {
        let customer = self.resolve(identity).await?;

        if !self.customers.delete(customer.id).await? {
            return Err(ProfileError::CustomerNotFound);
        }

        info!(customer_id = %customer.id, "Customer deleted");
        Ok(())
    }

    async fn resolve(&self, identity: &Identity) -> Result<Customer, ProfileError> {
        self.customers
            .get_by_identity(identity.customer_id, &identity.username)
            .await?
            .ok_or(ProfileError::CustomerNotFound)
    }

    async fn with_history(&self, customer: Customer) -> Result<Profile, ProfileError> {
        let purchases = self.purchases.list_for_customer(customer.id).await?;
        Ok(Profile {
            customer,
            purchases,
        })
    }
}
