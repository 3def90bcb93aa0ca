//! Authentication service.
//!
//! Registration and password login. Both return a freshly issued bearer
//! token alongside the customer.

mod error;
mod password;

pub use error::AuthError;
pub use password::PasswordHasher;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use mecar_core::Username;

use super::normalize::{optional_text, required_text};
use super::token::TokenService;
use crate::db::{CustomerRepository, RepositoryError};
use crate::models::{Customer, NewCustomer};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length, bounding hashing cost.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Registration input.
#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Login input.
#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A customer together with a newly issued token.
#[derive(Debug)]
pub struct Session {
    pub customer: Customer,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    customers: CustomerRepository<'a>,
    tokens: &'a TokenService,
    hasher: &'a PasswordHasher,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        tokens: &'a TokenService,
        hasher: &'a PasswordHasher,
    ) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
            tokens,
            hasher,
        }
    }

    /// Register a new customer and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a field is missing or malformed.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UsernameTaken` if the username is already registered.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Session, AuthError> {
        let customer = NewCustomer {
            name: required_text("name", &registration.name).map_err(AuthError::InvalidInput)?,
            phone: required_text("phone", &registration.phone).map_err(AuthError::InvalidInput)?,
            address: optional_text("address", registration.address.as_deref())
                .map_err(AuthError::InvalidInput)?,
            username: parse_username(&registration.username)?,
        };

        validate_password(&registration.password)?;
        let password_hash = self.hasher.hash(&registration.password)?;

        let customer = self
            .customers
            .create(&customer, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UsernameTaken,
                other => AuthError::Repository(other),
            })?;

        let token = self.tokens.issue_default(customer.username.as_str(), customer.id)?;
        info!(customer_id = %customer.id, "Customer registered");

        Ok(Session { customer, token })
    }

    /// Log in with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, login), fields(username = %login.username))]
    pub async fn login(&self, login: Login) -> Result<Session, AuthError> {
        // An unparseable username cannot exist, so it is just a wrong login
        let username = Username::parse(login.username.trim())
            .map_err(|_| self.hasher.reject_unknown(&login.password))?;

        let (customer, password_hash) = self
            .customers
            .get_credentials(&username)
            .await?
            .ok_or_else(|| self.hasher.reject_unknown(&login.password))?;

        self.hasher.verify(&login.password, &password_hash)?;

        let token = self.tokens.issue_default(customer.username.as_str(), customer.id)?;
        Ok(Session { customer, token })
    }
}

/// Parse a username from request input.
pub(crate) fn parse_username(raw: &str) -> Result<Username, AuthError> {
    Username::parse(raw.trim()).map_err(|e| AuthError::InvalidInput(format!("username: {e}")))
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}
