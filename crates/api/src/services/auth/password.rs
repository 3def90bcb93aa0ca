//! Password hashing capability.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use super::AuthError;

/// Argon2id password hashing, shared through application state.
///
/// Every call to [`PasswordHasher::hash`] draws a fresh random salt; the
/// salt travels inside the PHC string, so no salt is stored anywhere else.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Digest verified against when no account matches a login.
    decoy: Option<String>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let decoy = argon2
            .hash_password(b"no account has this password", &salt)
            .map(|hash| hash.to_string())
            .ok();

        Self { argon2, decoy }
    }

    /// Hash a password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Verify a password against a stored PHC string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or an unparseable digest.
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Reject a login that matched no account.
    ///
    /// Runs a full verification against a throwaway digest first, so an
    /// unknown username costs the same as a wrong password.
    pub fn reject_unknown(&self, password: &str) -> AuthError {
        if let Some(decoy) = &self.decoy {
            let _ = self.verify(password, decoy);
        }
        AuthError::InvalidCredentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse battery", &hash).is_ok());
        assert!(matches!(
            hasher.verify("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_fresh_salt_per_hash() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("same password").unwrap();
        let second = hasher.hash("same password").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same password", &first).is_ok());
        assert!(hasher.verify("same password", &second).is_ok());
    }

    #[test]
    fn test_unknown_account_still_verifies() {
        let hasher = PasswordHasher::new();
        let decoy = hasher.decoy.as_deref().unwrap();
        assert!(decoy.starts_with("$argon2id$"));

        assert!(matches!(
            hasher.reject_unknown("whatever"),
            AuthError::InvalidCredentials
        ));
        // Even the decoy's own password is rejected
        assert!(matches!(
            hasher.reject_unknown("no account has this password"),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_garbage_digest_is_invalid_credentials() {
        let hasher = PasswordHasher::new();
        assert!(matches!(
            hasher.verify("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
