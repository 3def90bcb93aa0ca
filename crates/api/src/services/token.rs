//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the username as `sub` and the customer id
//! as `cid`. The accepted algorithm is fixed by [`Validation`], never taken
//! from the token header. Expiry is inclusive: a token stops working at the
//! second named by `exp`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mecar_core::CustomerId;

use crate::config::TokenConfig;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token's expiry has passed.
    #[error("token has expired")]
    Expired,

    /// Bad structure, wrong algorithm, or a signature that does not verify.
    #[error("token is malformed or has an invalid signature")]
    MalformedOrForged,

    /// The token could not be produced.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    cid: CustomerId,
    iat: i64,
    exp: i64,
}

/// What a verified token asserts about its bearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub username: String,
    pub customer_id: CustomerId,
}

/// Issues and verifies bearer tokens with the process-wide signing key.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"[REDACTED]")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a token service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the key is empty.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(TokenError::Signing("empty signing key".to_owned()));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: config.ttl,
        })
    }

    /// Default lifetime of issued tokens.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` with the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue_default(
        &self,
        subject: &str,
        customer_id: CustomerId,
    ) -> Result<String, TokenError> {
        self.issue(subject, customer_id, self.ttl)
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue(
        &self,
        subject: &str,
        customer_id: CustomerId,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, customer_id, ttl, Utc::now())
    }

    /// Verify a token and return what it asserts.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` once the current time reaches the expiry.
    /// Returns `TokenError::MalformedOrForged` for anything else wrong.
    pub fn verify(&self, token: &str) -> Result<TokenSubject, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn issue_at(
        &self,
        subject: &str,
        customer_id: CustomerId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| iat.checked_add(secs))
            .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_owned()))?;

        let claims = Claims {
            sub: subject.to_owned(),
            cid: customer_id,
            iat,
            exp,
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenSubject, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::MalformedOrForged,
            })?;

        // The library treats `exp` itself as still valid
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(TokenSubject {
            username: data.claims.sub,
            customer_id: data.claims.cid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use secrecy::SecretString;

    const HOUR: Duration = Duration::from_secs(3600);
    const SECRET: &str = "k3Yf9!vQ2#pLm8@xR4$wZ7^tB1&nH6*c";
    const ALICE: CustomerId = CustomerId::new(7);

    fn service(secret: &str) -> TokenService {
        TokenService::new(&TokenConfig {
            secret: SecretString::from(secret.to_owned()),
            ttl: HOUR,
        })
        .unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn claims_json(exp: i64) -> String {
        format!(r#"{{"sub":"alice","cid":7,"iat":0,"exp":{exp}}}"#)
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let tokens = service(SECRET);
        let now = Utc::now();
        let token = tokens.issue_at("alice", ALICE, HOUR, now).unwrap();

        let expected = TokenSubject {
            username: "alice".to_owned(),
            customer_id: ALICE,
        };
        assert_eq!(tokens.verify_at(&token, now).unwrap(), expected);
        assert_eq!(tokens.verify_at(&token, now + secs(3599)).unwrap(), expected);
    }

    #[test]
    fn test_expired_exactly_at_exp() {
        let tokens = service(SECRET);
        let now = Utc::now();
        let token = tokens.issue_at("alice", ALICE, HOUR, now).unwrap();

        assert_eq!(
            tokens.verify_at(&token, now + secs(3600)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expired_long_ago() {
        let tokens = service(SECRET);
        let now = Utc::now();
        let token = tokens.issue_at("alice", ALICE, HOUR, now - secs(7200)).unwrap();

        assert_eq!(tokens.verify_at(&token, now), Err(TokenError::Expired));
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_zero_ttl_is_already_expired() {
        let tokens = service(SECRET);
        let token = tokens.issue("alice", ALICE, Duration::ZERO).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_issue_and_verify_with_clock() {
        let tokens = service(SECRET);
        let token = tokens.issue_default("bob", CustomerId::new(8)).unwrap();

        let subject = tokens.verify(&token).unwrap();
        assert_eq!(subject.username, "bob");
        assert_eq!(subject.customer_id, CustomerId::new(8));
    }

    #[test]
    fn test_other_key_is_forged() {
        let ours = service(SECRET);
        let theirs = service("Q8w#Lr2!zXn5@Tp9$Vb4^Hs7&Jd1*Mk6");
        let now = Utc::now();
        let token = theirs.issue_at("alice", ALICE, HOUR, now).unwrap();

        assert_eq!(ours.verify_at(&token, now), Err(TokenError::MalformedOrForged));
    }

    #[test]
    fn test_spliced_claims_are_forged() {
        let tokens = service(SECRET);
        let now = Utc::now();
        let alice = tokens.issue_at("alice", ALICE, HOUR, now).unwrap();
        let mallory = tokens
            .issue_at("mallory", CustomerId::new(9), HOUR, now)
            .unwrap();

        let alice: Vec<&str> = alice.split('.').collect();
        let mallory: Vec<&str> = mallory.split('.').collect();
        let spliced = format!("{}.{}.{}", alice[0], mallory[1], alice[2]);

        assert_eq!(
            tokens.verify_at(&spliced, now),
            Err(TokenError::MalformedOrForged)
        );
    }

    #[test]
    fn test_expired_token_with_bad_signature_is_forged() {
        let ours = service(SECRET);
        let theirs = service("Q8w#Lr2!zXn5@Tp9$Vb4^Hs7&Jd1*Mk6");
        let now = Utc::now();
        let token = theirs.issue_at("alice", ALICE, HOUR, now - secs(7200)).unwrap();

        assert_eq!(ours.verify_at(&token, now), Err(TokenError::MalformedOrForged));
    }

    #[test]
    fn test_algorithm_is_not_negotiated() {
        let tokens = service(SECRET);
        let now = Utc::now();
        let exp = (now + secs(3600)).timestamp();

        // Unsigned token
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(claims_json(exp));
        let unsigned = format!("{header}.{claims}.");
        assert_eq!(
            tokens.verify_at(&unsigned, now),
            Err(TokenError::MalformedOrForged)
        );

        // Correct key, but another algorithm
        let claims = Claims {
            sub: "alice".to_owned(),
            cid: ALICE,
            iat: now.timestamp(),
            exp,
        };
        let relabelled = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            tokens.verify_at(&relabelled, now),
            Err(TokenError::MalformedOrForged)
        );
    }

    #[test]
    fn test_missing_customer_id_is_malformed() {
        #[derive(Serialize)]
        struct UsernameOnly {
            sub: &'static str,
            exp: i64,
        }

        let tokens = service(SECRET);
        let now = Utc::now();
        let token = jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &UsernameOnly {
                sub: "alice",
                exp: (now + secs(3600)).timestamp(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(tokens.verify_at(&token, now), Err(TokenError::MalformedOrForged));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = service(SECRET);
        let now = Utc::now();
        for garbage in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert_eq!(
                tokens.verify_at(garbage, now),
                Err(TokenError::MalformedOrForged),
                "{garbage:?}"
            );
        }
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let result = TokenService::new(&TokenConfig {
            secret: SecretString::from(String::new()),
            ttl: HOUR,
        });
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let tokens = service(SECRET);
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("k3Yf9"));
        assert!(debug.contains("[REDACTED]"));
    }
}
