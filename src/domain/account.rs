//! Accounts and their hashed secrets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;
use crate::error::StorefrontError;

/// Salted one-way hash of an account secret (bcrypt, PHC-like `$2b$` form).
///
/// Plain secrets never leave the request that carried them: they are hashed
/// on signup and verified with bcrypt's constant-time comparison on login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    /// Hashes `secret` with a fresh random salt at the given bcrypt cost.
    ///
    /// CPU-bound; call from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Internal`] if the cost is outside bcrypt's
    /// accepted range.
    pub fn hash(secret: &str, cost: u32) -> Result<Self, StorefrontError> {
        bcrypt::hash(secret, cost)
            .map(Self)
            .map_err(|e| StorefrontError::Internal(format!("secret hashing failed: {e}")))
    }

    /// Wraps an existing bcrypt hash (e.g. the configured admin hash).
    #[must_use]
    pub fn from_hash(hash: String) -> Self {
        Self(hash)
    }

    /// Returns `true` if `secret` matches this hash.
    ///
    /// A malformed stored hash never matches.
    #[must_use]
    pub fn verify(&self, secret: &str) -> bool {
        bcrypt::verify(secret, &self.0).unwrap_or(false)
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// A storefront customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Login email; unique across accounts, compared case-sensitively.
    pub email: String,
    /// Hashed secret.
    pub secret_hash: SecretHash,
    /// Spendable generation credits.
    pub credits: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Banned accounts cannot log in or use existing sessions.
    pub is_banned: bool,
    /// Set by the first approved purchase; never cleared.
    pub is_subscribed: bool,
}

impl Account {
    /// Creates a fresh, unbanned, unsubscribed account.
    #[must_use]
    pub fn new(name: String, email: String, secret_hash: SecretHash, credits: u64) -> Self {
        Self {
            id: AccountId::new(),
            name,
            email,
            secret_hash,
            credits,
            created_at: Utc::now(),
            is_banned: false,
            is_subscribed: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_original_secret_only() {
        let hash = SecretHash::hash("hunter22", 4);
        let Ok(hash) = hash else {
            panic!("cost 4 is valid");
        };
        assert!(hash.verify("hunter22"));
        assert!(!hash.verify("hunter23"));
    }

    #[test]
    fn hashes_are_salted() {
        let (Ok(a), Ok(b)) = (SecretHash::hash("same", 4), SecretHash::hash("same", 4)) else {
            panic!("cost 4 is valid");
        };
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_matches() {
        let hash = SecretHash::from_hash("plaintext".to_string());
        assert!(!hash.verify("plaintext"));
    }

    #[test]
    fn new_account_defaults() {
        let account = Account::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            SecretHash::from_hash(String::new()),
            50,
        );
        assert_eq!(account.credits, 50);
        assert!(!account.is_banned);
        assert!(!account.is_subscribed);
        assert!(!format!("{account:?}").contains("secret_hash: SecretHash(\""));
    }
}
