//! Authenticated sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, SessionToken};

/// Who a session acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// An ordinary customer account.
    Account {
        /// The account behind the session.
        account_id: AccountId,
    },
    /// The configured administrator.
    Admin,
}

/// A logged-in bearer token and its principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token.
    pub token: SessionToken,
    /// Identity the token acts for.
    pub principal: Principal,
    /// Login timestamp.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Opens a session for a customer account.
    #[must_use]
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            token: SessionToken::generate(),
            principal: Principal::Account { account_id },
            created_at: Utc::now(),
        }
    }

    /// Opens an administrator session.
    #[must_use]
    pub fn for_admin() -> Self {
        Self {
            token: SessionToken::generate(),
            principal: Principal::Admin,
            created_at: Utc::now(),
        }
    }

    /// Returns the account id for customer sessions.
    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        match self.principal {
            Principal::Account { account_id } => Some(account_id),
            Principal::Admin => None,
        }
    }

    /// Returns `true` for administrator sessions.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.principal, Principal::Admin)
    }
}
