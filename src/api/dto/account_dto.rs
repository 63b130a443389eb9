//! Account DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::PaginationMeta;
use crate::domain::Account;

/// Public view of an account; the secret hash is never serialized.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountDto {
    /// Account identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Spendable credits.
    pub credits: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the account is banned.
    pub is_banned: bool,
    /// Whether the account has an approved purchase.
    pub is_subscribed: bool,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.into(),
            name: account.name,
            email: account.email,
            credits: account.credits,
            created_at: account.created_at,
            is_banned: account.is_banned,
            is_subscribed: account.is_subscribed,
        }
    }
}

/// Paginated response for `GET /admin/accounts`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountListResponse {
    /// Accounts on this page.
    pub data: Vec<AccountDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
