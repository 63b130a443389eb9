//! Purchase requests awaiting manual approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Account, AccountId, Plan, PlanId, PurchaseId};

/// Approval status of a [`PurchaseRequest`]. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Submitted, waiting for the administrator.
    Pending,
    /// Credits granted.
    Approved,
}

/// A buyer's claim that they paid for a plan out of band.
///
/// The transaction reference is whatever the buyer typed; it is never
/// checked against a payment rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Unique request identifier.
    pub id: PurchaseId,
    /// Buyer account.
    pub account_id: AccountId,
    /// Buyer name at submission time.
    pub account_name: String,
    /// Purchased plan.
    pub plan_id: PlanId,
    /// Plan name at submission time.
    pub plan_name: String,
    /// External transaction reference supplied by the buyer.
    pub transaction_ref: String,
    /// Current status.
    pub status: PurchaseStatus,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Approval timestamp, once approved.
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

impl PurchaseRequest {
    /// Creates a pending request copying the account and plan names.
    #[must_use]
    pub fn new(account: &Account, plan: &Plan, transaction_ref: String) -> Self {
        Self {
            id: PurchaseId::new(),
            account_id: account.id,
            account_name: account.name.clone(),
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            transaction_ref,
            status: PurchaseStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
        }
    }

    /// Returns `true` while the request awaits approval.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == PurchaseStatus::Pending
    }
}
