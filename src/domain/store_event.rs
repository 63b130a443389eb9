//! Domain events reflecting storefront state mutations.
//!
//! Every state change emits a [`StorefrontEvent`] through the
//! [`super::EventBus`]. Events are streamed to WebSocket clients: customers
//! see their own account's events, the administrator sees everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, AspectRatio, JobId, PlanId, PurchaseId, SessionToken};

/// Why an account balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditChangeReason {
    /// Credit reserved for a generation.
    Reserved,
    /// Reserved credit refunded after a failed generation.
    Released,
    /// Plain debit.
    Debit,
    /// Plain credit.
    Credit,
    /// Plan credits granted by an approved purchase.
    PurchaseApproved,
}

/// Coarse event grouping used by WebSocket subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    /// Account lifecycle and moderation.
    Accounts,
    /// Balance changes.
    Credits,
    /// Generation jobs.
    Jobs,
    /// Purchase requests.
    Purchases,
    /// Plan catalog.
    Plans,
}

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum StorefrontEvent {
    /// A new account signed up.
    AccountCreated {
        /// New account.
        account_id: AccountId,
        /// Starting balance.
        credits: u64,
        /// Signup timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The administrator banned or unbanned an account.
    AccountBanChanged {
        /// Affected account.
        account_id: AccountId,
        /// New banned flag.
        banned: bool,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The administrator deleted an account.
    AccountDeleted {
        /// Deleted account.
        account_id: AccountId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A session logged out. Connections opened with its token close.
    SessionClosed {
        /// Closed bearer token; never sent to clients.
        #[serde(skip_serializing)]
        token: SessionToken,
        /// Customer behind the session, `None` for the administrator.
        account_id: Option<AccountId>,
        /// Logout timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An account balance changed.
    CreditsChanged {
        /// Affected account.
        account_id: AccountId,
        /// Signed change applied.
        delta: i64,
        /// Balance after the change.
        balance: u64,
        /// Why the balance changed.
        reason: CreditChangeReason,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A generation job was accepted and its credit reserved.
    JobStarted {
        /// Paying account.
        account_id: AccountId,
        /// New job.
        job_id: JobId,
        /// Prompt text.
        prompt: String,
        /// Requested aspect ratio.
        aspect_ratio: AspectRatio,
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A generation job produced an image.
    JobCompleted {
        /// Paying account.
        account_id: AccountId,
        /// Completed job.
        job_id: JobId,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A generation job failed and its credit was refunded.
    JobFailed {
        /// Paying account.
        account_id: AccountId,
        /// Failed job.
        job_id: JobId,
        /// Error message from the remote generator.
        error: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A buyer submitted a payment claim.
    PurchaseSubmitted {
        /// Buyer account.
        account_id: AccountId,
        /// New purchase request.
        purchase_id: PurchaseId,
        /// Purchased plan.
        plan_id: PlanId,
        /// Submission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The administrator approved a purchase request.
    PurchaseApproved {
        /// Buyer account.
        account_id: AccountId,
        /// Approved request.
        purchase_id: PurchaseId,
        /// Credits granted.
        credits_granted: u64,
        /// Approval timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The administrator added a plan.
    PlanAdded {
        /// New plan.
        plan_id: PlanId,
        /// Plan name.
        name: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The administrator removed a plan.
    PlanRemoved {
        /// Removed plan.
        plan_id: PlanId,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl StorefrontEvent {
    /// Returns the account this event concerns, if any.
    #[must_use]
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::AccountCreated { account_id, .. }
            | Self::AccountBanChanged { account_id, .. }
            | Self::AccountDeleted { account_id, .. }
            | Self::CreditsChanged { account_id, .. }
            | Self::JobStarted { account_id, .. }
            | Self::JobCompleted { account_id, .. }
            | Self::JobFailed { account_id, .. }
            | Self::PurchaseSubmitted { account_id, .. }
            | Self::PurchaseApproved { account_id, .. } => Some(*account_id),
            Self::SessionClosed { account_id, .. } => *account_id,
            Self::PlanAdded { .. } | Self::PlanRemoved { .. } => None,
        }
    }

    /// Returns the subscription topic of this event.
    #[must_use]
    pub const fn topic(&self) -> EventTopic {
        match self {
            Self::AccountCreated { .. }
            | Self::AccountBanChanged { .. }
            | Self::AccountDeleted { .. }
            | Self::SessionClosed { .. } => EventTopic::Accounts,
            Self::CreditsChanged { .. } => EventTopic::Credits,
            Self::JobStarted { .. } | Self::JobCompleted { .. } | Self::JobFailed { .. } => {
                EventTopic::Jobs
            }
            Self::PurchaseSubmitted { .. } | Self::PurchaseApproved { .. } => {
                EventTopic::Purchases
            }
            Self::PlanAdded { .. } | Self::PlanRemoved { .. } => EventTopic::Plans,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => "account_created",
            Self::AccountBanChanged { .. } => "account_ban_changed",
            Self::AccountDeleted { .. } => "account_deleted",
            Self::SessionClosed { .. } => "session_closed",
            Self::CreditsChanged { .. } => "credits_changed",
            Self::JobStarted { .. } => "job_started",
            Self::JobCompleted { .. } => "job_completed",
            Self::JobFailed { .. } => "job_failed",
            Self::PurchaseSubmitted { .. } => "purchase_submitted",
            Self::PurchaseApproved { .. } => "purchase_approved",
            Self::PlanAdded { .. } => "plan_added",
            Self::PlanRemoved { .. } => "plan_removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failed_serializes_with_tag() {
        let event = StorefrontEvent::JobFailed {
            account_id: AccountId::new(),
            job_id: JobId::new(),
            error: "blocked by safety policy".to_string(),
            timestamp: Utc::now(),
        };
        let json_str = serde_json::to_string(&event).unwrap_or_default();
        assert!(json_str.contains("\"event_type\":\"job_failed\""));
        assert!(json_str.contains("blocked by safety policy"));
        assert_eq!(event.topic(), EventTopic::Jobs);
    }

    #[test]
    fn plan_events_have_no_account() {
        let event = StorefrontEvent::PlanRemoved {
            plan_id: PlanId::new(),
            timestamp: Utc::now(),
        };
        assert!(event.account_id().is_none());
        assert_eq!(event.event_type_str(), "plan_removed");
    }

    #[test]
    fn session_closed_hides_its_token() {
        let token = SessionToken::generate();
        let event = StorefrontEvent::SessionClosed {
            token: token.clone(),
            account_id: None,
            timestamp: Utc::now(),
        };
        let json_str = serde_json::to_string(&event).unwrap_or_default();
        assert!(json_str.contains("\"event_type\":\"session_closed\""));
        assert!(!json_str.contains(token.as_str()));
        assert_eq!(event.topic(), EventTopic::Accounts);
    }

    #[test]
    fn account_id_accessor() {
        let id = AccountId::new();
        let event = StorefrontEvent::CreditsChanged {
            account_id: id,
            delta: -1,
            balance: 4,
            reason: CreditChangeReason::Reserved,
            timestamp: Utc::now(),
        };
        assert_eq!(event.account_id(), Some(id));
        assert_eq!(event.topic(), EventTopic::Credits);
    }
}
