//! Manual purchase workflow: buyer claims, administrator approves.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    Account, AccountId, CreditChangeReason, EventBus, PlanId, PurchaseId, PurchaseRequest,
    PurchaseStatus, Store, StorefrontEvent,
};
use crate::error::StorefrontError;
use crate::persistence::Slot;
use crate::service::CreditLedger;

/// Result of [`PurchaseService::approve`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// Credits granted and the request marked approved.
    Approved {
        /// The approved request.
        request: PurchaseRequest,
        /// Buyer after the grant, or `None` if the account was deleted.
        account: Option<Account>,
        /// Credits granted by the plan.
        credits_granted: u64,
    },
    /// The request had already been approved; nothing changed.
    AlreadyApproved(PurchaseRequest),
    /// No request with this id; nothing changed.
    RequestNotFound,
    /// The request's plan no longer exists; nothing changed.
    PlanNotFound(PurchaseRequest),
}

/// Records payment claims and applies approvals.
#[derive(Debug, Clone)]
pub struct PurchaseService {
    store: Arc<Store>,
    ledger: CreditLedger,
    event_bus: EventBus,
}

impl PurchaseService {
    /// Creates a new `PurchaseService`.
    #[must_use]
    pub fn new(store: Arc<Store>, ledger: CreditLedger, event_bus: EventBus) -> Self {
        Self {
            store,
            ledger,
            event_bus,
        }
    }

    /// Records a pending claim that `account_id` paid for `plan_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] for a blank transaction
    /// reference, [`StorefrontError::PlanNotFound`] or
    /// [`StorefrontError::AccountNotFound`] for unknown ids.
    pub async fn submit(
        &self,
        account_id: AccountId,
        plan_id: PlanId,
        transaction_ref: &str,
    ) -> Result<PurchaseRequest, StorefrontError> {
        let transaction_ref = transaction_ref.trim();
        if transaction_ref.is_empty() {
            return Err(StorefrontError::InvalidRequest(
                "transaction reference must not be empty".to_string(),
            ));
        }
        let request = self
            .store
            .mutate(&[Slot::Purchases], |s| {
                let account = s
                    .account(account_id)
                    .ok_or(StorefrontError::AccountNotFound(*account_id.as_uuid()))?;
                let plan = s
                    .plan(plan_id)
                    .ok_or(StorefrontError::PlanNotFound(*plan_id.as_uuid()))?;
                let request = PurchaseRequest::new(account, plan, transaction_ref.to_string());
                s.purchases.push(request.clone());
                Ok(request)
            })
            .await?;

        let _ = self.event_bus.publish(StorefrontEvent::PurchaseSubmitted {
            account_id,
            purchase_id: request.id,
            plan_id,
            timestamp: Utc::now(),
        });
        tracing::info!(purchase_id = %request.id, %account_id, %plan_id, "purchase submitted");
        Ok(request)
    }

    /// Approves a pending request: grants the plan's credits, marks the
    /// buyer subscribed and the request approved in one store mutation.
    ///
    /// Approving twice grants credits once. A deleted buyer still gets the
    /// request marked approved.
    ///
    /// # Errors
    ///
    /// Returns a persistence error; every other condition is reported
    /// through [`ApprovalOutcome`].
    pub async fn approve(&self, purchase_id: PurchaseId) -> Result<ApprovalOutcome, StorefrontError> {
        let outcome = self
            .store
            .mutate(&[Slot::Accounts, Slot::Purchases], |s| {
                let Some(request) = s.purchases.iter().find(|p| p.id == purchase_id).cloned() else {
                    return Ok(ApprovalOutcome::RequestNotFound);
                };
                if !request.is_pending() {
                    return Ok(ApprovalOutcome::AlreadyApproved(request));
                }
                let Some(credits) = s.plan(request.plan_id).map(|p| p.credits) else {
                    return Ok(ApprovalOutcome::PlanNotFound(request));
                };

                let account = match CreditLedger::grant_in(s, request.account_id, credits) {
                    Ok(_) => s.account_mut(request.account_id).map(|account| {
                        account.is_subscribed = true;
                        account.clone()
                    }),
                    Err(StorefrontError::AccountNotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                let Some(stored) = s.purchase_mut(purchase_id) else {
                    return Ok(ApprovalOutcome::RequestNotFound);
                };
                stored.status = PurchaseStatus::Approved;
                stored.approved_at = Some(Utc::now());
                Ok(ApprovalOutcome::Approved {
                    request: stored.clone(),
                    account,
                    credits_granted: credits,
                })
            })
            .await?;

        match &outcome {
            ApprovalOutcome::Approved {
                request,
                account,
                credits_granted,
            } => {
                match account {
                    Some(account) => self.ledger.announce(
                        account,
                        i64::try_from(*credits_granted).unwrap_or(i64::MAX),
                        CreditChangeReason::PurchaseApproved,
                    ),
                    None => tracing::warn!(
                        %purchase_id,
                        account_id = %request.account_id,
                        "approved purchase for an account that no longer exists"
                    ),
                }
                let _ = self.event_bus.publish(StorefrontEvent::PurchaseApproved {
                    account_id: request.account_id,
                    purchase_id,
                    credits_granted: *credits_granted,
                    timestamp: Utc::now(),
                });
                tracing::info!(%purchase_id, account_id = %request.account_id, credits_granted, "purchase approved");
            }
            ApprovalOutcome::AlreadyApproved(_) => {
                tracing::info!(%purchase_id, "purchase already approved; no credits granted");
            }
            ApprovalOutcome::RequestNotFound => {
                tracing::warn!(%purchase_id, "approval for unknown purchase request ignored");
            }
            ApprovalOutcome::PlanNotFound(request) => {
                tracing::warn!(%purchase_id, plan_id = %request.plan_id, "approval ignored: plan no longer exists");
            }
        }
        Ok(outcome)
    }

    /// Returns all requests, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<PurchaseStatus>) -> Vec<PurchaseRequest> {
        let mut requests: Vec<PurchaseRequest> = self
            .store
            .read(|s| {
                s.purchases
                    .iter()
                    .filter(|p| status.is_none_or(|wanted| p.status == wanted))
                    .cloned()
                    .collect()
            })
            .await;
        requests.reverse();
        requests
    }

    /// Returns one account's requests, newest first.
    pub async fn list_for(&self, account_id: AccountId) -> Vec<PurchaseRequest> {
        let mut requests: Vec<PurchaseRequest> = self
            .store
            .read(|s| {
                s.purchases
                    .iter()
                    .filter(|p| p.account_id == account_id)
                    .cloned()
                    .collect()
            })
            .await;
        requests.reverse();
        requests
    }
}
