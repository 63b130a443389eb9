//! Credit ledger: balance mutations and two-phase reservations.
//!
//! A generation reserves its credit before the remote call and settles the
//! reservation afterwards: [`CreditLedger::commit`] on success,
//! [`CreditLedger::release`] (exactly one compensating credit) on failure.
//! The check-and-decrement in [`CreditLedger::reserve`] runs under the
//! store's write lock, so concurrent requests cannot overdraw.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    Account, AccountId, CreditChangeReason, EventBus, Store, StoreState, StorefrontEvent,
};
use crate::error::StorefrontError;
use crate::persistence::Slot;

/// Credit held back from an account until the guarded operation settles.
///
/// Must be passed to [`CreditLedger::commit`] or [`CreditLedger::release`].
/// Dropping it unsettled leaves the credit debited and logs a warning.
#[derive(Debug)]
#[must_use = "a reservation must be committed or released"]
pub struct CreditReservation {
    id: uuid::Uuid,
    account_id: AccountId,
    amount: u64,
    settled: bool,
}

impl CreditReservation {
    /// Reservation identifier.
    pub const fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Account the credit was taken from.
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Reserved amount.
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    fn settle(mut self) -> (uuid::Uuid, AccountId, u64) {
        self.settled = true;
        (self.id, self.account_id, self.amount)
    }
}

impl Drop for CreditReservation {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                reservation = %self.id,
                account_id = %self.account_id,
                amount = self.amount,
                "credit reservation dropped without commit or release"
            );
        }
    }
}

/// A reservation that has not been settled yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingReservation {
    /// Reservation identifier.
    pub id: uuid::Uuid,
    /// Debited account.
    pub account_id: AccountId,
    /// Reserved amount.
    pub amount: u64,
    /// When the credit was reserved.
    pub reserved_at: DateTime<Utc>,
}

/// Applies every balance change and announces it on the event bus.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    store: Arc<Store>,
    event_bus: EventBus,
    outstanding: Arc<Mutex<HashMap<uuid::Uuid, OutstandingReservation>>>,
}

impl CreditLedger {
    /// Creates a ledger over the shared store.
    #[must_use]
    pub fn new(store: Arc<Store>, event_bus: EventBus) -> Self {
        Self {
            store,
            event_bus,
            outstanding: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Removes `amount` credits.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InsufficientCredits`] if the balance is
    /// smaller than `amount`, [`StorefrontError::AccountNotFound`] for an
    /// unknown account, or a persistence error.
    pub async fn debit(&self, account_id: AccountId, amount: u64) -> Result<Account, StorefrontError> {
        let account = self
            .store
            .mutate(&[Slot::Accounts], |s| take(s, account_id, amount))
            .await?;
        self.announce(&account, negative(amount), CreditChangeReason::Debit);
        Ok(account)
    }

    /// Adds `amount` credits, saturating at `u64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::AccountNotFound`] for an unknown account,
    /// or a persistence error.
    pub async fn credit(&self, account_id: AccountId, amount: u64) -> Result<Account, StorefrontError> {
        let account = self
            .store
            .mutate(&[Slot::Accounts], |s| give(s, account_id, amount))
            .await?;
        self.announce(&account, positive(amount), CreditChangeReason::Credit);
        Ok(account)
    }

    /// Atomically checks the balance and takes `amount` credits.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] for a zero amount,
    /// [`StorefrontError::InsufficientCredits`] if the balance cannot cover
    /// it (nothing is debited), [`StorefrontError::AccountNotFound`] for an
    /// unknown account, or a persistence error.
    pub async fn reserve(
        &self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<CreditReservation, StorefrontError> {
        if amount == 0 {
            return Err(StorefrontError::InvalidRequest(
                "reservation amount must be positive".to_string(),
            ));
        }
        let account = self
            .store
            .mutate(&[Slot::Accounts], |s| take(s, account_id, amount))
            .await?;

        let reservation = CreditReservation {
            id: uuid::Uuid::new_v4(),
            account_id,
            amount,
            settled: false,
        };
        self.outstanding.lock().await.insert(
            reservation.id,
            OutstandingReservation {
                id: reservation.id,
                account_id,
                amount,
                reserved_at: Utc::now(),
            },
        );
        tracing::debug!(reservation = %reservation.id, %account_id, amount, balance = account.credits, "credit reserved");
        self.announce(&account, negative(amount), CreditChangeReason::Reserved);
        Ok(reservation)
    }

    /// Finalizes a reservation. The balance is not touched.
    pub async fn commit(&self, reservation: CreditReservation) {
        let (id, account_id, amount) = reservation.settle();
        self.outstanding.lock().await.remove(&id);
        tracing::debug!(reservation = %id, %account_id, amount, "reservation committed");
    }

    /// Refunds exactly the reserved amount.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::AccountNotFound`] if the account was
    /// deleted in the meantime (the reservation is still settled), or a
    /// persistence error, in which case the reservation stays outstanding.
    pub async fn release(&self, reservation: CreditReservation) -> Result<Account, StorefrontError> {
        let (id, account_id, amount) = reservation.settle();
        let refunded = self
            .store
            .mutate(&[Slot::Accounts], |s| give(s, account_id, amount))
            .await;
        match refunded {
            Ok(account) => {
                self.outstanding.lock().await.remove(&id);
                tracing::debug!(reservation = %id, %account_id, amount, "reservation released");
                self.announce(&account, positive(amount), CreditChangeReason::Released);
                Ok(account)
            }
            Err(e @ StorefrontError::AccountNotFound(_)) => {
                self.outstanding.lock().await.remove(&id);
                tracing::warn!(reservation = %id, %account_id, "refund target no longer exists");
                Err(e)
            }
            Err(e) => {
                tracing::error!(reservation = %id, %account_id, amount, error = %e, "refund failed, credit lost");
                Err(e)
            }
        }
    }

    /// Returns reservations not yet committed or released, oldest first.
    pub async fn outstanding(&self) -> Vec<OutstandingReservation> {
        let mut pending: Vec<OutstandingReservation> =
            self.outstanding.lock().await.values().cloned().collect();
        pending.sort_by_key(|r| r.reserved_at);
        pending
    }

    /// Grants credits inside an existing store mutation and returns the new
    /// balance. The caller publishes the event once the mutation commits.
    pub(crate) fn grant_in(
        state: &mut StoreState,
        account_id: AccountId,
        amount: u64,
    ) -> Result<Account, StorefrontError> {
        give(state, account_id, amount)
    }

    /// Publishes a `CreditsChanged` event for an already applied change.
    pub(crate) fn announce(&self, account: &Account, delta: i64, reason: CreditChangeReason) {
        let _ = self.event_bus.publish(StorefrontEvent::CreditsChanged {
            account_id: account.id,
            delta,
            balance: account.credits,
            reason,
            timestamp: Utc::now(),
        });
    }
}

fn take(state: &mut StoreState, account_id: AccountId, amount: u64) -> Result<Account, StorefrontError> {
    let account = state
        .account_mut(account_id)
        .ok_or(StorefrontError::AccountNotFound(*account_id.as_uuid()))?;
    account.credits = account
        .credits
        .checked_sub(amount)
        .ok_or(StorefrontError::InsufficientCredits {
            balance: account.credits,
            required: amount,
        })?;
    Ok(account.clone())
}

fn give(state: &mut StoreState, account_id: AccountId, amount: u64) -> Result<Account, StorefrontError> {
    let account = state
        .account_mut(account_id)
        .ok_or(StorefrontError::AccountNotFound(*account_id.as_uuid()))?;
    account.credits = account.credits.saturating_add(amount);
    Ok(account.clone())
}

fn positive(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

fn negative(amount: u64) -> i64 {
    positive(amount).saturating_neg()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SecretHash;
    use crate::persistence::MemoryBackend;

    async fn ledger_with(credits: u64) -> (CreditLedger, AccountId) {
        let Ok(store) = Store::open(Arc::new(MemoryBackend::new())).await else {
            panic!("store should open");
        };
        let account = Account::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            SecretHash::from_hash(String::new()),
            credits,
        );
        let id = account.id;
        let inserted = store
            .mutate(&[Slot::Accounts], |s| {
                s.accounts.push(account);
                Ok(())
            })
            .await;
        assert!(inserted.is_ok());
        (CreditLedger::new(Arc::new(store), EventBus::new(64)), id)
    }

    async fn balance(ledger: &CreditLedger, id: AccountId) -> u64 {
        let Ok(account) = ledger.store.account(id).await else {
            panic!("account should exist");
        };
        account.credits
    }

    #[tokio::test]
    async fn debit_rejects_overdraw_without_mutation() {
        let (ledger, id) = ledger_with(2).await;
        let result = ledger.debit(id, 3).await;
        assert!(matches!(
            result,
            Err(StorefrontError::InsufficientCredits { balance: 2, required: 3 })
        ));
        assert_eq!(balance(&ledger, id).await, 2);
    }

    #[tokio::test]
    async fn credit_saturates() {
        let (ledger, id) = ledger_with(u64::MAX - 1).await;
        let Ok(account) = ledger.credit(id, 10).await else {
            panic!("credit should succeed");
        };
        assert_eq!(account.credits, u64::MAX);
    }

    #[tokio::test]
    async fn reserve_then_release_restores_balance() {
        let (ledger, id) = ledger_with(1).await;
        let Ok(reservation) = ledger.reserve(id, 1).await else {
            panic!("reserve should succeed");
        };
        assert_eq!(balance(&ledger, id).await, 0);
        assert_eq!(ledger.outstanding().await.len(), 1);

        let Ok(account) = ledger.release(reservation).await else {
            panic!("release should succeed");
        };
        assert_eq!(account.credits, 1);
        assert!(ledger.outstanding().await.is_empty());
    }

    #[tokio::test]
    async fn commit_keeps_debit() {
        let (ledger, id) = ledger_with(5).await;
        let Ok(reservation) = ledger.reserve(id, 1).await else {
            panic!("reserve should succeed");
        };
        ledger.commit(reservation).await;
        assert_eq!(balance(&ledger, id).await, 4);
        assert!(ledger.outstanding().await.is_empty());
    }

    #[tokio::test]
    async fn reserve_on_empty_balance_fails() {
        let (ledger, id) = ledger_with(0).await;
        assert!(matches!(
            ledger.reserve(id, 1).await,
            Err(StorefrontError::InsufficientCredits { balance: 0, required: 1 })
        ));
        assert!(ledger.outstanding().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_reservations_never_overdraw() {
        let (ledger, id) = ledger_with(3).await;
        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.reserve(id, 1).await }));
        }
        let mut granted = Vec::new();
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task should not panic");
            };
            if let Ok(reservation) = result {
                granted.push(reservation);
            }
        }
        assert_eq!(granted.len(), 3);
        assert_eq!(balance(&ledger, id).await, 0);
        for reservation in granted {
            ledger.commit(reservation).await;
        }
    }

    #[tokio::test]
    async fn dropped_reservation_stays_outstanding() {
        let (ledger, id) = ledger_with(2).await;
        let Ok(reservation) = ledger.reserve(id, 1).await else {
            panic!("reserve should succeed");
        };
        drop(reservation);
        let pending = ledger.outstanding().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.first().map(|r| r.account_id), Some(id));
        assert_eq!(balance(&ledger, id).await, 1);
    }

    #[tokio::test]
    async fn balance_changes_are_announced() {
        let (ledger, id) = ledger_with(2).await;
        let mut rx = ledger.event_bus.subscribe();
        let Ok(reservation) = ledger.reserve(id, 1).await else {
            panic!("reserve should succeed");
        };
        let Ok(StorefrontEvent::CreditsChanged { delta, balance, reason, .. }) = rx.recv().await
        else {
            panic!("expected credits_changed");
        };
        assert_eq!((delta, balance, reason), (-1, 1, CreditChangeReason::Reserved));
        ledger.commit(reservation).await;
    }
}
