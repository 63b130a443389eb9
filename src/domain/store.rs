//! Process-wide persisted store.
//!
//! [`Store`] holds the four persisted collections behind a single
//! [`tokio::sync::RwLock`]. Readers share the lock; every mutation takes the
//! write lock, applies its change to the live state, writes the snapshot of
//! each touched [`Slot`] through the injected [`SnapshotBackend`] and only
//! then releases. If the closure or any snapshot write fails, the in-memory
//! state is restored to what it was before the mutation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::{Account, AccountId, Plan, PlanId, PurchaseId, PurchaseRequest, Session, SessionToken};
use super::plan::default_plans;
use crate::error::StorefrontError;
use crate::persistence::{Slot, SnapshotBackend};

/// The four persisted collections.
///
/// Accounts, plans and purchases keep insertion order; sessions are keyed
/// by token.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// All accounts.
    pub accounts: Vec<Account>,
    /// Plan catalog.
    pub plans: Vec<Plan>,
    /// Purchase requests, oldest first.
    pub purchases: Vec<PurchaseRequest>,
    /// Open sessions.
    pub sessions: HashMap<SessionToken, Session>,
}

impl StoreState {
    /// Returns the account with the given id.
    #[must_use]
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Returns a mutable reference to the account with the given id.
    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    /// Looks an account up by exact (case-sensitive) email.
    #[must_use]
    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.email == email)
    }

    /// Returns the plan with the given id.
    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// Returns a mutable reference to the purchase request with the given id.
    pub fn purchase_mut(&mut self, id: PurchaseId) -> Option<&mut PurchaseRequest> {
        self.purchases.iter_mut().find(|p| p.id == id)
    }

    /// Removes every session belonging to `account_id`, returning their tokens.
    pub fn revoke_sessions_of(&mut self, account_id: AccountId) -> Vec<SessionToken> {
        let revoked: Vec<SessionToken> = self
            .sessions
            .values()
            .filter(|s| s.account_id() == Some(account_id))
            .map(|s| s.token.clone())
            .collect();
        for token in &revoked {
            self.sessions.remove(token);
        }
        revoked
    }

    fn snapshot(&self, slot: Slot) -> Result<serde_json::Value, StorefrontError> {
        match slot {
            Slot::Accounts => encode(&self.accounts),
            Slot::Plans => encode(&self.plans),
            Slot::Purchases => encode(&self.purchases),
            Slot::Sessions => {
                let mut sessions: Vec<&Session> = self.sessions.values().collect();
                sessions.sort_by_key(|s| s.created_at);
                encode(&sessions)
            }
        }
    }

    fn restore(&mut self, slot: Slot, snapshot: serde_json::Value) -> Result<(), StorefrontError> {
        match slot {
            Slot::Accounts => self.accounts = decode(slot, snapshot)?,
            Slot::Plans => self.plans = decode(slot, snapshot)?,
            Slot::Purchases => self.purchases = decode(slot, snapshot)?,
            Slot::Sessions => {
                let sessions: Vec<Session> = decode(slot, snapshot)?;
                self.sessions = sessions
                    .into_iter()
                    .map(|s| (s.token.clone(), s))
                    .collect();
            }
        }
        Ok(())
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, StorefrontError> {
    serde_json::to_value(value).map_err(|e| StorefrontError::PersistenceError(e.to_string()))
}

fn decode<T: DeserializeOwned>(
    slot: Slot,
    snapshot: serde_json::Value,
) -> Result<T, StorefrontError> {
    serde_json::from_value(snapshot)
        .map_err(|e| StorefrontError::PersistenceError(format!("slot {slot}: {e}")))
}

/// Shared, persisted storefront state.
#[derive(Debug)]
pub struct Store {
    state: RwLock<StoreState>,
    backend: Arc<dyn SnapshotBackend>,
}

impl Store {
    /// Rehydrates every slot from `backend`.
    ///
    /// A missing plans slot is seeded with the default catalog and written
    /// back immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PersistenceError`] if a slot cannot be
    /// loaded or decoded, or the seeded catalog cannot be written.
    pub async fn open(backend: Arc<dyn SnapshotBackend>) -> Result<Self, StorefrontError> {
        let mut state = StoreState::default();
        let mut seed_plans = false;
        for slot in Slot::ALL {
            match backend.load(slot).await? {
                Some(snapshot) => state.restore(slot, snapshot)?,
                None if slot == Slot::Plans => seed_plans = true,
                None => {}
            }
        }
        if seed_plans {
            state.plans = default_plans();
            backend
                .save(Slot::Plans, &state.snapshot(Slot::Plans)?)
                .await?;
            tracing::info!(plans = state.plans.len(), "seeded default plan catalog");
        }
        tracing::info!(
            accounts = state.accounts.len(),
            plans = state.plans.len(),
            purchases = state.purchases.len(),
            sessions = state.sessions.len(),
            "store rehydrated"
        );
        Ok(Self {
            state: RwLock::new(state),
            backend,
        })
    }

    /// Runs `f` against a shared view of the state.
    pub async fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Applies `f` under the write lock and persists `slots`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`StorefrontError::PersistenceError`]
    /// if a snapshot write fails. Either way the in-memory state is left
    /// exactly as it was before the call.
    pub async fn mutate<T>(
        &self,
        slots: &[Slot],
        f: impl FnOnce(&mut StoreState) -> Result<T, StorefrontError>,
    ) -> Result<T, StorefrontError> {
        let mut state = self.state.write().await;
        let before = state.clone();
        let value = match f(&mut state) {
            Ok(value) => value,
            Err(e) => {
                *state = before;
                return Err(e);
            }
        };

        let mut written: Vec<Slot> = Vec::with_capacity(slots.len());
        for &slot in slots {
            let saved = match state.snapshot(slot) {
                Ok(snapshot) => self.backend.save(slot, &snapshot).await,
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                tracing::error!(%slot, error = %e, "snapshot write failed, rolling back");
                *state = before;
                self.rewrite(&state, &written).await;
                return Err(e);
            }
            written.push(slot);
        }
        Ok(value)
    }

    /// Best-effort restore of slots already written by a failed mutation.
    async fn rewrite(&self, state: &StoreState, slots: &[Slot]) {
        for &slot in slots {
            let restored = match state.snapshot(slot) {
                Ok(snapshot) => self.backend.save(slot, &snapshot).await,
                Err(e) => Err(e),
            };
            if let Err(e) = restored {
                tracing::error!(%slot, error = %e, "could not restore slot after rollback");
            }
        }
    }

    /// Returns a copy of the account with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::AccountNotFound`] if it does not exist.
    pub async fn account(&self, id: AccountId) -> Result<Account, StorefrontError> {
        self.read(|s| s.account(id).cloned())
            .await
            .ok_or(StorefrontError::AccountNotFound(*id.as_uuid()))
    }

    /// Returns all accounts in creation order.
    pub async fn accounts(&self) -> Vec<Account> {
        self.read(|s| s.accounts.clone()).await
    }

    /// Returns the plan catalog.
    pub async fn plans(&self) -> Vec<Plan> {
        self.read(|s| s.plans.clone()).await
    }

    /// Returns a copy of the plan with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PlanNotFound`] if it does not exist.
    pub async fn plan(&self, id: PlanId) -> Result<Plan, StorefrontError> {
        self.read(|s| s.plan(id).cloned())
            .await
            .ok_or(StorefrontError::PlanNotFound(*id.as_uuid()))
    }

    /// Returns all purchase requests, oldest first.
    pub async fn purchases(&self) -> Vec<PurchaseRequest> {
        self.read(|s| s.purchases.clone()).await
    }

    /// Returns the session for `token`, if open.
    pub async fn session(&self, token: &SessionToken) -> Option<Session> {
        self.read(|s| s.sessions.get(token).cloned()).await
    }

    /// Persists a new session.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PersistenceError`] if the snapshot write
    /// fails.
    pub async fn insert_session(&self, session: Session) -> Result<(), StorefrontError> {
        self.mutate(&[Slot::Sessions], |s| {
            s.sessions.insert(session.token.clone(), session);
            Ok(())
        })
        .await
    }

    /// Removes a session, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PersistenceError`] if the snapshot write
    /// fails.
    pub async fn remove_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Session>, StorefrontError> {
        self.mutate(&[Slot::Sessions], |s| Ok(s.sessions.remove(token)))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::SecretHash;
    use crate::persistence::MemoryBackend;

    /// Memory backend whose writes can be made to fail.
    #[derive(Debug, Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SnapshotBackend for FlakyBackend {
        async fn load(&self, slot: Slot) -> Result<Option<serde_json::Value>, StorefrontError> {
            self.inner.load(slot).await
        }

        async fn save(
            &self,
            slot: Slot,
            snapshot: &serde_json::Value,
        ) -> Result<(), StorefrontError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorefrontError::PersistenceError("disk full".to_string()));
            }
            self.inner.save(slot, snapshot).await
        }
    }

    fn shared<B: SnapshotBackend + 'static>(backend: &Arc<B>) -> Arc<dyn SnapshotBackend> {
        let cloned: Arc<B> = Arc::clone(backend);
        cloned
    }

    fn account(email: &str) -> Account {
        Account::new(
            "Ada".to_string(),
            email.to_string(),
            SecretHash::from_hash("$2b$04$placeholder".to_string()),
            50,
        )
    }

    #[tokio::test]
    async fn open_seeds_default_plans() {
        let backend = Arc::new(MemoryBackend::new());
        let Ok(store) = Store::open(shared(&backend)).await else {
            panic!("open should succeed");
        };
        let plans = store.plans().await;
        assert_eq!(plans.len(), 2);
        let Ok(Some(saved)) = backend.load(Slot::Plans).await else {
            panic!("seeded plans should be persisted");
        };
        assert_eq!(saved.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn open_keeps_empty_persisted_catalog() {
        let backend = Arc::new(MemoryBackend::new());
        tokio_test::assert_ok!(backend.save(Slot::Plans, &serde_json::json!([])).await);
        let Ok(store) = Store::open(backend).await else {
            panic!("open should succeed");
        };
        assert!(store.plans().await.is_empty());
    }

    #[tokio::test]
    async fn reopen_restores_all_slots() {
        let backend = Arc::new(MemoryBackend::new());
        let Ok(store) = Store::open(shared(&backend)).await else {
            panic!("open should succeed");
        };
        let acct = account("ada@example.com");
        let id = acct.id;
        let session = Session::for_account(id);
        let token = session.token.clone();
        tokio_test::assert_ok!(
            store
                .mutate(&[Slot::Accounts], |s| {
                    s.accounts.push(acct);
                    Ok(())
                })
                .await
        );
        tokio_test::assert_ok!(store.insert_session(session).await);

        let Ok(reopened) = Store::open(backend).await else {
            panic!("reopen should succeed");
        };
        let Ok(restored) = reopened.account(id).await else {
            panic!("account should survive reopen");
        };
        assert_eq!(restored.email, "ada@example.com");
        assert!(reopened.session(&token).await.is_some());
        assert_eq!(reopened.plans().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_write_rolls_back_memory() {
        let backend = Arc::new(FlakyBackend::default());
        let Ok(store) = Store::open(shared(&backend)).await else {
            panic!("open should succeed");
        };
        backend.failing.store(true, Ordering::SeqCst);

        let result = store
            .mutate(&[Slot::Accounts], |s| {
                s.accounts.push(account("ada@example.com"));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StorefrontError::PersistenceError(_))));
        assert!(store.accounts().await.is_empty());
    }

    #[tokio::test]
    async fn closure_error_rolls_back_memory() {
        let Ok(store) = Store::open(Arc::new(MemoryBackend::new())).await else {
            panic!("open should succeed");
        };
        let result: Result<(), _> = store
            .mutate(&[Slot::Plans], |s| {
                s.plans.clear();
                Err(StorefrontError::InvalidRequest("nope".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.plans().await.len(), 2);
    }

    #[tokio::test]
    async fn revoke_sessions_only_touches_owner() {
        let mut state = StoreState::default();
        let owner = AccountId::new();
        let other = Session::for_account(AccountId::new());
        for session in [Session::for_account(owner), Session::for_account(owner), other.clone()] {
            state.sessions.insert(session.token.clone(), session);
        }
        let revoked = state.revoke_sessions_of(owner);
        assert_eq!(revoked.len(), 2);
        assert_eq!(state.sessions.len(), 1);
        assert!(state.sessions.contains_key(&other.token));
    }
}
