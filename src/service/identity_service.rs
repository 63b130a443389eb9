//! Identity service: signup, login, sessions and account moderation.

use std::sync::Arc;

use chrono::Utc;

use crate::config::{AdminCredential, StorefrontConfig};
use crate::domain::{
    Account, AccountId, EventBus, JobBoard, SecretHash, Session, SessionToken, Store,
    StorefrontEvent,
};
use crate::error::StorefrontError;
use crate::persistence::Slot;

/// Tunables for account creation and secret hashing.
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Credits granted to every new account.
    pub signup_bonus_credits: u64,
    /// Minimum secret length in characters.
    pub min_secret_len: usize,
    /// bcrypt cost factor.
    pub password_hash_cost: u32,
    /// Administrator credential; `None` disables admin login.
    pub admin: Option<AdminCredential>,
}

impl IdentitySettings {
    /// Extracts the identity settings from the service configuration.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            signup_bonus_credits: config.signup_bonus_credits,
            min_secret_len: config.min_secret_len,
            password_hash_cost: config.password_hash_cost,
            admin: config.admin.clone(),
        }
    }
}

/// Fields submitted on signup.
#[derive(Debug, Clone)]
pub struct Signup {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain secret; hashed before it is stored.
    pub secret: String,
}

/// Decides who a caller is and manages account lifecycle.
#[derive(Debug, Clone)]
pub struct IdentityService {
    store: Arc<Store>,
    jobs: Arc<JobBoard>,
    event_bus: EventBus,
    settings: IdentitySettings,
}

impl IdentityService {
    /// Creates a new `IdentityService`.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        jobs: Arc<JobBoard>,
        event_bus: EventBus,
        settings: IdentitySettings,
    ) -> Self {
        Self {
            store,
            jobs,
            event_bus,
            settings,
        }
    }

    /// Creates an account with the signup bonus and opens a session for it.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidRequest`] for a blank name, an email
    /// without `@` or a short secret, and [`StorefrontError::EmailTaken`] if
    /// the email is already registered (the account collection is left
    /// untouched).
    pub async fn signup(&self, signup: Signup) -> Result<(Account, Session), StorefrontError> {
        let name = signup.name.trim().to_string();
        let email = signup.email.trim().to_string();
        if name.is_empty() {
            return Err(StorefrontError::InvalidRequest("name must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(StorefrontError::InvalidRequest(
                "email must contain '@'".to_string(),
            ));
        }
        if signup.secret.chars().count() < self.settings.min_secret_len {
            return Err(StorefrontError::InvalidRequest(format!(
                "password must be at least {} characters",
                self.settings.min_secret_len
            )));
        }
        if self
            .store
            .read(|s| s.account_by_email(&email).is_some())
            .await
        {
            return Err(StorefrontError::EmailTaken(email));
        }

        let secret_hash = hash_secret(signup.secret, self.settings.password_hash_cost).await?;
        let account = Account::new(name, email, secret_hash, self.settings.signup_bonus_credits);
        let session = Session::for_account(account.id);

        let (account, session) = self
            .store
            .mutate(&[Slot::Accounts, Slot::Sessions], |s| {
                // Re-checked under the write lock; hashing ran unlocked.
                if s.account_by_email(&account.email).is_some() {
                    return Err(StorefrontError::EmailTaken(account.email.clone()));
                }
                s.accounts.push(account.clone());
                s.sessions.insert(session.token.clone(), session.clone());
                Ok((account, session))
            })
            .await?;

        let _ = self.event_bus.publish(StorefrontEvent::AccountCreated {
            account_id: account.id,
            credits: account.credits,
            timestamp: Utc::now(),
        });
        tracing::info!(account_id = %account.id, credits = account.credits, "account created");
        Ok((account, session))
    }

    /// Verifies credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidCredentials`] for an unknown email
    /// or wrong secret and [`StorefrontError::AccountBanned`] when correct
    /// credentials belong to a banned account.
    pub async fn login(&self, email: &str, secret: &str) -> Result<(Account, Session), StorefrontError> {
        let email = email.trim();
        let Some(account) = self.store.read(|s| s.account_by_email(email).cloned()).await else {
            return Err(StorefrontError::InvalidCredentials);
        };
        if !verify_secret(account.secret_hash.clone(), secret.to_string()).await? {
            tracing::debug!(account_id = %account.id, "login rejected: wrong secret");
            return Err(StorefrontError::InvalidCredentials);
        }
        if account.is_banned {
            tracing::info!(account_id = %account.id, "login rejected: account banned");
            return Err(StorefrontError::AccountBanned);
        }

        let session = Session::for_account(account.id);
        self.store.insert_session(session.clone()).await?;
        tracing::info!(account_id = %account.id, "account logged in");
        Ok((account, session))
    }

    /// Opens an administrator session.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidCredentials`] if the credentials do
    /// not match the configured administrator, or no administrator is
    /// configured.
    pub async fn admin_login(&self, email: &str, secret: &str) -> Result<Session, StorefrontError> {
        let Some(admin) = &self.settings.admin else {
            tracing::warn!("admin login attempted but no administrator is configured");
            return Err(StorefrontError::InvalidCredentials);
        };
        if email.trim() != admin.email {
            return Err(StorefrontError::InvalidCredentials);
        }
        let hash = SecretHash::from_hash(admin.password_hash.clone());
        if !verify_secret(hash, secret.to_string()).await? {
            return Err(StorefrontError::InvalidCredentials);
        }

        let session = Session::for_admin();
        self.store.insert_session(session.clone()).await?;
        tracing::info!("administrator logged in");
        Ok(session)
    }

    /// Ends a session, discards its generation history and closes any
    /// WebSocket opened with the token.
    ///
    /// Logging out an unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the sessions snapshot cannot be written.
    pub async fn logout(&self, token: &SessionToken) -> Result<(), StorefrontError> {
        let removed = self.store.remove_session(token).await?;
        let discarded = self.jobs.discard(token).await;
        if let Some(session) = removed {
            let account_id = session.account_id();
            let _ = self.event_bus.publish(StorefrontEvent::SessionClosed {
                token: session.token,
                account_id,
                timestamp: Utc::now(),
            });
            tracing::info!(jobs_discarded = discarded, "session closed");
        }
        Ok(())
    }

    /// Resolves a bearer token to its session.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthorized`] for unknown tokens and for
    /// sessions whose account was deleted, and
    /// [`StorefrontError::AccountBanned`] for banned accounts.
    pub async fn authenticate(&self, token: &SessionToken) -> Result<Session, StorefrontError> {
        self.store
            .read(|s| {
                let session = s.sessions.get(token).ok_or(StorefrontError::Unauthorized)?;
                if let Some(account_id) = session.account_id() {
                    let account = s.account(account_id).ok_or(StorefrontError::Unauthorized)?;
                    if account.is_banned {
                        return Err(StorefrontError::AccountBanned);
                    }
                }
                Ok(session.clone())
            })
            .await
    }

    /// Returns the account behind a customer session.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Forbidden`] for administrator sessions and
    /// [`StorefrontError::AccountNotFound`] if the account is gone.
    pub async fn account_of(&self, session: &Session) -> Result<Account, StorefrontError> {
        let account_id = session
            .account_id()
            .ok_or_else(|| StorefrontError::Forbidden("administrator has no account".to_string()))?;
        self.store.account(account_id).await
    }

    /// Returns every account in creation order.
    pub async fn list_accounts(&self) -> Vec<Account> {
        self.store.accounts().await
    }

    /// Flips an account's banned flag. Banning revokes its sessions.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::AccountNotFound`] for an unknown id.
    pub async fn toggle_ban(&self, account_id: AccountId) -> Result<Account, StorefrontError> {
        let (account, revoked) = self
            .store
            .mutate(&[Slot::Accounts, Slot::Sessions], |s| {
                let account = s
                    .account_mut(account_id)
                    .ok_or(StorefrontError::AccountNotFound(*account_id.as_uuid()))?;
                account.is_banned = !account.is_banned;
                let account = account.clone();
                let revoked = if account.is_banned {
                    s.revoke_sessions_of(account_id)
                } else {
                    Vec::new()
                };
                Ok((account, revoked))
            })
            .await?;
        for token in &revoked {
            self.jobs.discard(token).await;
        }

        let _ = self.event_bus.publish(StorefrontEvent::AccountBanChanged {
            account_id,
            banned: account.is_banned,
            timestamp: Utc::now(),
        });
        tracing::info!(%account_id, banned = account.is_banned, sessions_revoked = revoked.len(), "ban toggled");
        Ok(account)
    }

    /// Deletes an account and revokes its sessions.
    ///
    /// Purchase requests keep the copied account name.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::AccountNotFound`] for an unknown id.
    pub async fn delete_account(&self, account_id: AccountId) -> Result<(), StorefrontError> {
        let revoked = self
            .store
            .mutate(&[Slot::Accounts, Slot::Sessions], |s| {
                let before = s.accounts.len();
                s.accounts.retain(|a| a.id != account_id);
                if s.accounts.len() == before {
                    return Err(StorefrontError::AccountNotFound(*account_id.as_uuid()));
                }
                Ok(s.revoke_sessions_of(account_id))
            })
            .await?;
        for token in &revoked {
            self.jobs.discard(token).await;
        }

        let _ = self.event_bus.publish(StorefrontEvent::AccountDeleted {
            account_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%account_id, sessions_revoked = revoked.len(), "account deleted");
        Ok(())
    }
}

async fn hash_secret(secret: String, cost: u32) -> Result<SecretHash, StorefrontError> {
    tokio::task::spawn_blocking(move || SecretHash::hash(&secret, cost))
        .await
        .map_err(|e| StorefrontError::Internal(format!("hashing task failed: {e}")))?
}

async fn verify_secret(hash: SecretHash, secret: String) -> Result<bool, StorefrontError> {
    tokio::task::spawn_blocking(move || hash.verify(&secret))
        .await
        .map_err(|e| StorefrontError::Internal(format!("verification task failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;

    const ADMIN_EMAIL: &str = "admin@stockpic.test";

    async fn service() -> IdentityService {
        let Ok(store) = Store::open(Arc::new(MemoryBackend::new())).await else {
            panic!("store should open");
        };
        let Ok(admin_hash) = bcrypt::hash("root-secret", 4) else {
            panic!("cost 4 is valid");
        };
        IdentityService::new(
            Arc::new(store),
            Arc::new(JobBoard::new()),
            EventBus::new(64),
            IdentitySettings {
                signup_bonus_credits: 50,
                min_secret_len: 6,
                password_hash_cost: 4,
                admin: Some(AdminCredential {
                    email: ADMIN_EMAIL.to_string(),
                    password_hash: admin_hash,
                }),
            },
        )
    }

    fn signup(email: &str) -> Signup {
        Signup {
            name: "Ada".to_string(),
            email: email.to_string(),
            secret: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn signup_grants_bonus_and_session() {
        let svc = service().await;
        let Ok((account, session)) = svc.signup(signup("ada@example.com")).await else {
            panic!("signup should succeed");
        };
        assert_eq!(account.credits, 50);
        assert!(!account.is_banned && !account.is_subscribed);
        let Ok(resolved) = svc.authenticate(&session.token).await else {
            panic!("fresh session should authenticate");
        };
        assert_eq!(resolved.account_id(), Some(account.id));
    }

    #[tokio::test]
    async fn duplicate_email_leaves_accounts_untouched() {
        let svc = service().await;
        tokio_test::assert_ok!(svc.signup(signup("ada@example.com")).await);
        let result = svc.signup(signup("ada@example.com")).await;
        assert!(matches!(result, Err(StorefrontError::EmailTaken(_))));
        assert_eq!(svc.list_accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_sensitive() {
        let svc = service().await;
        tokio_test::assert_ok!(svc.signup(signup("ada@example.com")).await);
        tokio_test::assert_ok!(svc.signup(signup("Ada@example.com")).await);
        assert_eq!(svc.list_accounts().await.len(), 2);
    }

    #[tokio::test]
    async fn signup_validates_fields() {
        let svc = service().await;
        let mut blank = signup("ada@example.com");
        blank.name = "   ".to_string();
        let mut short = signup("ada@example.com");
        short.secret = "abc".to_string();
        for bad in [blank, short, signup("not-an-email")] {
            assert!(matches!(svc.signup(bad).await, Err(StorefrontError::InvalidRequest(_))));
        }
        assert!(svc.list_accounts().await.is_empty());
    }

    #[tokio::test]
    async fn login_rejects_wrong_secret_and_unknown_email() {
        let svc = service().await;
        tokio_test::assert_ok!(svc.signup(signup("ada@example.com")).await);
        assert!(matches!(
            svc.login("ada@example.com", "wrong-one").await,
            Err(StorefrontError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.login("bob@example.com", "hunter22").await,
            Err(StorefrontError::InvalidCredentials)
        ));
        tokio_test::assert_ok!(svc.login("ada@example.com", "hunter22").await);
    }

    #[tokio::test]
    async fn banned_account_cannot_log_in_and_loses_sessions() {
        let svc = service().await;
        let Ok((account, session)) = svc.signup(signup("ada@example.com")).await else {
            panic!("signup should succeed");
        };
        let Ok(banned) = svc.toggle_ban(account.id).await else {
            panic!("ban should succeed");
        };
        assert!(banned.is_banned);
        assert!(matches!(
            svc.login("ada@example.com", "hunter22").await,
            Err(StorefrontError::AccountBanned)
        ));
        assert!(matches!(
            svc.login("ada@example.com", "wrong-one").await,
            Err(StorefrontError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.authenticate(&session.token).await,
            Err(StorefrontError::Unauthorized)
        ));

        let Ok(unbanned) = svc.toggle_ban(account.id).await else {
            panic!("unban should succeed");
        };
        assert!(!unbanned.is_banned);
        tokio_test::assert_ok!(svc.login("ada@example.com", "hunter22").await);
    }

    #[tokio::test]
    async fn deleted_account_sessions_are_rejected() {
        let svc = service().await;
        let Ok((account, session)) = svc.signup(signup("ada@example.com")).await else {
            panic!("signup should succeed");
        };
        tokio_test::assert_ok!(svc.delete_account(account.id).await);
        assert!(svc.authenticate(&session.token).await.is_err());
        assert!(matches!(
            svc.delete_account(account.id).await,
            Err(StorefrontError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let svc = service().await;
        let Ok((_, session)) = svc.signup(signup("ada@example.com")).await else {
            panic!("signup should succeed");
        };
        tokio_test::assert_ok!(svc.logout(&session.token).await);
        assert!(matches!(
            svc.authenticate(&session.token).await,
            Err(StorefrontError::Unauthorized)
        ));
        tokio_test::assert_ok!(svc.logout(&session.token).await);
    }

    #[tokio::test]
    async fn logout_announces_the_closed_session() {
        let svc = service().await;
        let Ok((account, session)) = svc.signup(signup("ada@example.com")).await else {
            panic!("signup should succeed");
        };
        let mut rx = svc.event_bus.subscribe();
        tokio_test::assert_ok!(svc.logout(&session.token).await);
        let Ok(StorefrontEvent::SessionClosed { token, account_id, .. }) = rx.try_recv() else {
            panic!("logout should publish session_closed");
        };
        assert_eq!(token, session.token);
        assert_eq!(account_id, Some(account.id));

        tokio_test::assert_ok!(svc.logout(&session.token).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn admin_login_checks_configured_credential() {
        let svc = service().await;
        let Ok(session) = svc.admin_login(ADMIN_EMAIL, "root-secret").await else {
            panic!("admin login should succeed");
        };
        assert!(session.is_admin());
        assert!(matches!(
            svc.admin_login(ADMIN_EMAIL, "guess").await,
            Err(StorefrontError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.account_of(&session).await,
            Err(StorefrontError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn admin_login_disabled_without_credential() {
        let mut svc = service().await;
        svc.settings.admin = None;
        assert!(matches!(
            svc.admin_login(ADMIN_EMAIL, "root-secret").await,
            Err(StorefrontError::InvalidCredentials)
        ));
    }
}
