//! The authentication orchestrator tying the workflows together.
//!
//! Flow overview for `authenticate`:
//! 1) Validate credential shape; failures collapse into the generic
//!    `IncorrectCredentials` so nothing leaks about which check failed.
//! 2) Look up by normalized email; unknown emails get the same generic
//!    error.
//! 3) Confirmation gate, then lock gate. Both run before the password
//!    compare: a correct password on an unconfirmed or locked account
//!    still yields the gate error.
//! 4) Password compare. A mismatch bumps the failure counter; the request
//!    that crosses the lock threshold surfaces the lock message, not a
//!    password mismatch.
//! 5) A match resets the counter and returns the account. Tracking is a
//!    separate explicit step after login.
//!
//! All collaborators are injected (repository, transport, clock, hasher);
//! the engine persists after every state-changing step but provides no
//! transactional atomicity across generate → persist → send. Mutations for
//! the same account are serialized on a per-email async mutex.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

use crate::account::AccountSecurity;
use crate::clock::{Clock, SystemClock};
use crate::config::SecurityConfig;
use crate::error::AuthError;
use crate::password::{BcryptHasher, PasswordHasher};
use crate::repository::Repository;
use crate::transport::{LogTransport, Transport};
use crate::utils::{normalize_email, valid_email};
use crate::workflows::confirmation::ConfirmationWorkflow;
use crate::workflows::lockout::LockoutWorkflow;
use crate::workflows::recovery::RecoveryWorkflow;
use crate::workflows::remember::RememberWorkflow;
use crate::workflows::tracking::TrackingWorkflow;
use crate::workflows::Gate;

/// Login input as presented by the caller.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
        }
    }
}

/// Per-email async mutexes serializing mutations against the same account.
#[derive(Default)]
struct AccountLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    async fn acquire(&self, email: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.inner.lock().await;
            // A slot referenced only by the map has no holder or waiter
            // left; pruning here keeps the map bounded by live traffic.
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            locks
                .entry(email.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

/// Facade over the account security workflows.
pub struct AccountSecurityEngine {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    hasher: Arc<dyn PasswordHasher>,
    confirmation: ConfirmationWorkflow,
    lockout: LockoutWorkflow,
    recovery: RecoveryWorkflow,
    remember: RememberWorkflow,
    tracking: TrackingWorkflow,
    locks: AccountLocks,
}

impl AccountSecurityEngine {
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn PasswordHasher>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            repository,
            clock: clock.clone(),
            hasher,
            confirmation: ConfirmationWorkflow::new(&config, clock.clone(), transport.clone()),
            lockout: LockoutWorkflow::new(&config, clock.clone(), transport.clone()),
            recovery: RecoveryWorkflow::new(&config, clock.clone(), transport),
            remember: RememberWorkflow::new(clock.clone()),
            tracking: TrackingWorkflow::new(clock),
            locks: AccountLocks::default(),
        }
    }

    /// Engine with the system clock, bcrypt hashing, the logging transport,
    /// and default policy. Intended for local development.
    #[must_use]
    pub fn with_defaults(repository: Arc<dyn Repository>) -> Self {
        Self::new(
            repository,
            Arc::new(LogTransport),
            Arc::new(SystemClock),
            Arc::new(BcryptHasher::new()),
            SecurityConfig::new(),
        )
    }

    /// Create an account and start the confirmation token lifecycle.
    ///
    /// The sequence is generate → persist → send → persist; a transport
    /// failure after the first persist leaves a valid token whose
    /// `sent_at` is unset.
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email address".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(AuthError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        let _guard = self.locks.acquire(&email).await;
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(AuthError::InvalidInput(
                "email already registered".to_string(),
            ));
        }

        let mut account = AccountSecurity::new(email);
        account.password_hash = Some(self.hasher.hash(password).await?);
        self.confirmation.generate_token(&mut account);
        self.repository.save(&account).await?;
        self.confirmation.send(&mut account, false).await?;
        self.repository.save(&account).await?;
        info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// The authentication pipeline. See the module docs for the ordering.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(&credentials.email);
        if !valid_email(&email) || credentials.password.expose_secret().is_empty() {
            return Err(AuthError::IncorrectCredentials);
        }

        let _guard = self.locks.acquire(&email).await;
        let Some(mut account) = self.repository.find_by_email(&email).await? else {
            return Err(AuthError::IncorrectCredentials);
        };
        if account.unregistered() {
            return Err(AuthError::IncorrectCredentials);
        }

        if let Gate::Blocked { error, resent } = self.confirmation.check(&mut account).await? {
            if resent {
                self.repository.save(&account).await?;
            }
            return Err(error);
        }
        if let Gate::Blocked { error, resent } = self.lockout.check(&mut account).await? {
            if resent {
                self.repository.save(&account).await?;
            }
            return Err(error);
        }

        let hash = account.password_hash.clone().unwrap_or_default();
        let matched = self.hasher.verify(&credentials.password, &hash).await?;
        if !matched {
            let locked_now = self.lockout.record_failure(&mut account).await?;
            self.repository.save(&account).await?;
            if locked_now {
                return Err(AuthError::AccountLocked { resent: true });
            }
            return Err(AuthError::IncorrectCredentials);
        }

        self.lockout.record_success(&mut account);
        self.repository.save(&account).await?;
        info!(account_id = %account.id, "authentication succeeded");
        Ok(account)
    }

    /// Redeem a confirmation token delivered out-of-band.
    pub async fn confirm(&self, token: &str) -> Result<AccountSecurity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        let Some(found) = self.repository.find_by_confirmation_token(token).await? else {
            return Err(AuthError::TokenInvalid);
        };
        let _guard = self.locks.acquire(&found.email).await;
        let mut account = self.refresh(found).await?;

        self.confirmation.apply_confirm(&mut account, token)?;
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// Administratively lock an account: stamp the lock, issue an unlock
    /// token, and send the unlock notification. The owner redeems the
    /// token through [`unlock`](Self::unlock) as with a threshold lock.
    pub async fn lock(&self, email: &str) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        let _guard = self.locks.acquire(&email).await;
        let mut account = self.lookup_live(&email).await?;

        self.lockout.lock(&mut account, false).await?;
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// Redeem an unlock token delivered out-of-band.
    pub async fn unlock(&self, token: &str) -> Result<AccountSecurity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        let Some(found) = self.repository.find_by_unlock_token(token).await? else {
            return Err(AuthError::TokenInvalid);
        };
        let _guard = self.locks.acquire(&found.email).await;
        let mut account = self.refresh(found).await?;

        self.lockout.apply_unlock(&mut account, token)?;
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// "Forgot password": issue a recovery token and send the recovery
    /// notification. A repeat request sends the resend variant.
    pub async fn forgot_password(&self, email: &str) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email address".to_string()));
        }

        let _guard = self.locks.acquire(&email).await;
        let Some(mut account) = self.repository.find_by_email(&email).await? else {
            return Err(AuthError::AccountNotFound);
        };
        if account.unregistered() {
            return Err(AuthError::AccountNotFound);
        }

        let resend = account.recovery.token.is_some();
        self.recovery.generate_token(&mut account);
        self.repository.save(&account).await?;
        self.recovery.send(&mut account, resend).await?;
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// Redeem a recovery token and set a new password.
    pub async fn recover(
        &self,
        token: &str,
        new_password: &SecretString,
    ) -> Result<AccountSecurity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        let Some(found) = self.repository.find_by_recovery_token(token).await? else {
            return Err(AuthError::TokenInvalid);
        };
        let _guard = self.locks.acquire(&found.email).await;
        let mut account = self.refresh(found).await?;

        self.recovery
            .apply_recovery(&mut account, token, new_password, self.hasher.as_ref())
            .await?;
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// Issue a remember-me token for an already-authenticated account and
    /// return the opaque cookie value.
    pub async fn issue_remember_token(&self, email: &str) -> Result<String, AuthError> {
        let email = normalize_email(email);
        let _guard = self.locks.acquire(&email).await;
        let mut account = self.lookup_live(&email).await?;

        let value = self.remember.issue(&mut account);
        self.repository.save(&account).await?;
        Ok(value)
    }

    /// Re-establish identity from a remember-me cookie value.
    ///
    /// No rotation happens on use; the stored token remains valid.
    pub async fn consume_remember_token(&self, token: &str) -> Result<AccountSecurity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        let Some(account) = self.repository.find_by_remember_token(token).await? else {
            return Err(AuthError::TokenInvalid);
        };
        if account.unregistered() {
            return Err(AuthError::TokenInvalid);
        }
        self.remember.verify(&account, token)?;
        Ok(account)
    }

    /// Stamp a sign-in after a successful authenticate + login.
    pub async fn track(
        &self,
        email: &str,
        ip_address: Option<&str>,
    ) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        let _guard = self.locks.acquire(&email).await;
        let mut account = self.lookup_live(&email).await?;

        self.tracking.track(&mut account, ip_address);
        self.repository.save(&account).await?;
        Ok(account)
    }

    /// Rotate the password for an already-authenticated account.
    ///
    /// Verifies the current password first but carries no lockout side
    /// effect and runs outside the confirmation/lock gates: the caller has
    /// a live session and is merely re-proving possession.
    pub async fn change_password(
        &self,
        email: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        let _guard = self.locks.acquire(&email).await;
        let mut account = self.lookup_live(&email).await?;

        let hash = account.password_hash.clone().unwrap_or_default();
        if !self.hasher.verify(current_password, &hash).await? {
            return Err(AuthError::PasswordMismatch);
        }
        if new_password.expose_secret().is_empty() {
            return Err(AuthError::InvalidInput(
                "new password must not be empty".to_string(),
            ));
        }
        account.password_hash = Some(self.hasher.hash(new_password).await?);
        self.repository.save(&account).await?;
        info!(account_id = %account.id, "password changed");
        Ok(account)
    }

    /// Soft-delete: stamp `unregistered_at` so the account stops
    /// authenticating. Requires the current password, like
    /// `change_password`, and is equally ungated.
    pub async fn unregister(
        &self,
        email: &str,
        current_password: &SecretString,
    ) -> Result<AccountSecurity, AuthError> {
        let email = normalize_email(email);
        let _guard = self.locks.acquire(&email).await;
        let mut account = self.lookup_live(&email).await?;

        let hash = account.password_hash.clone().unwrap_or_default();
        if !self.hasher.verify(current_password, &hash).await? {
            return Err(AuthError::PasswordMismatch);
        }
        account.unregistered_at = Some(self.clock.now());
        self.repository.save(&account).await?;
        info!(account_id = %account.id, "account unregistered");
        Ok(account)
    }

    /// Re-read the freshest copy after taking the per-account lock; the
    /// pre-lock lookup may be stale under concurrent mutation.
    async fn refresh(&self, found: AccountSecurity) -> Result<AccountSecurity, AuthError> {
        match self.repository.find_by_email(&found.email).await {
            Ok(Some(fresh)) => Ok(fresh),
            Ok(None) => Ok(found),
            Err(err) => {
                error!("Failed to refresh account record: {err}");
                Err(err.into())
            }
        }
    }

    async fn lookup_live(&self, email: &str) -> Result<AccountSecurity, AuthError> {
        let Some(account) = self.repository.find_by_email(email).await? else {
            return Err(AuthError::AccountNotFound);
        };
        if account.unregistered() {
            return Err(AuthError::AccountNotFound);
        }
        Ok(account)
    }
}
