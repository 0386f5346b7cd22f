//! Brute-force lockout workflow.
//!
//! Flow overview:
//! 1) Every failed password compare bumps the counter.
//! 2) Crossing the threshold locks the account, issues an unlock token,
//!    and sends the unlock notification as one composed step.
//! 3) `check` gates authentication while locked, re-sending a fresh unlock
//!    token if the previous one expired.
//! 4) Redeeming a valid unlock token clears the lock and the counter.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::account::AccountSecurity;
use crate::clock::Clock;
use crate::config::SecurityConfig;
use crate::error::AuthError;
use crate::token::SecurityToken;
use crate::transport::{Notification, Transport};
use crate::workflows::Gate;

pub struct LockoutWorkflow {
    ttl: Duration,
    max_failed_attempts: u32,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
}

impl LockoutWorkflow {
    #[must_use]
    pub fn new(config: &SecurityConfig, clock: Arc<dyn Clock>, transport: Arc<dyn Transport>) -> Self {
        Self {
            ttl: config.unlock_ttl(),
            max_failed_attempts: config.max_failed_attempts(),
            clock,
            transport,
        }
    }

    /// Record one failed password attempt.
    ///
    /// Returns `true` when this attempt crossed the threshold and locked
    /// the account. The caller must surface the lock message for that
    /// request, not a generic password mismatch.
    pub async fn record_failure(&self, account: &mut AccountSecurity) -> Result<bool, AuthError> {
        account.lock.failed_attempts = account.lock.failed_attempts.saturating_add(1);
        debug!(
            account_id = %account.id,
            failed_attempts = account.lock.failed_attempts,
            "failed authentication attempt"
        );
        if account.lock.failed_attempts >= self.max_failed_attempts && !account.locked() {
            self.lock(account, false).await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Reset the failure counter after a successful password compare.
    pub fn record_success(&self, account: &mut AccountSecurity) {
        account.lock.failed_attempts = 0;
    }

    /// Lock the account: stamp `locked_at`, issue an unlock token bound to
    /// the account email, and send the unlock notification.
    pub async fn lock(&self, account: &mut AccountSecurity, resend: bool) -> Result<(), AuthError> {
        account.lock.locked_at = Some(self.clock.now());
        self.issue_unlock_token(account, resend).await?;
        warn!(account_id = %account.id, "account locked");
        Ok(())
    }

    /// Issue a fresh unlock token and send the notification. `locked_at`
    /// is untouched so the original lock instant stays auditable.
    async fn issue_unlock_token(
        &self,
        account: &mut AccountSecurity,
        resend: bool,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        // Token goes on the account before the send so the transport can
        // build the unlock link from it.
        account.lock.unlock_token = Some(SecurityToken::issue(&account.email, now + self.ttl));
        let notification = if resend {
            Notification::UnlockConfirmationResend
        } else {
            Notification::UnlockConfirmation
        };
        self.transport.send(notification, account).await?;
        let sent_at = self.clock.now();
        if let Some(token) = account.lock.unlock_token.as_mut() {
            token.mark_sent(sent_at);
        }
        Ok(())
    }

    /// Authentication gate.
    ///
    /// Unlocked accounts pass. Locked accounts are blocked; if the unlock
    /// token lapsed (or is missing), a fresh one is issued and sent first.
    pub async fn check(&self, account: &mut AccountSecurity) -> Result<Gate, AuthError> {
        if !account.locked() {
            return Ok(Gate::Pass);
        }
        let now = self.clock.now();
        let token_live = account
            .lock
            .unlock_token
            .as_ref()
            .is_some_and(|token| !token.expired(now));
        if token_live {
            return Ok(Gate::Blocked {
                error: AuthError::AccountLocked { resent: false },
                resent: false,
            });
        }

        self.issue_unlock_token(account, true).await?;
        Ok(Gate::Blocked {
            error: AuthError::AccountLocked { resent: true },
            resent: true,
        })
    }

    /// Redeem an unlock token presented by the account owner.
    ///
    /// The caller has already located the account by the opaque token
    /// string; this verifies expiry and binding, then clears the lock and
    /// the failure counter.
    pub fn apply_unlock(
        &self,
        account: &mut AccountSecurity,
        candidate: &str,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let Some(token) = account.lock.unlock_token.as_ref() else {
            return Err(AuthError::TokenInvalid);
        };
        if token.expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if !token.matches(&account.email, candidate) {
            return Err(AuthError::TokenInvalid);
        }
        account.lock.unlocked_at = Some(now);
        account.lock.locked_at = None;
        account.lock.failed_attempts = 0;
        info!(account_id = %account.id, "account unlocked");
        Ok(())
    }
}
