//! Email confirmation workflow: token lifecycle plus the authentication gate.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

use crate::account::AccountSecurity;
use crate::clock::Clock;
use crate::config::SecurityConfig;
use crate::error::AuthError;
use crate::token::SecurityToken;
use crate::transport::{Notification, Transport};
use crate::workflows::Gate;

pub struct ConfirmationWorkflow {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
}

impl ConfirmationWorkflow {
    #[must_use]
    pub fn new(config: &SecurityConfig, clock: Arc<dyn Clock>, transport: Arc<dyn Transport>) -> Self {
        Self {
            ttl: config.confirmation_ttl(),
            clock,
            transport,
        }
    }

    /// Issue a fresh confirmation token bound to the account email.
    ///
    /// Re-issuing always resets confirmation: any previous `confirmed_at`
    /// is cleared so the account must confirm again.
    pub fn generate_token(&self, account: &mut AccountSecurity) {
        let expires_at = self.clock.now() + self.ttl;
        account.confirmation.token = Some(SecurityToken::issue(&account.email, expires_at));
        account.confirmation.confirmed_at = None;
        debug!(account_id = %account.id, %expires_at, "issued confirmation token");
    }

    /// Send the confirmation notification and stamp `sent_at`.
    ///
    /// No-op when the account is already confirmed.
    pub async fn send(&self, account: &mut AccountSecurity, resend: bool) -> Result<(), AuthError> {
        if account.confirmed() {
            return Ok(());
        }
        let notification = if resend {
            Notification::RegistrationConfirmationResend
        } else {
            Notification::RegistrationConfirmation
        };
        self.transport.send(notification, account).await?;
        let now = self.clock.now();
        if let Some(token) = account.confirmation.token.as_mut() {
            token.mark_sent(now);
        }
        Ok(())
    }

    /// Authentication gate.
    ///
    /// Confirmed accounts pass. Unconfirmed accounts with a live token are
    /// blocked; the mail is already out, so nothing is re-sent. Unconfirmed
    /// accounts whose token expired (or was never issued) get a fresh token
    /// issued and sent before being blocked.
    pub async fn check(&self, account: &mut AccountSecurity) -> Result<Gate, AuthError> {
        if account.confirmed() {
            return Ok(Gate::Pass);
        }
        let now = self.clock.now();
        let token_live = account
            .confirmation
            .token
            .as_ref()
            .is_some_and(|token| !token.expired(now));
        if token_live {
            return Ok(Gate::Blocked {
                error: AuthError::AccountNotConfirmed,
                resent: false,
            });
        }

        self.generate_token(account);
        self.send(account, true).await?;
        Ok(Gate::Blocked {
            error: AuthError::ConfirmationTokenExpired,
            resent: true,
        })
    }

    /// Consume a confirmation token presented by the account owner.
    ///
    /// The caller has already located the account by the opaque token
    /// string; this verifies expiry and binding, then marks the account
    /// confirmed. The token itself stays in place, so a second presentation
    /// re-verifies instead of failing.
    pub fn apply_confirm(
        &self,
        account: &mut AccountSecurity,
        candidate: &str,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let Some(token) = account.confirmation.token.as_ref() else {
            return Err(AuthError::TokenInvalid);
        };
        if token.expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if !token.matches(&account.email, candidate) {
            return Err(AuthError::TokenInvalid);
        }
        account.confirmation.confirmed_at = Some(now);
        info!(account_id = %account.id, "account confirmed");
        Ok(())
    }
}
