//! Password recovery ("forgot password") workflow.
//!
//! Mirrors the confirmation token lifecycle but plays no gate role: it is
//! opt-in, and redeeming a valid token replaces the password without
//! knowledge of the old one.

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

use crate::account::AccountSecurity;
use crate::clock::Clock;
use crate::config::SecurityConfig;
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::token::SecurityToken;
use crate::transport::{Notification, Transport};

pub struct RecoveryWorkflow {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
}

impl RecoveryWorkflow {
    #[must_use]
    pub fn new(config: &SecurityConfig, clock: Arc<dyn Clock>, transport: Arc<dyn Transport>) -> Self {
        Self {
            ttl: config.recovery_ttl(),
            clock,
            transport,
        }
    }

    /// Issue a fresh recovery token, clearing any previous `recovered_at`.
    pub fn generate_token(&self, account: &mut AccountSecurity) {
        let expires_at = self.clock.now() + self.ttl;
        account.recovery.token = Some(SecurityToken::issue(&account.email, expires_at));
        account.recovery.recovered_at = None;
        debug!(account_id = %account.id, %expires_at, "issued recovery token");
    }

    /// Send the recovery notification and stamp `sent_at`.
    pub async fn send(&self, account: &mut AccountSecurity, resend: bool) -> Result<(), AuthError> {
        let notification = if resend {
            Notification::PasswordRecoveryConfirmationResend
        } else {
            Notification::PasswordRecoveryConfirmation
        };
        self.transport.send(notification, account).await?;
        let now = self.clock.now();
        if let Some(token) = account.recovery.token.as_mut() {
            token.mark_sent(now);
        }
        Ok(())
    }

    /// Redeem a recovery token and rotate the password.
    ///
    /// The caller has already located the account by the opaque token
    /// string; this verifies expiry and binding, hashes the new password,
    /// and stamps `recovered_at`.
    pub async fn apply_recovery(
        &self,
        account: &mut AccountSecurity,
        candidate: &str,
        new_password: &SecretString,
        hasher: &dyn PasswordHasher,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let Some(token) = account.recovery.token.as_ref() else {
            return Err(AuthError::TokenInvalid);
        };
        if token.expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if !token.matches(&account.email, candidate) {
            return Err(AuthError::TokenInvalid);
        }
        if new_password.expose_secret().is_empty() {
            return Err(AuthError::InvalidInput(
                "new password must not be empty".to_string(),
            ));
        }
        account.password_hash = Some(hasher.hash(new_password).await?);
        account.recovery.recovered_at = Some(now);
        info!(account_id = %account.id, "password recovered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::password::BcryptHasher;
    use crate::transport::RecordingTransport;
    use anyhow::Result;
    use chrono::Utc;

    fn workflow() -> (RecoveryWorkflow, Arc<ManualClock>, Arc<RecordingTransport>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let transport = Arc::new(RecordingTransport::new());
        let workflow =
            RecoveryWorkflow::new(&SecurityConfig::new(), clock.clone(), transport.clone());
        (workflow, clock, transport)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn generate_and_send_stamp_the_token() -> Result<()> {
        let (workflow, clock, transport) = workflow();
        let mut account = AccountSecurity::new("a@b.com".to_string());
        account.recovery.recovered_at = Some(clock.now());

        workflow.generate_token(&mut account);
        assert!(account.recovery.recovered_at.is_none());

        workflow.send(&mut account, false).await?;
        let token = account.recovery.token.clone().expect("token issued");
        assert_eq!(token.sent_at, Some(clock.now()));
        assert_eq!(
            transport.sent(),
            vec![(
                Notification::PasswordRecoveryConfirmation,
                "a@b.com".to_string()
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn apply_recovery_replaces_password() -> Result<()> {
        let (workflow, clock, _transport) = workflow();
        let hasher = BcryptHasher::new().with_cost(4);
        let mut account = AccountSecurity::new("a@b.com".to_string());
        account.password_hash = Some(hasher.hash(&secret("old")).await?);
        workflow.generate_token(&mut account);
        let candidate = account.recovery.token.clone().expect("token").value;

        workflow
            .apply_recovery(&mut account, &candidate, &secret("new"), &hasher)
            .await?;
        assert_eq!(account.recovery.recovered_at, Some(clock.now()));

        let hash = account.password_hash.clone().expect("hash set");
        assert!(hasher.verify(&secret("new"), &hash).await?);
        assert!(!hasher.verify(&secret("old"), &hash).await?);
        Ok(())
    }

    #[tokio::test]
    async fn apply_recovery_rejects_expired_and_foreign_tokens() -> Result<()> {
        let (workflow, clock, _transport) = workflow();
        let hasher = BcryptHasher::new().with_cost(4);
        let mut account = AccountSecurity::new("a@b.com".to_string());
        workflow.generate_token(&mut account);
        let candidate = account.recovery.token.clone().expect("token").value;

        let mut other = AccountSecurity::new("c@d.com".to_string());
        workflow.generate_token(&mut other);
        let foreign = workflow
            .apply_recovery(&mut other, &candidate, &secret("new"), &hasher)
            .await;
        assert!(matches!(foreign, Err(AuthError::TokenInvalid)));

        clock.advance(Duration::days(4));
        let expired = workflow
            .apply_recovery(&mut account, &candidate, &secret("new"), &hasher)
            .await;
        assert!(matches!(expired, Err(AuthError::TokenExpired)));
        Ok(())
    }

    #[tokio::test]
    async fn apply_recovery_rejects_empty_password() -> Result<()> {
        let (workflow, _clock, _transport) = workflow();
        let hasher = BcryptHasher::new().with_cost(4);
        let mut account = AccountSecurity::new("a@b.com".to_string());
        workflow.generate_token(&mut account);
        let candidate = account.recovery.token.clone().expect("token").value;

        let result = workflow
            .apply_recovery(&mut account, &candidate, &secret(""), &hasher)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
        assert!(account.password_hash.is_none());
        Ok(())
    }
}
