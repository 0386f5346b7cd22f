//! Outbound notification contract and default senders.
//!
//! The engine never sends mail itself; it hands a notification type and the
//! account to a `Transport`. Sends must be safe to repeat: expired-token
//! gate checks re-send as a side effect. The default sender for local dev
//! logs the payload instead of delivering real email.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

use crate::account::AccountSecurity;

/// The notification types the engine can ask a transport to deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Notification {
    RegistrationConfirmation,
    RegistrationConfirmationResend,
    UnlockConfirmation,
    UnlockConfirmationResend,
    PasswordRecoveryConfirmation,
    PasswordRecoveryConfirmationResend,
}

impl Notification {
    /// Human-readable subject line.
    #[must_use]
    pub fn subject(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmation => "Registration confirmation",
            Self::RegistrationConfirmationResend => "Registration confirmation resent",
            Self::UnlockConfirmation => "Unlock confirmation",
            Self::UnlockConfirmationResend => "Unlock confirmation resent",
            Self::PasswordRecoveryConfirmation => "Password recovery confirmation",
            Self::PasswordRecoveryConfirmationResend => "Password recovery confirmation resend",
        }
    }
}

/// Notification delivery abstraction.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a notification for the given account, or return an error to
    /// let the caller surface the failure. Must tolerate repeat sends.
    async fn send(&self, notification: Notification, account: &AccountSecurity) -> Result<()>;
}

/// Local dev transport that logs instead of sending real email.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, notification: Notification, account: &AccountSecurity) -> Result<()> {
        info!(
            to_email = %account.email,
            subject = %notification.subject(),
            payload = %serde_json::to_string(&notification)?,
            "notification send stub"
        );
        Ok(())
    }
}

/// Transport that records what was sent, for asserting on side effects.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Notification, String)>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(notification, email)` pair sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(Notification, String)> {
        self.sent
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |sent| sent.clone())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, notification: Notification, account: &AccountSecurity) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((notification, account.email.clone()));
        }
        Ok(())
    }
}
