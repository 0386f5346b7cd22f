//! The `AccountSecurity` aggregate and its per-capability state blocks.
//!
//! This is the record the workflows mutate and the storage collaborator
//! persists. Workflows operate on an in-memory copy; the engine saves after
//! every state-changing operation. The aggregate holds no behavior beyond
//! cheap predicates; all transitions live in `workflows`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::SecurityToken;

/// Email confirmation lifecycle: unconfirmed → pending token → confirmed.
///
/// Once `confirmed_at` is set it is only cleared by issuing a brand-new
/// token, never by a failed verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationState {
    pub token: Option<SecurityToken>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Brute-force lockout: counter, lock stamp, and the unlock token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub failed_attempts: u32,
    pub locked_at: Option<DateTime<Utc>>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub unlock_token: Option<SecurityToken>,
}

/// Password recovery ("forgot password") token lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryState {
    pub token: Option<SecurityToken>,
    pub recovered_at: Option<DateTime<Utc>>,
}

/// Long-lived remember-me token. Carries no expiry; it stays valid until
/// replaced by a later issuance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberState {
    pub token: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Sign-in frequency and origin, for auditing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub sign_in_count: u32,
    pub current_sign_in_at: Option<DateTime<Utc>>,
    pub current_sign_in_ip_address: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub last_sign_in_ip_address: Option<String>,
}

/// A fully credentialed account record: identity, credential, and the five
/// capability state blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSecurity {
    pub id: Uuid,
    /// Unique, normalized; doubles as token-binding material.
    pub email: String,
    /// Set only through the password hasher, never plaintext.
    pub password_hash: Option<String>,
    pub confirmation: ConfirmationState,
    pub lock: LockState,
    pub recovery: RecoveryState,
    pub remember: RememberState,
    pub tracking: TrackingState,
    /// Soft-delete stamp; an unregistered account no longer authenticates.
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl AccountSecurity {
    /// Fresh record for a normalized email, with no credential yet.
    #[must_use]
    pub fn new(email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash: None,
            confirmation: ConfirmationState::default(),
            lock: LockState::default(),
            recovery: RecoveryState::default(),
            remember: RememberState::default(),
            tracking: TrackingState::default(),
            unregistered_at: None,
        }
    }

    #[must_use]
    pub fn confirmed(&self) -> bool {
        self.confirmation.confirmed_at.is_some()
    }

    #[must_use]
    pub fn locked(&self) -> bool {
        self.lock.locked_at.is_some()
    }

    #[must_use]
    pub fn unregistered(&self) -> bool {
        self.unregistered_at.is_some()
    }
}
