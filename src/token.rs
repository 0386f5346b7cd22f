//! Security token derivation and the `SecurityToken` value object.
//!
//! Tokens are derived deterministically: a SHA-256 digest keyed by the
//! textual form of the instant they were issued against (the expiry for
//! mailed tokens, the issuance time for remember-me), over the value they
//! are bound to (the account email). Verification re-derives and compares;
//! a malformed or mismatched candidate verifies to `false`, never errors.
//!
//! The scheme keeps the original wire behavior (opaque string bound to
//! email + instant, no server-side random state) while replacing the
//! reversible cipher with a one-way digest. Expiry is NOT part of
//! verification: callers must check `SecurityToken::expired` first.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derive an opaque token bound to `bound_value` and keyed by `instant`.
#[must_use]
pub fn issue(bound_value: &str, instant: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(instant.timestamp_millis().to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(bound_value.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Re-derive and compare. Fails open to `false` on any mismatch.
#[must_use]
pub fn verify(bound_value: &str, instant: DateTime<Utc>, candidate: &str) -> bool {
    let expected = issue(bound_value, instant);
    eq_no_early_exit(expected.as_bytes(), candidate.as_bytes())
}

/// Byte comparison without an early exit on the first difference.
fn eq_no_early_exit(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// A single-purpose, expiring credential stored on the account.
///
/// Purpose scoping comes from the field the token is stored in: a
/// confirmation token is never valid as an unlock token because each
/// workflow only reads its own slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl SecurityToken {
    /// Issue a fresh token bound to `bound_value`, expiring at `expires_at`.
    #[must_use]
    pub fn issue(bound_value: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: issue(bound_value, expires_at),
            expires_at,
            sent_at: None,
        }
    }

    /// Whether the token is past its expiry at the given clock reading.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Re-derive against `bound_value` and compare to a candidate string.
    #[must_use]
    pub fn matches(&self, bound_value: &str, candidate: &str) -> bool {
        verify(bound_value, self.expires_at, candidate)
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.sent_at = Some(now);
    }
}
