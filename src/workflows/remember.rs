//! Remember-me workflow: long-lived token for skip-password re-entry.
//!
//! The token is derived from the account email keyed by the issuance
//! instant and carries no expiry; it stays valid until a later issuance
//! replaces it. The returned value is meant for an `httpOnly` cookie with
//! a caller-configured max age. Rotation on each use is a known extension
//! point, not implemented here.

use std::sync::Arc;
use tracing::debug;

use crate::account::AccountSecurity;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::token;

pub struct RememberWorkflow {
    clock: Arc<dyn Clock>,
}

impl RememberWorkflow {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issue a remember-me token, replacing any previous one, and return
    /// the opaque value for the client-side cookie.
    pub fn issue(&self, account: &mut AccountSecurity) -> String {
        let issued_at = self.clock.now();
        let value = token::issue(&account.email, issued_at);
        account.remember.token = Some(value.clone());
        account.remember.issued_at = Some(issued_at);
        debug!(account_id = %account.id, "issued remember-me token");
        value
    }

    /// Verify a presented remember-me token against the stored state.
    pub fn verify(&self, account: &AccountSecurity, candidate: &str) -> Result<(), AuthError> {
        let (Some(stored), Some(issued_at)) =
            (account.remember.token.as_deref(), account.remember.issued_at)
        else {
            return Err(AuthError::TokenInvalid);
        };
        if stored != candidate || !token::verify(&account.email, issued_at, candidate) {
            return Err(AuthError::TokenInvalid);
        }
        Ok(())
    }
}
