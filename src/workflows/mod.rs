//! Capability workflows operating on the `AccountSecurity` aggregate.
//!
//! Each workflow is a stateless service taking the aggregate as a
//! parameter; the engine injects the shared collaborators and persists the
//! result after every state-changing call.

pub mod confirmation;
pub mod lockout;
pub mod recovery;
pub mod remember;
pub mod tracking;

use crate::error::AuthError;

/// Result of an authentication gate check.
///
/// Gates are commands, not pure predicates: a check against an expired
/// token re-issues and re-sends a fresh one as a side effect. `resent`
/// makes that side effect visible so the caller knows to persist the
/// mutated account before surfacing the error.
#[derive(Debug)]
pub enum Gate {
    Pass,
    Blocked { error: AuthError, resent: bool },
}

impl Gate {
    #[must_use]
    pub fn blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
