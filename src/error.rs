//! Typed error taxonomy for the account security engine.
//!
//! Workflow functions return these instead of throwing so orchestration can
//! inspect and branch. Authentication failures stay generic (never reveal
//! whether the email exists); token flows are specific and actionable.
//! Collaborator failures (storage, transport) propagate unchanged through
//! the `Collaborator` variant; the engine never retries them.

/// Everything the engine can refuse to do, as a kind rather than a panic.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed input outside the login path.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic login failure; deliberately covers missing fields, unknown
    /// email and wrong password alike.
    #[error("Incorrect email or password")]
    IncorrectCredentials,

    /// Lookup by email or token found no live account (non-login flows).
    #[error("Account not found")]
    AccountNotFound,

    /// Confirmation pending and the mailed token is still live.
    #[error("Account not confirmed")]
    AccountNotConfirmed,

    /// Confirmation token lapsed; a fresh one was issued and re-sent as a
    /// side effect of the check.
    #[error("Confirmation token expired. Check your email for confirmation.")]
    ConfirmationTokenExpired,

    /// Account is locked out. `resent` reports whether this check issued
    /// and sent a new unlock token (the previous one had expired).
    #[error("Account locked. Check your email for unlock instructions.")]
    AccountLocked { resent: bool },

    /// Token not found, bound to a different account, or tampered.
    #[error("Invalid token")]
    TokenInvalid,

    /// Token found but past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// Current password did not match on a re-authentication path
    /// (change password); carries no lockout side effect.
    #[error("Password does not match")]
    PasswordMismatch,

    /// Failure from an external collaborator, propagated unchanged.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl AuthError {
    /// Whether the error is a collaborator (storage/transport) failure as
    /// opposed to a domain refusal.
    #[must_use]
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator(_))
    }
}
