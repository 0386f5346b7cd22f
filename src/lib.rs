//! # Gardisto (Account Security Engine)
//!
//! `gardisto` turns a generic user record into a fully credentialed,
//! self-healing account: password authentication, email confirmation,
//! brute-force lockout, password recovery, remember-me persistence, and
//! sign-in tracking. It is behavior that attaches to an account entity,
//! independent of how that entity is stored, rendered, or routed to over
//! HTTP.
//!
//! ## Capabilities
//!
//! - **Confirmable:** a new account proves email ownership before it may
//!   authenticate; expired confirmation tokens are silently re-issued and
//!   re-sent when the gate trips.
//! - **Lockable:** repeated failed password attempts (default 5) lock the
//!   account until an emailed unlock token is redeemed.
//! - **Recoverable:** "forgot password" issues a time-boxed token that
//!   rotates the password without knowledge of the old one.
//! - **Rememberable:** a long-lived cookie token re-establishes identity
//!   without a password.
//! - **Trackable:** sign-in count, instants, and origin IPs for auditing.
//!
//! ## Collaborators
//!
//! Storage ([`Repository`]), notification delivery ([`Transport`]), the
//! wall clock ([`Clock`]), and password hashing ([`PasswordHasher`]) are
//! injected traits. The crate ships an in-memory repository, a logging
//! transport, and a bcrypt hasher for local development and tests; real
//! deployments bring their own.
//!
//! ## Error posture
//!
//! Authentication failures are deliberately generic; the engine never
//! reveals whether an email exists. Token flows return specific, actionable
//! errors (invalid vs expired). See [`AuthError`].

pub mod account;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod password;
pub mod repository;
pub mod token;
pub mod transport;
pub mod utils;
pub mod workflows;

pub use account::AccountSecurity;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SecurityConfig;
pub use engine::{AccountSecurityEngine, Credentials};
pub use error::AuthError;
pub use password::{BcryptHasher, PasswordHasher};
pub use repository::{InMemoryRepository, Repository};
pub use token::SecurityToken;
pub use transport::{LogTransport, Notification, RecordingTransport, Transport};
