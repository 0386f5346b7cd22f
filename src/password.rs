//! One-way password hashing behind a pluggable trait.
//!
//! Hashing is CPU-bound and must not stall the async executor, so the
//! bcrypt implementation runs on the blocking pool. Plaintext travels as
//! `SecretString` and is never logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_BCRYPT_COST: u32 = 10;

/// Salted, adaptive one-way hash with verify.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext credential.
    async fn hash(&self, plaintext: &SecretString) -> Result<String>;

    /// Compare a plaintext candidate against a stored hash.
    ///
    /// An empty or unparseable stored hash never matches.
    async fn verify(&self, plaintext: &SecretString, hash: &str) -> Result<bool>;
}

/// bcrypt-backed hasher, ten rounds by default.
#[derive(Clone, Copy, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }

    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plaintext: &SecretString) -> Result<String> {
        let cost = self.cost;
        let plaintext = plaintext.expose_secret().to_owned();
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .context("password hashing task aborted")?
            .context("failed to hash password")
    }

    async fn verify(&self, plaintext: &SecretString, hash: &str) -> Result<bool> {
        if hash.is_empty() {
            return Ok(false);
        }
        let plaintext = plaintext.expose_secret().to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .context("password verification task aborted")?
            // Unparseable stored hashes count as a mismatch, not an error.
            .unwrap_or(false);
        Ok(verified)
    }
}
