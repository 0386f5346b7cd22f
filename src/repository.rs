//! Storage collaborator contract and an in-memory implementation.
//!
//! The storage layer owns persistence and concurrency control for the
//! record; the engine hands it a mutated copy after every state change
//! (save-after-mutate). Find-by-token lookups match the opaque token
//! string stored in the corresponding capability slot.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::account::AccountSecurity;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountSecurity>>;
    async fn find_by_confirmation_token(&self, token: &str) -> Result<Option<AccountSecurity>>;
    async fn find_by_unlock_token(&self, token: &str) -> Result<Option<AccountSecurity>>;
    async fn find_by_recovery_token(&self, token: &str) -> Result<Option<AccountSecurity>>;
    async fn find_by_remember_token(&self, token: &str) -> Result<Option<AccountSecurity>>;
    async fn save(&self, account: &AccountSecurity) -> Result<()>;
}

/// Map-backed repository for local development and tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    accounts: RwLock<HashMap<Uuid, AccountSecurity>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_by<F>(&self, predicate: F) -> Result<Option<AccountSecurity>>
    where
        F: Fn(&AccountSecurity) -> bool,
    {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|account| predicate(account)).cloned())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountSecurity>> {
        self.find_by(|account| account.email == email).await
    }

    async fn find_by_confirmation_token(&self, token: &str) -> Result<Option<AccountSecurity>> {
        self.find_by(|account| {
            account
                .confirmation
                .token
                .as_ref()
                .is_some_and(|stored| stored.value == token)
        })
        .await
    }

    async fn find_by_unlock_token(&self, token: &str) -> Result<Option<AccountSecurity>> {
        self.find_by(|account| {
            account
                .lock
                .unlock_token
                .as_ref()
                .is_some_and(|stored| stored.value == token)
        })
        .await
    }

    async fn find_by_recovery_token(&self, token: &str) -> Result<Option<AccountSecurity>> {
        self.find_by(|account| {
            account
                .recovery
                .token
                .as_ref()
                .is_some_and(|stored| stored.value == token)
        })
        .await
    }

    async fn find_by_remember_token(&self, token: &str) -> Result<Option<AccountSecurity>> {
        self.find_by(|account| {
            account
                .remember
                .token
                .as_deref()
                .is_some_and(|stored| stored == token)
        })
        .await
    }

    async fn save(&self, account: &AccountSecurity) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account.clone());
        Ok(())
    }
}
