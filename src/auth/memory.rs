//! In-process attempt and account stores.
//!
//! Both serialize through a `tokio::sync::Mutex`, which gives the same
//! single-winner behavior as the conditional SQL in the Postgres stores.
//! Used by tests and local demos; nothing here survives a restart.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::accounts::{Account, AccountStore};
use super::attempts::{AttemptStore, LoginAttempt};

#[derive(Default)]
pub struct MemoryAttemptStore {
    attempts: Mutex<Vec<LoginAttempt>>,
}

impl MemoryAttemptStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored attempt, oldest first.
    pub async fn all(&self) -> Vec<LoginAttempt> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn record_attempt(
        &self,
        phone: &str,
        token: &str,
        delivery_ref: Option<&str>,
    ) -> Result<LoginAttempt> {
        let attempt = LoginAttempt {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            token: token.to_string(),
            created_at: Utc::now(),
            used: false,
            used_at: None,
            delivery_ref: delivery_ref.map(ToString::to_string),
        };
        self.attempts.lock().await.push(attempt.clone());
        Ok(attempt)
    }

    async fn recent_attempt(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<LoginAttempt>> {
        let attempts = self.attempts.lock().await;
        Ok(attempts
            .iter()
            .filter(|attempt| attempt.phone == phone && attempt.created_at > since)
            .max_by_key(|attempt| attempt.created_at)
            .cloned())
    }

    async fn find_attempt(&self, token: &str) -> Result<Option<LoginAttempt>> {
        let attempts = self.attempts.lock().await;
        Ok(attempts
            .iter()
            .find(|attempt| attempt.token == token)
            .cloned())
    }

    async fn mark_used(&self, token: &str) -> Result<bool> {
        let mut attempts = self.attempts.lock().await;
        match attempts
            .iter_mut()
            .find(|attempt| attempt.token == token && !attempt.used)
        {
            Some(attempt) => {
                attempt.used = true;
                attempt.used_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }

    /// Assign a role to an existing account; returns `false` when no account
    /// matches `phone`.
    pub async fn set_role(&self, phone: &str, role: Option<&str>) -> bool {
        let mut accounts = self.accounts.lock().await;
        match accounts.get_mut(phone) {
            Some(account) => {
                account.role = role.map(ToString::to_string);
                account.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Fill in the profile fields of an existing account.
    pub async fn set_profile(&self, phone: &str, name: Option<&str>, email: Option<&str>) -> bool {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(phone) else {
            return false;
        };
        account.name = name.map(ToString::to_string);
        account.email = email.map(ToString::to_string);
        account.updated_at = Utc::now();
        true
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_or_create(&self, phone: &str) -> Result<Account> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(phone.to_string()).or_insert_with(|| {
            let now = Utc::now();
            Account {
                id: Uuid::new_v4(),
                phone: phone.to_string(),
                name: None,
                email: None,
                role: None,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(account.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.values().find(|account| account.id == id).cloned())
    }
}
