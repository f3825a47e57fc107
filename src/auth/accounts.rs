//! Accounts (`users`), keyed by phone number.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{Instrument, info_span};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Return the account for `phone`, creating it on first use. Must be safe
    /// under concurrent first-time calls for the same phone.
    async fn find_or_create(&self, phone: &str) -> Result<Account>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_or_create(&self, phone: &str) -> Result<Account> {
        // Single upsert on the unique phone column; the no-op update makes
        // RETURNING yield the existing row on conflict.
        let query = r"
            INSERT INTO users (id, phone)
            VALUES ($1, $2)
            ON CONFLICT (phone) DO UPDATE SET phone = EXCLUDED.phone
            RETURNING id, phone, name, email, role, created_at, updated_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPSERT",
            db.statement = query
        );
        sqlx::query_as::<_, Account>(query)
            .bind(Uuid::new_v4())
            .bind(phone)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to find or create account")
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = r"
            SELECT id, phone, name, email, role, created_at, updated_at
            FROM users
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, Account>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")
    }
}
