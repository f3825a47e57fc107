//! Login attempt records (`sms_attempts`).
//!
//! One row per link that was actually delivered. Rows are never deleted; the
//! `used` flag flips exactly once through a conditional update.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: i64 = 5 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub phone: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub delivery_ref: Option<String>,
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Insert a new unused attempt.
    async fn record_attempt(
        &self,
        phone: &str,
        token: &str,
        delivery_ref: Option<&str>,
    ) -> Result<LoginAttempt>;

    /// Most recent attempt for `phone` created after `since`.
    async fn recent_attempt(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<LoginAttempt>>;

    /// Exact lookup by token value.
    async fn find_attempt(&self, token: &str) -> Result<Option<LoginAttempt>>;

    /// Flip `used` from false to true. Returns `true` only for the caller that
    /// performed the flip.
    async fn mark_used(&self, token: &str) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;
}

/// Minutes left before `phone` may request another link, rounded up and
/// clamped to `1..=window` minutes.
#[must_use]
pub fn wait_minutes(created_at: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> i64 {
    let remaining = (created_at + window - now).num_seconds();
    let minutes = (remaining + 59).div_euclid(60);
    let window_minutes = ((window.num_seconds() + 59).div_euclid(60)).max(1);
    minutes.clamp(1, window_minutes)
}

#[derive(Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn record_attempt(
        &self,
        phone: &str,
        token: &str,
        delivery_ref: Option<&str>,
    ) -> Result<LoginAttempt> {
        let query = r"
            INSERT INTO sms_attempts (id, phone, token, delivery_ref)
            VALUES ($1, $2, $3, $4)
            RETURNING id, phone, token, created_at, used, used_at, delivery_ref
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query_as::<_, LoginAttempt>(query)
            .bind(Uuid::new_v4())
            .bind(phone)
            .bind(token)
            .bind(delivery_ref)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert sms attempt")
    }

    async fn recent_attempt(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<LoginAttempt>> {
        let query = r"
            SELECT id, phone, token, created_at, used, used_at, delivery_ref
            FROM sms_attempts
            WHERE phone = $1 AND created_at > $2
            ORDER BY created_at DESC
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, LoginAttempt>(query)
            .bind(phone)
            .bind(since)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup recent sms attempt")
    }

    async fn find_attempt(&self, token: &str) -> Result<Option<LoginAttempt>> {
        let query = r"
            SELECT id, phone, token, created_at, used, used_at, delivery_ref
            FROM sms_attempts
            WHERE token = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, LoginAttempt>(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup sms attempt")
    }

    async fn mark_used(&self, token: &str) -> Result<bool> {
        // The `used = FALSE` predicate makes this a compare-and-set: concurrent
        // callers serialize on the row lock and only one sees a row updated.
        let query = r"
            UPDATE sms_attempts
            SET used = TRUE, used_at = NOW()
            WHERE token = $1 AND used = FALSE
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark sms attempt used")?;
        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}
