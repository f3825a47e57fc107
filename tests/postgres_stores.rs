//! Postgres store behaviour. Runs only when `WHATSDESIGNS_TEST_DSN` points at
//! a disposable database, e.g.
//! `WHATSDESIGNS_TEST_DSN=postgres://postgres@localhost:5432/whatsdesigns_test`.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;
use whatsdesigns::{
    api::apply_schema,
    auth::{AccountStore, AttemptStore, PgAccountStore, PgAttemptStore},
};

// concurrent CREATE TABLE IF NOT EXISTS can still race in the catalog
static SCHEMA: OnceCell<()> = OnceCell::const_new();

async fn pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("WHATSDESIGNS_TEST_DSN") else {
        eprintln!("WHATSDESIGNS_TEST_DSN not set, skipping");
        return Ok(None);
    };
    let pool = PgPoolOptions::new().max_connections(5).connect(&dsn).await?;
    SCHEMA.get_or_try_init(|| apply_schema(&pool)).await?;
    Ok(Some(pool))
}

// unique per test run so reruns against the same database do not collide
fn phone() -> String {
    let digits: String = Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(11)
        .collect();
    format!("+1{digits}")
}

#[tokio::test]
async fn schema_is_idempotent() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    apply_schema(&pool).await?;
    PgAttemptStore::new(pool).health_check().await
}

#[tokio::test]
async fn attempts_are_consumed_once() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let store = Arc::new(PgAttemptStore::new(pool));
    let phone = phone();
    let token = format!("token-{}", Uuid::new_v4());

    let attempt = store.record_attempt(&phone, &token, Some("SM1")).await?;
    assert!(!attempt.used);
    assert_eq!(attempt.delivery_ref.as_deref(), Some("SM1"));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move { store.mark_used(&token).await }));
    }
    let mut winners = 0;
    for handle in handles {
        if handle.await?? {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let stored = store.find_attempt(&token).await?;
    assert!(stored.as_ref().is_some_and(|a| a.used && a.used_at.is_some()));
    assert!(!store.mark_used("no-such-token").await?);
    Ok(())
}

#[tokio::test]
async fn recent_attempt_respects_window() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let store = PgAttemptStore::new(pool);
    let phone = phone();

    assert!(store
        .recent_attempt(&phone, Utc::now() - Duration::minutes(5))
        .await?
        .is_none());

    store
        .record_attempt(&phone, &format!("token-{}", Uuid::new_v4()), None)
        .await?;
    assert!(store
        .recent_attempt(&phone, Utc::now() - Duration::minutes(5))
        .await?
        .is_some());
    assert!(store
        .recent_attempt(&phone, Utc::now() + Duration::seconds(1))
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_tokens_are_refused() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let store = PgAttemptStore::new(pool);
    let token = format!("token-{}", Uuid::new_v4());
    store.record_attempt(&phone(), &token, None).await?;
    assert!(store.record_attempt(&phone(), &token, None).await.is_err());
    Ok(())
}

#[tokio::test]
async fn accounts_are_unique_per_phone() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let store = Arc::new(PgAccountStore::new(pool));
    let phone = phone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let phone = phone.clone();
        handles.push(tokio::spawn(async move { store.find_or_create(&phone).await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let found = store.find_by_id(ids[0]).await?;
    assert_eq!(found.map(|account| account.phone), Some(phone));
    assert!(store.find_by_id(Uuid::new_v4()).await?.is_none());
    Ok(())
}
