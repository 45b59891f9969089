//! Tests for the Lockgate builder pattern

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{EMAIL, PASSWORD, StaticUsers};
use lockgate::{LockgateBuilder, LockoutConfig, ManualClock};

#[tokio::test]
async fn test_builder_with_memory() {
    let lockgate = LockgateBuilder::new()
        .with_memory()
        .build(Arc::new(StaticUsers::default().with_user(EMAIL, PASSWORD)))
        .await
        .expect("Failed to build Lockgate");

    lockgate.health_check().await.expect("Health check failed");
    assert_eq!(lockgate.login(EMAIL, PASSWORD).await.unwrap(), EMAIL);
}

#[tokio::test]
async fn test_builder_with_custom_config_and_clock() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let lockgate = LockgateBuilder::new()
        .with_memory()
        .with_lockout_config(
            LockoutConfig::default()
                .with_max_failed_attempts(2)
                .with_lockout_period(Duration::minutes(1)),
        )
        .with_clock(clock.clone())
        .build(Arc::new(StaticUsers::default().with_user(EMAIL, PASSWORD)))
        .await
        .expect("Failed to build Lockgate");

    assert!(!lockgate.login(EMAIL, "wrong").await.unwrap_err().is_locked_out());
    assert!(lockgate.login(EMAIL, "wrong").await.unwrap_err().is_locked_out());
    assert!(lockgate.login(EMAIL, PASSWORD).await.unwrap_err().is_locked_out());

    clock.advance(Duration::minutes(1));
    assert_eq!(lockgate.login(EMAIL, PASSWORD).await.unwrap(), EMAIL);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_with_sqlite() {
    let lockgate = LockgateBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .apply_migrations(true)
        .build(Arc::new(StaticUsers::default()))
        .await
        .expect("Failed to build Lockgate");

    lockgate.health_check().await.expect("Health check failed");
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_with_sqlite_pool() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let lockgate = LockgateBuilder::new()
        .with_sqlite_pool(pool)
        .apply_migrations(true)
        .build(Arc::new(StaticUsers::default().with_user(EMAIL, PASSWORD)))
        .await
        .expect("Failed to build Lockgate");

    assert!(lockgate.login(EMAIL, "wrong").await.is_err());
    assert_eq!(lockgate.lockout_status(EMAIL).await.unwrap().failed_attempts, 1);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_without_migrations_fails_on_first_use() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let lockgate = LockgateBuilder::new()
        .with_sqlite_pool(pool)
        .build(Arc::new(StaticUsers::default()))
        .await
        .expect("Failed to build Lockgate");

    let err = lockgate.login(EMAIL, PASSWORD).await.unwrap_err();
    assert!(matches!(err, lockgate::Error::Storage(_)));
}
