//! SQLite implementation of the lockout repository.
//!
//! Each operation is a single statement, so several service instances can
//! share one database without losing increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lockgate_core::{Error, LockoutRecord, LockoutRepository, error::StorageError};
use sqlx::SqlitePool;

use crate::migrations::{MIGRATIONS, SqliteMigrationManager};

/// SQLite repository for lockout records.
pub struct SqliteLockoutRepository {
    pool: SqlitePool,
}

impl SqliteLockoutRepository {
    /// Create a new SQLite lockout repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteLockoutRecord {
    principal: String,
    failed_attempts: i64,
    last_attempt_at: i64,
}

impl TryFrom<SqliteLockoutRecord> for LockoutRecord {
    type Error = Error;

    fn try_from(row: SqliteLockoutRecord) -> Result<Self, Self::Error> {
        let failed_attempts = u32::try_from(row.failed_attempts).map_err(|_| {
            StorageError::Database(format!(
                "Invalid failed_attempts {} for {}",
                row.failed_attempts, row.principal
            ))
        })?;
        let last_attempt_at = DateTime::from_timestamp_millis(row.last_attempt_at).ok_or_else(
            || {
                StorageError::Database(format!(
                    "Invalid last_attempt_at {} for {}",
                    row.last_attempt_at, row.principal
                ))
            },
        )?;

        Ok(LockoutRecord {
            principal: row.principal,
            failed_attempts,
            last_attempt_at,
        })
    }
}

fn database_error(context: &str, e: sqlx::Error) -> Error {
    tracing::error!(error = %e, "{context}");
    StorageError::Database(context.to_string()).into()
}

#[async_trait]
impl LockoutRepository for SqliteLockoutRepository {
    async fn get_record(&self, principal: &str) -> Result<Option<LockoutRecord>, Error> {
        let row = sqlx::query_as::<_, SqliteLockoutRecord>(
            r#"
            SELECT principal, failed_attempts, last_attempt_at
            FROM lockout_records
            WHERE principal = ?
            "#,
        )
        .bind(principal)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("Failed to get lockout record", e))?;

        row.map(LockoutRecord::try_from).transpose()
    }

    async fn increment_failed_attempts(
        &self,
        principal: &str,
        at: DateTime<Utc>,
    ) -> Result<LockoutRecord, Error> {
        let row = sqlx::query_as::<_, SqliteLockoutRecord>(
            r#"
            INSERT INTO lockout_records (principal, failed_attempts, last_attempt_at)
            VALUES (?, 1, ?)
            ON CONFLICT (principal) DO UPDATE SET
                failed_attempts = failed_attempts + 1,
                last_attempt_at = MAX(last_attempt_at, excluded.last_attempt_at)
            RETURNING principal, failed_attempts, last_attempt_at
            "#,
        )
        .bind(principal)
        .bind(at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("Failed to record failed login attempt", e))?;

        row.try_into()
    }

    async fn clear_record(&self, principal: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM lockout_records WHERE principal = ?")
            .bind(principal)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("Failed to clear lockout record", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_record_if_stale(
        &self,
        principal: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM lockout_records WHERE principal = ? AND last_attempt_at <= ?",
        )
        .bind(principal)
        .bind(cutoff.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("Failed to clear stale lockout record", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM lockout_records WHERE last_attempt_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("Failed to purge old lockout records", e))?;

        Ok(result.rows_affected())
    }

    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await?;
        manager.up(MIGRATIONS).await
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                StorageError::Connection("SQLite health check failed".to_string())
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn setup_test_db() -> SqlitePool {
        let _ = tracing_subscriber::fmt().try_init();

        // One connection: every new connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");

        SqliteLockoutRepository::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_missing_record() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        assert!(repo.get_record("test@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_creates_then_counts() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let t = Utc::now();

        let record = repo
            .increment_failed_attempts("test@example.com", t)
            .await
            .expect("Failed to record attempt");
        assert_eq!(record.principal, "test@example.com");
        assert_eq!(record.failed_attempts, 1);

        let record = repo
            .increment_failed_attempts("test@example.com", t + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(record.failed_attempts, 2);

        let stored = repo.get_record("test@example.com").await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_timestamps_keep_millisecond_precision() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let t = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        repo.increment_failed_attempts("test@example.com", t)
            .await
            .unwrap();

        let stored = repo.get_record("test@example.com").await.unwrap().unwrap();
        assert_eq!(stored.last_attempt_at, t);
    }

    #[tokio::test]
    async fn test_last_attempt_never_moves_backwards() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let t = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        repo.increment_failed_attempts("test@example.com", t)
            .await
            .unwrap();
        let record = repo
            .increment_failed_attempts("test@example.com", t - Duration::seconds(10))
            .await
            .unwrap();

        assert_eq!(record.failed_attempts, 2);
        assert_eq!(record.last_attempt_at, t);
    }

    #[tokio::test]
    async fn test_clear_record() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let now = Utc::now();

        for _ in 0..3 {
            repo.increment_failed_attempts("test1@example.com", now)
                .await
                .unwrap();
            repo.increment_failed_attempts("test2@example.com", now)
                .await
                .unwrap();
        }

        assert!(repo.clear_record("test1@example.com").await.unwrap());
        assert!(!repo.clear_record("test1@example.com").await.unwrap());

        assert!(repo.get_record("test1@example.com").await.unwrap().is_none());
        let other = repo.get_record("test2@example.com").await.unwrap().unwrap();
        assert_eq!(other.failed_attempts, 3);
    }

    #[tokio::test]
    async fn test_clear_if_stale_respects_cutoff() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let t = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        repo.increment_failed_attempts("test@example.com", t)
            .await
            .unwrap();

        assert!(
            !repo
                .clear_record_if_stale("test@example.com", t - Duration::milliseconds(1))
                .await
                .unwrap()
        );
        assert!(repo.get_record("test@example.com").await.unwrap().is_some());

        assert!(
            repo.clear_record_if_stale("test@example.com", t)
                .await
                .unwrap()
        );
        assert!(repo.get_record("test@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_before_drops_old_records() {
        let repo = SqliteLockoutRepository::new(setup_test_db().await);
        let t = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        for i in 0..10 {
            repo.increment_failed_attempts(&format!("user{i}@example.com"), t)
                .await
                .unwrap();
        }
        repo.increment_failed_attempts("recent@example.com", t + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(repo.purge_before(t).await.unwrap(), 0);
        assert_eq!(
            repo.purge_before(t + Duration::minutes(1)).await.unwrap(),
            10
        );

        assert!(repo.get_record("user0@example.com").await.unwrap().is_none());
        assert!(
            repo.get_record("recent@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(SqliteLockoutRepository::new(setup_test_db().await));
        let now = Utc::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.increment_failed_attempts("test@example.com", now)
                        .await
                        .unwrap()
                        .failed_attempts
                })
            })
            .collect();

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=32).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_health_check() {
        let pool = setup_test_db().await;
        let repo = SqliteLockoutRepository::new(pool.clone());
        repo.health_check().await.unwrap();

        pool.close().await;
        let err = repo.health_check().await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Connection(_))));
    }
}
