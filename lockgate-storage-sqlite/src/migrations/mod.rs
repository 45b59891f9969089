use chrono::Utc;
use lockgate_core::{Error, error::StorageError};
use sqlx::SqlitePool;

const MIGRATION_TABLE: &str = "_lockgate_migrations";

/// A schema change applied once and tracked by version.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Schema for the lockout store, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_lockout_records",
        // Timestamps are unix milliseconds
        sql: r#"
            CREATE TABLE IF NOT EXISTS lockout_records (
                principal TEXT PRIMARY KEY NOT NULL,
                failed_attempts INTEGER NOT NULL CHECK (failed_attempts > 0),
                last_attempt_at INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "index_lockout_records_last_attempt_at",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_lockout_records_last_attempt_at
            ON lockout_records (last_attempt_at);
        "#,
    },
];

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize migration tracking table
    pub async fn initialize(&self) -> Result<(), Error> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );"#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| migration_error("Failed to create migration table", e))?;

        Ok(())
    }

    /// Apply pending migrations, each in its own transaction
    pub async fn up(&self, migrations: &[Migration]) -> Result<(), Error> {
        for migration in migrations {
            if self.is_applied(migration.version).await? {
                continue;
            }

            tracing::info!(
                "Applying migration {} ({})",
                migration.name,
                migration.version
            );

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| migration_error("Failed to begin migration", e))?;

            sqlx::query(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| migration_error(migration.name, e))?;

            sqlx::query(&format!(
                "INSERT INTO {MIGRATION_TABLE} (version, name, applied_at) VALUES (?, ?, ?)"
            ))
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error("Failed to record migration", e))?;

            tx.commit()
                .await
                .map_err(|e| migration_error("Failed to commit migration", e))?;
        }

        Ok(())
    }

    /// Check if specific migration was applied
    pub async fn is_applied(&self, version: i64) -> Result<bool, Error> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT version FROM {MIGRATION_TABLE} WHERE version = ?"
        ))
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| migration_error("Failed to read migration table", e))?;

        Ok(row.is_some())
    }
}

fn migration_error(context: &str, e: sqlx::Error) -> Error {
    tracing::error!(error = %e, "{context}");
    StorageError::Migration(context.to_string()).into()
}
