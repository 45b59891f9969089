//! SQLite storage backend for lockgate
//!
//! Keeps lockout records in a SQLite database so that several service
//! instances pointed at the same database file enforce one shared lockout.
//!
//! ```rust,no_run
//! use lockgate_storage_sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), lockgate_core::Error> {
//! let storage = SqliteStorage::connect("sqlite://lockgate.db?mode=rwc").await?;
//! storage.migrate().await?;
//! let repository = storage.into_lockout_repository();
//! # Ok(())
//! # }
//! ```

pub mod migrations;
pub mod repositories;

pub use repositories::SqliteLockoutRepository;

use lockgate_core::{Error, LockoutRepository, error::StorageError};
use sqlx::SqlitePool;

/// Entry point for the SQLite backend, owning the connection pool.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap an existing connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `url`, e.g. `sqlite://lockgate.db?mode=rwc`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            StorageError::Connection(e.to_string())
        })?;

        Ok(Self::new(pool))
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create or upgrade the lockout schema.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.lockout_repository().migrate().await
    }

    /// A lockout repository sharing this storage's pool.
    pub fn lockout_repository(&self) -> SqliteLockoutRepository {
        SqliteLockoutRepository::new(self.pool.clone())
    }

    /// Turn this storage into a lockout repository that owns the pool.
    pub fn into_lockout_repository(self) -> SqliteLockoutRepository {
        SqliteLockoutRepository::new(self.pool)
    }
}
