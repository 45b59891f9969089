//! Builder pattern for constructing Lockgate instances
//!
//! This module provides a type-safe builder for creating [`Lockgate`] instances
//! with compile-time validation that storage has been configured.
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::Duration;
//! use lockgate::{LockgateBuilder, LockoutConfig};
//!
//! // In-memory store, default lockout (6 failures, 30 minutes)
//! let lockgate = LockgateBuilder::new()
//!     .with_memory()
//!     .build(verifier.clone())
//!     .await?;
//!
//! // Shared SQLite store with a custom policy
//! let lockgate = LockgateBuilder::new()
//!     .with_sqlite("sqlite://lockgate.db?mode=rwc")
//!     .await?
//!     .with_lockout_config(
//!         LockoutConfig::default()
//!             .with_max_failed_attempts(3)
//!             .with_lockout_period(Duration::minutes(15)),
//!     )
//!     .apply_migrations(true)
//!     .build(verifier)
//!     .await?;
//! ```

use std::sync::Arc;

use chrono::Duration;
use lockgate_core::{
    Clock, CredentialVerifier, InMemoryLockoutRepository, LockoutConfig, LockoutRepository,
    MAX_LOCKOUT_PERIOD, SystemClock,
};

use crate::Lockgate;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Lockgate instance.
#[derive(Debug, thiserror::Error)]
pub enum LockgateBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`LockgateBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: LockoutRepository> {
    repository: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Lockgate`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build
pub struct LockgateBuilder<Storage> {
    storage: Storage,
    lockout_config: LockoutConfig,
    clock: Arc<dyn Clock>,
    apply_migrations: bool,
}

impl Default for LockgateBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl LockgateBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout: enabled, 6 failed attempts, 30 minute window
    /// - Clock: system time
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            lockout_config: LockoutConfig::default(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
        }
    }

    /// Keep lockout state in process memory.
    ///
    /// Every instance of the service enforces its own lockout.
    pub fn with_memory(self) -> LockgateBuilder<WithStorage<InMemoryLockoutRepository>> {
        self.with_repository(Arc::new(InMemoryLockoutRepository::new()))
    }

    /// Use any [`LockoutRepository`] implementation.
    pub fn with_repository<R: LockoutRepository>(
        self,
        repository: Arc<R>,
    ) -> LockgateBuilder<WithStorage<R>> {
        LockgateBuilder {
            storage: WithStorage { repository },
            lockout_config: self.lockout_config,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl LockgateBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite://path/to/lockgate.db?mode=rwc")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<LockgateBuilder<WithStorage<crate::SqliteLockoutRepository>>, LockgateBuilderError>
    {
        let storage = crate::SqliteStorage::connect(url)
            .await
            .map_err(|e| LockgateBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repository(Arc::new(storage.into_lockout_repository())))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> LockgateBuilder<WithStorage<crate::SqliteLockoutRepository>> {
        self.with_repository(Arc::new(crate::SqliteLockoutRepository::new(pool)))
    }
}

impl<Storage> LockgateBuilder<Storage> {
    /// Replace the lockout configuration.
    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Set the number of failed attempts that triggers a lockout.
    pub fn with_max_failed_attempts(mut self, max_failed_attempts: u32) -> Self {
        self.lockout_config.max_failed_attempts = max_failed_attempts;
        self
    }

    /// Set how long a lockout lasts after the latest failed attempt.
    pub fn with_lockout_period(mut self, lockout_period: Duration) -> Self {
        self.lockout_config.lockout_period = lockout_period;
        self
    }

    /// Turn lockout off entirely.
    pub fn disable_lockout(mut self) -> Self {
        self.lockout_config.enabled = false;
        self
    }

    /// Use a different time source, e.g. a [`ManualClock`](lockgate_core::ManualClock) in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the store's migrations during [`build`](LockgateBuilder::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<R: LockoutRepository> LockgateBuilder<WithStorage<R>> {
    /// Validate the configuration and build the [`Lockgate`] instance.
    pub async fn build<V: CredentialVerifier>(
        self,
        verifier: Arc<V>,
    ) -> Result<Lockgate<R, V>, LockgateBuilderError> {
        validate(&self.lockout_config)?;

        let repository = self.storage.repository;

        if self.apply_migrations {
            repository
                .migrate()
                .await
                .map_err(|e| LockgateBuilderError::Migration(e.to_string()))?;
        }

        tracing::debug!(
            enabled = self.lockout_config.enabled,
            max_failed_attempts = self.lockout_config.max_failed_attempts,
            lockout_period_secs = self.lockout_config.lockout_period.num_seconds(),
            "Built lockgate"
        );

        Ok(Lockgate::with_config(
            repository,
            verifier,
            self.lockout_config,
            self.clock,
        ))
    }
}

fn validate(config: &LockoutConfig) -> Result<(), LockgateBuilderError> {
    if !config.enabled {
        return Ok(());
    }

    if config.max_failed_attempts == 0 {
        return Err(LockgateBuilderError::InvalidConfiguration(
            "max_failed_attempts must be at least 1".to_string(),
        ));
    }

    if config.lockout_period <= Duration::zero() {
        return Err(LockgateBuilderError::InvalidConfiguration(
            "lockout_period must be positive".to_string(),
        ));
    }

    if config.lockout_period > MAX_LOCKOUT_PERIOD {
        return Err(LockgateBuilderError::InvalidConfiguration(format!(
            "lockout_period must be at most {} seconds",
            MAX_LOCKOUT_PERIOD.num_seconds()
        )));
    }

    Ok(())
}
