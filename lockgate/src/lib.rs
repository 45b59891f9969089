//! # Lockgate
//!
//! Lockgate puts a per-principal lockout in front of your login endpoint.
//! After `max_failed_attempts` wrong secrets (6 by default) a principal is
//! refused for `lockout_period` (30 minutes by default), counted from the
//! latest failure. Credential checks stay in your application: you implement
//! [`CredentialVerifier`] and Lockgate decides whether to call it.
//!
//! ## Storage Support
//!
//! - In-memory (single process)
//! - SQLite (shared between instances, feature `sqlite`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lockgate::{CredentialVerifier, LockgateBuilder, Verification, VerifierError};
//!
//! struct Users;
//!
//! #[async_trait::async_trait]
//! impl CredentialVerifier for Users {
//!     type Payload = String;
//!
//!     async fn verify(
//!         &self,
//!         email: &str,
//!         password: &str,
//!     ) -> Result<Verification<String>, VerifierError> {
//!         // Look up the stored hash and compare it here
//!         Ok(Verification::Mismatched)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lockgate = LockgateBuilder::new()
//!         .with_memory()
//!         .build(Arc::new(Users))
//!         .await?;
//!
//!     match lockgate.login("user@example.com", "hunter2").await {
//!         Ok(token) => println!("welcome: {token}"),
//!         Err(e) if e.is_locked_out() => println!("try again later"),
//!         Err(e) => println!("login failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

pub mod builder;

pub use builder::{LockgateBuilder, LockgateBuilderError, NoStorage, WithStorage};
pub use lockgate_core::services::{LockoutGuard, LoginService};

/// Re-export core types from lockgate_core
pub use lockgate_core::{
    AttemptDecision, AuthError, Clock, CredentialVerifier, DEFAULT_LOCKOUT_THRESHOLD,
    DEFAULT_LOCKOUT_WINDOW, Error, InMemoryLockoutRepository, LockoutConfig, LockoutRecord,
    LockoutRepository, LockoutStatus, MAX_LOCKOUT_PERIOD, ManualClock, StorageError, SystemClock,
    Verification, VerifierError,
};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub use lockgate_storage_sqlite::{SqliteLockoutRepository, SqliteStorage};

/// The main entry point for guarded logins.
///
/// Build one per process with [`LockgateBuilder`] and share it behind an `Arc`;
/// the lockout state lives as long as this value does.
pub struct Lockgate<R: LockoutRepository, V: CredentialVerifier> {
    login: LoginService<R, V>,
}

impl<R: LockoutRepository, V: CredentialVerifier> Lockgate<R, V> {
    /// Create a Lockgate with the default configuration and the system clock.
    pub fn new(repository: Arc<R>, verifier: Arc<V>) -> Self {
        Self::with_config(
            repository,
            verifier,
            LockoutConfig::default(),
            Arc::new(SystemClock),
        )
    }

    /// Create a Lockgate with an explicit configuration and time source.
    pub fn with_config(
        repository: Arc<R>,
        verifier: Arc<V>,
        config: LockoutConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = Arc::new(LockoutGuard::new(repository, config));
        Self {
            login: LoginService::new(guard, verifier, clock),
        }
    }

    /// Log a principal in with a secret.
    ///
    /// See [`LoginService::login`] for the error cases.
    pub async fn login(&self, principal: &str, secret: &str) -> Result<V::Payload, Error> {
        self.login.login(principal, secret).await
    }

    /// Current lockout status of a principal.
    pub async fn lockout_status(&self, principal: &str) -> Result<LockoutStatus, Error> {
        self.guard()
            .lockout_status(principal, self.login.clock().now())
            .await
    }

    /// Clear a principal's failed attempts.
    ///
    /// Returns `true` if the principal was locked.
    pub async fn unlock(&self, principal: &str) -> Result<bool, Error> {
        self.guard()
            .unlock(principal, self.login.clock().now())
            .await
    }

    /// Delete lockout records whose last failure is older than `older_than`.
    ///
    /// Active lockouts are never purged. See [`LockoutGuard::purge_stale`].
    pub async fn purge_stale(&self, older_than: chrono::Duration) -> Result<u64, Error> {
        self.guard()
            .purge_stale(self.login.clock().now(), older_than)
            .await
    }

    /// Check that the lockout store is reachable.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.guard().repository().health_check().await
    }

    /// Get the lockout configuration.
    pub fn config(&self) -> &LockoutConfig {
        self.guard().config()
    }

    /// The time source used to stamp attempts.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.login.clock()
    }

    /// The underlying guard, for callers that run their own login flow.
    pub fn guard(&self) -> &Arc<LockoutGuard<R>> {
        self.login.guard()
    }
}
