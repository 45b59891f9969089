//! Lockout guard for per-principal login throttling.
//!
//! The guard gates login attempts through a check-then-record protocol:
//!
//! 1. [`LockoutGuard::check_attempt`] before credentials are verified
//! 2. [`LockoutGuard::record_outcome`] once the verifier has answered
//!
//! A principal that reaches `max_failed_attempts` is locked for
//! `lockout_period`, counted from its latest failed attempt. Expiry is lazy:
//! there is no timer, the next attempt after the window clears the record.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockgate_core::services::LockoutGuard;
//! use lockgate_core::{InMemoryLockoutRepository, LockoutConfig};
//!
//! let guard = LockoutGuard::new(
//!     Arc::new(InMemoryLockoutRepository::new()),
//!     LockoutConfig::default(),
//! );
//!
//! if guard.check_attempt("user@example.com", now).await?.is_locked() {
//!     // Reject without touching the credential store
//! }
//!
//! let status = guard.record_outcome("user@example.com", now, false).await?;
//! if status.is_locked {
//!     // This very failure locked the account
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    Error,
    repositories::LockoutRepository,
    storage::{AttemptDecision, LockoutConfig, LockoutStatus},
};

type PrincipalLocks = DashMap<String, Arc<Mutex<()>>>;

/// Service that decides whether a principal may attempt to log in.
///
/// # Thread Safety
///
/// The guard is meant to be built once and shared behind an `Arc`. Calls for
/// the same principal are serialized by a per-principal async lock, so
/// concurrent failures are never lost. Calls for different principals do not
/// wait on each other. No lock is held between `check_attempt` and
/// `record_outcome`, so credential verification runs unlocked.
pub struct LockoutGuard<R: LockoutRepository> {
    repository: Arc<R>,
    config: LockoutConfig,
    locks: PrincipalLocks,
}

impl<R: LockoutRepository> LockoutGuard<R> {
    /// Create a new LockoutGuard.
    ///
    /// # Arguments
    ///
    /// * `repository` - The store holding lockout records
    /// * `config` - Threshold and window for lockouts
    pub fn new(repository: Arc<R>, config: LockoutConfig) -> Self {
        Self {
            repository,
            config,
            locks: DashMap::new(),
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Check if lockout is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the backing store.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Decide whether `principal` may attempt to log in at `now`.
    ///
    /// Returns [`AttemptDecision::Locked`] without touching state while the
    /// principal is locked. Once the lockout window has elapsed the record is
    /// cleared and the attempt proceeds with a fresh count.
    ///
    /// Errors only come from the backing store.
    pub async fn check_attempt(
        &self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptDecision, Error> {
        if !self.config.enabled {
            return Ok(AttemptDecision::Proceed);
        }

        let slot = self.slot(principal);
        let _held = slot.acquire().await;

        let Some(record) = self.repository.get_record(principal).await? else {
            return Ok(AttemptDecision::Proceed);
        };

        let Some(locked_until) = record.locked_until(&self.config) else {
            return Ok(AttemptDecision::Proceed);
        };

        if now < locked_until {
            tracing::warn!(
                principal = %principal,
                failed_attempts = record.failed_attempts,
                locked_until = %locked_until,
                "Rejected login attempt for locked account"
            );
            return Ok(AttemptDecision::Locked { locked_until });
        }

        let cutoff = now
            .checked_sub_signed(self.config.lockout_period)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if self
            .repository
            .clear_record_if_stale(principal, cutoff)
            .await?
        {
            tracing::info!(
                principal = %principal,
                failed_attempts = record.failed_attempts,
                "Lockout expired, cleared failed login attempts"
            );
        }

        Ok(AttemptDecision::Proceed)
    }

    /// Record the verifier's verdict for an attempt that was allowed to proceed.
    ///
    /// A success removes the principal's record. A failure increments the
    /// count and stamps `now` as the latest attempt.
    ///
    /// # Returns
    ///
    /// The status after recording. For a failure, `is_locked` is true when
    /// this attempt reached the threshold, so the caller can report a lockout
    /// instead of invalid credentials.
    pub async fn record_outcome(
        &self,
        principal: &str,
        now: DateTime<Utc>,
        succeeded: bool,
    ) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::clear(principal));
        }

        let slot = self.slot(principal);
        let _held = slot.acquire().await;

        if succeeded {
            if self.repository.clear_record(principal).await? {
                tracing::debug!(
                    principal = %principal,
                    "Cleared failed login attempts after successful login"
                );
            }
            return Ok(LockoutStatus::clear(principal));
        }

        let record = self
            .repository
            .increment_failed_attempts(principal, now)
            .await?;

        if record.failed_attempts == self.config.max_failed_attempts {
            tracing::warn!(
                principal = %principal,
                failed_attempts = record.failed_attempts,
                "Account locked after too many failed login attempts"
            );
        }

        Ok(LockoutStatus::from_record(&record, &self.config, now))
    }

    /// Get the lockout status of a principal without changing it.
    ///
    /// A lapsed lockout reports as unlocked with its stale count until the
    /// next attempt clears it.
    pub async fn lockout_status(
        &self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::clear(principal));
        }

        Ok(match self.repository.get_record(principal).await? {
            Some(record) => LockoutStatus::from_record(&record, &self.config, now),
            None => LockoutStatus::clear(principal),
        })
    }

    /// Unlock an account, e.g. after an administrator verified the owner.
    ///
    /// # Returns
    ///
    /// `true` if the account was locked at `now`, `false` otherwise.
    pub async fn unlock(&self, principal: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        let slot = self.slot(principal);
        let _held = slot.acquire().await;

        let was_locked = self
            .repository
            .get_record(principal)
            .await?
            .is_some_and(|record| record.is_locked(&self.config, now));

        self.repository.clear_record(principal).await?;

        if was_locked {
            tracing::info!(principal = %principal, "Account unlocked");
        }

        Ok(was_locked)
    }

    /// Delete records whose last failed attempt is more than `older_than` before `now`.
    ///
    /// `older_than` is raised to the lockout period, so a purge never lifts an
    /// active lockout. Below-threshold records otherwise stay until the
    /// principal logs in successfully, so run this periodically.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    pub async fn purge_stale(
        &self,
        now: DateTime<Utc>,
        older_than: Duration,
    ) -> Result<u64, Error> {
        let older_than = older_than.max(self.config.lockout_period);
        let Some(cutoff) = now.checked_sub_signed(older_than) else {
            return Ok(0);
        };

        let purged = self.repository.purge_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(
                purged,
                cutoff = %cutoff,
                "Purged stale lockout records"
            );
        }

        Ok(purged)
    }

    fn slot<'a>(&'a self, principal: &'a str) -> PrincipalSlot<'a> {
        let mutex = self
            .locks
            .entry(principal.to_string())
            .or_default()
            .value()
            .clone();
        PrincipalSlot {
            locks: &self.locks,
            principal,
            mutex,
        }
    }
}

/// A handle on one principal's lock.
///
/// Dropping the last handle for a principal removes its entry from the lock
/// map, so the map only holds principals with calls in flight.
struct PrincipalSlot<'a> {
    locks: &'a PrincipalLocks,
    principal: &'a str,
    mutex: Arc<Mutex<()>>,
}

impl PrincipalSlot<'_> {
    async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}

impl Drop for PrincipalSlot<'_> {
    fn drop(&mut self) {
        // Idle means only the map and this slot still reference the mutex.
        // `remove_if` holds the shard lock, which `slot` needs to hand out a
        // new reference, so the count cannot change under the check.
        self.locks.remove_if(self.principal, |_, mutex| {
            Arc::ptr_eq(mutex, &self.mutex) && Arc::strong_count(mutex) == 2
        });
    }
}
