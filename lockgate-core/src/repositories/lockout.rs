//! Repository trait for lockout state.
//!
//! This module defines the storage interface the lockout guard uses to track
//! failed login attempts per principal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, storage::LockoutRecord};

/// Backing store for per-principal lockout records.
///
/// Every method must be atomic with respect to other calls for the same
/// principal, including calls from other processes when the store is shared.
/// The guard serializes calls for a principal within one process; the store is
/// responsible for everything beyond that.
#[async_trait]
pub trait LockoutRepository: Send + Sync + 'static {
    /// Get the record for a principal, if it has any recorded failures.
    async fn get_record(&self, principal: &str) -> Result<Option<LockoutRecord>, Error>;

    /// Record one failed attempt.
    ///
    /// Creates the record with a count of 1 if absent, otherwise increments the
    /// count. `last_attempt_at` becomes `at` unless the stored value is later.
    ///
    /// # Returns
    ///
    /// The record after the increment.
    async fn increment_failed_attempts(
        &self,
        principal: &str,
        at: DateTime<Utc>,
    ) -> Result<LockoutRecord, Error>;

    /// Delete the record for a principal.
    ///
    /// # Returns
    ///
    /// `true` if a record existed.
    async fn clear_record(&self, principal: &str) -> Result<bool, Error>;

    /// Delete the record only if its last failed attempt is at or before `cutoff`.
    ///
    /// Used for lazy expiry. The condition protects a failure recorded
    /// concurrently by another instance from being wiped out.
    async fn clear_record_if_stale(
        &self,
        principal: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, Error>;

    /// Delete every record whose last failed attempt is before `cutoff`.
    ///
    /// Records below the threshold never expire on their own, so stores
    /// rely on this for cleanup.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;

    /// Create or upgrade whatever schema the store needs.
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Check that the store is reachable.
    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
