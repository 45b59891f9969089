//! In-process lockout store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{Error, repositories::LockoutRepository, storage::LockoutRecord};

/// Lockout records held in a [`DashMap`].
///
/// State lives only as long as the process and is not shared between
/// instances. Use a shared store when running more than one instance.
#[derive(Debug, Default)]
pub struct InMemoryLockoutRepository {
    records: DashMap<String, LockoutRecord>,
}

impl InMemoryLockoutRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of principals with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no principal has a record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LockoutRepository for InMemoryLockoutRepository {
    async fn get_record(&self, principal: &str) -> Result<Option<LockoutRecord>, Error> {
        Ok(self.records.get(principal).map(|r| r.value().clone()))
    }

    async fn increment_failed_attempts(
        &self,
        principal: &str,
        at: DateTime<Utc>,
    ) -> Result<LockoutRecord, Error> {
        // The entry holds the shard write lock, so the read-modify-write is atomic.
        let entry = self
            .records
            .entry(principal.to_string())
            .and_modify(|record| {
                record.failed_attempts = record.failed_attempts.saturating_add(1);
                record.last_attempt_at = record.last_attempt_at.max(at);
            })
            .or_insert_with(|| LockoutRecord::first_failure(principal, at));

        Ok(entry.value().clone())
    }

    async fn clear_record(&self, principal: &str) -> Result<bool, Error> {
        Ok(self.records.remove(principal).is_some())
    }

    async fn clear_record_if_stale(
        &self,
        principal: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, Error> {
        Ok(self
            .records
            .remove_if(principal, |_, record| record.last_attempt_at <= cutoff)
            .is_some())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let mut purged = 0;
        self.records.retain(|_, record| {
            let keep = record.last_attempt_at >= cutoff;
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}
