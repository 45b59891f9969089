//! Lockout data model and configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failed attempts that lock a principal out.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 6;

/// How long a locked principal stays locked after its latest failed attempt.
pub const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::minutes(30);

/// Longest lockout period a configuration may ask for.
pub const MAX_LOCKOUT_PERIOD: Duration = Duration::days(365);

/// Configuration for account lockout.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use lockgate_core::LockoutConfig;
///
/// let config = LockoutConfig::default()
///     .with_max_failed_attempts(3)
///     .with_lockout_period(Duration::minutes(15));
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// When false the guard lets every attempt through and records nothing.
    pub enabled: bool,

    /// Failed attempts within the window that trigger a lockout.
    pub max_failed_attempts: u32,

    /// Lockout duration, measured from the most recent failed attempt.
    #[serde(rename = "lockout_period_secs", with = "duration_secs")]
    pub lockout_period: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_period: DEFAULT_LOCKOUT_WINDOW,
        }
    }
}

impl LockoutConfig {
    /// A configuration with lockout turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the number of failed attempts that triggers a lockout.
    pub fn with_max_failed_attempts(mut self, max_failed_attempts: u32) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self
    }

    /// Set how long a lockout lasts, up to [`MAX_LOCKOUT_PERIOD`].
    pub fn with_lockout_period(mut self, lockout_period: Duration) -> Self {
        self.lockout_period = lockout_period;
        self
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .filter(|period| *period <= super::MAX_LOCKOUT_PERIOD)
            .ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "lockout period of {secs} seconds exceeds the maximum of {} seconds",
                    super::MAX_LOCKOUT_PERIOD.num_seconds()
                ))
            })
    }
}

/// Failed-attempt state for one principal.
///
/// A principal without failures has no record at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutRecord {
    pub principal: String,
    pub failed_attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
}

impl LockoutRecord {
    /// A record for the first failed attempt of `principal`.
    pub fn first_failure(principal: &str, at: DateTime<Utc>) -> Self {
        Self {
            principal: principal.to_string(),
            failed_attempts: 1,
            last_attempt_at: at,
        }
    }

    /// Whether this record has reached the lockout threshold, ignoring time.
    pub fn at_threshold(&self, config: &LockoutConfig) -> bool {
        self.failed_attempts >= config.max_failed_attempts
    }

    /// The instant the lockout ends, if the record has reached the threshold.
    ///
    /// A period that runs past the last representable instant locks until
    /// [`DateTime::<Utc>::MAX_UTC`].
    pub fn locked_until(&self, config: &LockoutConfig) -> Option<DateTime<Utc>> {
        self.at_threshold(config).then(|| {
            self.last_attempt_at
                .checked_add_signed(config.lockout_period)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Locked iff at the threshold and `now - last_attempt_at < lockout_period`.
    pub fn is_locked(&self, config: &LockoutConfig, now: DateTime<Utc>) -> bool {
        self.locked_until(config).is_some_and(|until| now < until)
    }
}

/// Lockout state of a principal at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStatus {
    pub principal: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    /// Status of a principal with no recorded failures.
    pub fn clear(principal: &str) -> Self {
        Self {
            principal: principal.to_string(),
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }

    /// Status of a principal with a record, evaluated at `now`.
    pub fn from_record(record: &LockoutRecord, config: &LockoutConfig, now: DateTime<Utc>) -> Self {
        let is_locked = record.is_locked(config, now);
        Self {
            principal: record.principal.clone(),
            failed_attempts: record.failed_attempts,
            is_locked,
            locked_until: if is_locked {
                record.locked_until(config)
            } else {
                None
            },
        }
    }

    /// Time left until the lockout ends, or `None` when not locked.
    pub fn retry_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.locked_until
            .filter(|_| self.is_locked)
            .map(|until| (until - now).max(Duration::zero()))
    }
}

/// Decision returned by [`LockoutGuard::check_attempt`](crate::services::LockoutGuard::check_attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// The caller may go on to verify credentials.
    Proceed,

    /// The principal is locked out. The credential verifier must not be called.
    Locked { locked_until: DateTime<Utc> },
}

impl AttemptDecision {
    pub fn is_locked(&self) -> bool {
        matches!(self, AttemptDecision::Locked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(failed_attempts: u32, last_attempt_at: DateTime<Utc>) -> LockoutRecord {
        LockoutRecord {
            principal: "user@example.com".to_string(),
            failed_attempts,
            last_attempt_at,
        }
    }

    #[test]
    fn test_default_config() {
        let config = LockoutConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_failed_attempts, 6);
        assert_eq!(config.lockout_period, Duration::minutes(30));
        assert!(!LockoutConfig::disabled().enabled);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LockoutConfig =
            serde_json::from_str(r#"{"max_failed_attempts": 3, "lockout_period_secs": 900}"#)
                .unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_failed_attempts, 3);
        assert_eq!(config.lockout_period, Duration::minutes(15));

        let json = serde_json::to_value(LockoutConfig::default()).unwrap();
        assert_eq!(json["lockout_period_secs"], 1800);
    }

    #[test]
    fn test_config_rejects_period_above_maximum() {
        let err = serde_json::from_str::<LockoutConfig>(
            r#"{"lockout_period_secs": 9000000000000000}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));

        let max = MAX_LOCKOUT_PERIOD.num_seconds();
        let config: LockoutConfig =
            serde_json::from_str(&format!(r#"{{"lockout_period_secs": {max}}}"#)).unwrap();
        assert_eq!(config.lockout_period, MAX_LOCKOUT_PERIOD);
        assert!(
            serde_json::from_str::<LockoutConfig>(&format!(
                r#"{{"lockout_period_secs": {}}}"#,
                max + 1
            ))
            .is_err()
        );
    }

    #[test]
    fn test_overflowing_period_locks_indefinitely() {
        let config = LockoutConfig::default().with_lockout_period(Duration::MAX);
        let now = Utc::now();
        let record = record(6, now);

        assert_eq!(record.locked_until(&config), Some(DateTime::<Utc>::MAX_UTC));
        assert!(record.is_locked(&config, now + Duration::days(365 * 1000)));

        let status = LockoutStatus::from_record(&record, &config, now);
        assert!(status.is_locked);
        assert!(status.retry_after(now).is_some());
    }

    #[test]
    fn test_below_threshold_is_never_locked() {
        let config = LockoutConfig::default();
        let now = Utc::now();
        let record = record(5, now);
        assert!(!record.at_threshold(&config));
        assert!(!record.is_locked(&config, now));
        assert_eq!(record.locked_until(&config), None);
    }

    #[test]
    fn test_lock_window_is_half_open() {
        let config = LockoutConfig::default();
        let t = Utc::now();
        let record = record(6, t);

        assert!(record.is_locked(&config, t));
        assert!(record.is_locked(&config, t + Duration::minutes(30) - Duration::milliseconds(1)));
        assert!(!record.is_locked(&config, t + Duration::minutes(30)));
        assert!(!record.is_locked(&config, t + Duration::minutes(30) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_status_retry_after() {
        let config = LockoutConfig::default();
        let t = Utc::now();
        let status = LockoutStatus::from_record(&record(6, t), &config, t + Duration::minutes(10));

        assert!(status.is_locked);
        assert_eq!(status.locked_until, Some(t + Duration::minutes(30)));
        assert_eq!(
            status.retry_after(t + Duration::minutes(10)),
            Some(Duration::minutes(20))
        );

        let expired = LockoutStatus::from_record(&record(6, t), &config, t + Duration::hours(1));
        assert!(!expired.is_locked);
        assert_eq!(expired.locked_until, None);
        assert_eq!(expired.retry_after(t + Duration::hours(1)), None);
        assert_eq!(LockoutStatus::clear("x").retry_after(t), None);
    }
}
