//! Retry policy: bounded attempt/time budgets with a fixed polling interval.
//!
//! Underlying systems converge at wildly different speeds (a workflow engine
//! recognizing a new DAG takes minutes; a full run can take an hour), so the
//! bounds and interval are fully parameterized and validated at construction
//! rather than hard-coded at call sites.

use std::time::Duration;
use thiserror::Error;

/// Errors produced when a policy is constructed with unusable bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A zero interval would spin the polling loop.
    #[error("retry interval must be greater than zero")]
    ZeroInterval,

    /// Without at least one bound the loop could poll forever.
    #[error("retry policy requires a max_attempts or max_duration bound")]
    Unbounded,
}

/// Bounds and spacing governing how long a probe is retried before giving up.
///
/// At least one of `max_attempts` / `max_duration` must be set. When both are
/// set, whichever bound triggers first stops the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    max_duration: Option<Duration>,
    interval: Duration,
}

impl RetryPolicy {
    /// Build a policy with explicit bounds. Fails if the interval is zero or
    /// no bound is set.
    pub fn new(
        max_attempts: Option<u32>,
        max_duration: Option<Duration>,
        interval: Duration,
    ) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        if max_attempts.is_none() && max_duration.is_none() {
            return Err(PolicyError::Unbounded);
        }
        Ok(Self {
            max_attempts,
            max_duration,
            interval,
        })
    }

    /// Policy bounded by attempt count only.
    pub fn count_bounded(max_attempts: u32, interval: Duration) -> Result<Self, PolicyError> {
        Self::new(Some(max_attempts), None, interval)
    }

    /// Policy bounded by wall-clock time only.
    pub fn time_bounded(max_duration: Duration, interval: Duration) -> Result<Self, PolicyError> {
        Self::new(None, Some(max_duration), interval)
    }

    /// The fixed sleep between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The attempt bound, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// The wall-clock bound, if any.
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Returns `true` once either bound has been reached.
    ///
    /// `attempts` counts completed probe executions; `elapsed` is measured
    /// from the start of the run. Checked after each attempt and before each
    /// sleep, so the loop never sleeps against an exhausted budget.
    pub fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if let Some(max) = self.max_attempts
            && attempts >= max
        {
            return true;
        }
        if let Some(max) = self.max_duration
            && elapsed >= max
        {
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_rejected() {
        let err = RetryPolicy::count_bounded(3, Duration::ZERO).unwrap_err();
        assert_eq!(err, PolicyError::ZeroInterval);
    }

    #[test]
    fn test_unbounded_rejected() {
        let err = RetryPolicy::new(None, None, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, PolicyError::Unbounded);
    }

    #[test]
    fn test_count_bound_exhaustion() {
        let policy = RetryPolicy::count_bounded(3, Duration::from_secs(10)).unwrap();
        assert!(!policy.exhausted(2, Duration::ZERO));
        assert!(policy.exhausted(3, Duration::ZERO));
        assert!(policy.exhausted(4, Duration::ZERO));
    }

    #[test]
    fn test_time_bound_exhaustion() {
        let policy =
            RetryPolicy::time_bounded(Duration::from_secs(300), Duration::from_secs(30)).unwrap();
        assert!(!policy.exhausted(100, Duration::from_secs(299)));
        assert!(policy.exhausted(0, Duration::from_secs(300)));
    }

    #[test]
    fn test_both_bounds_whichever_first() {
        let policy = RetryPolicy::new(
            Some(5),
            Some(Duration::from_secs(60)),
            Duration::from_secs(10),
        )
        .unwrap();
        // Attempt bound triggers first.
        assert!(policy.exhausted(5, Duration::from_secs(1)));
        // Time bound triggers first.
        assert!(policy.exhausted(1, Duration::from_secs(60)));
        // Neither yet.
        assert!(!policy.exhausted(4, Duration::from_secs(59)));
    }
}
