//! Freshness and retention windows for cached queries.

use std::time::Duration;

use superate_core::ConfigError;

/// Per-query cache policy.
///
/// - `fresh_for`: while the last fetch is younger than this, reads are served
///   from the cache without contacting the backend.
/// - `retain_for`: how long an entry with no observers stays in memory.
/// - `refetch_interval`: optional forced refresh, independent of staleness.
///
/// `retain_for >= fresh_for` always holds for a constructed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    fresh_for: Duration,
    retain_for: Duration,
    refetch_interval: Option<Duration>,
}

impl CachePolicy {
    /// Build a policy, raising `retain_for` to `fresh_for` if it is shorter.
    pub fn new(fresh_for: Duration, retain_for: Duration) -> Self {
        let retain_for = if retain_for < fresh_for {
            tracing::warn!(
                fresh_for_ms = fresh_for.as_millis() as u64,
                retain_for_ms = retain_for.as_millis() as u64,
                "Cache retention shorter than freshness, raising retention"
            );
            fresh_for
        } else {
            retain_for
        };
        Self {
            fresh_for,
            retain_for,
            refetch_interval: None,
        }
    }

    /// Build a policy, rejecting `retain_for < fresh_for`.
    pub fn try_new(fresh_for: Duration, retain_for: Duration) -> Result<Self, ConfigError> {
        if retain_for < fresh_for {
            return Err(ConfigError::RetentionShorterThanFreshness {
                fresh_for,
                retain_for,
            });
        }
        Ok(Self {
            fresh_for,
            retain_for,
            refetch_interval: None,
        })
    }

    /// Add a periodic forced refresh.
    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn fresh_for(&self) -> Duration {
        self.fresh_for
    }

    pub fn retain_for(&self) -> Duration {
        self.retain_for
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval
    }

    /// A value fetched `age` ago may be served without refetching.
    pub fn is_fresh(&self, age: Duration) -> bool {
        age < self.fresh_for
    }

    /// An entry unobserved for `idle` should be discarded.
    pub fn is_expired(&self, idle: Duration) -> bool {
        idle >= self.retain_for
    }
}
