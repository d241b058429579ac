//! Cache read results carrying freshness metadata.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Result of a cache read.
///
/// Callers can tell whether the backend was contacted and how old the value
/// is, so stale data is never presented as current by accident.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The cached or freshly fetched value.
    value: T,
    /// Wall-clock time of the fetch that produced the value.
    fetched_at: DateTime<Utc>,
    /// Age of the value at read time.
    age: Duration,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T, fetched_at: DateTime<Utc>, age: Duration) -> Self {
        Self {
            value,
            fetched_at,
            age,
            was_cache_hit: true,
        }
    }

    /// A value that was just fetched from the backend.
    pub fn from_fetch(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            age: Duration::ZERO,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.age
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            age: self.age,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_read_from_cache() {
        let fetched_at = Utc::now();
        let read = CacheRead::from_cache("materias", fetched_at, Duration::from_secs(12));

        assert!(read.was_cache_hit());
        assert_eq!(read.age(), Duration::from_secs(12));
        assert_eq!(read.fetched_at(), fetched_at);
    }

    #[test]
    fn test_cache_read_from_fetch_has_zero_age() {
        let read = CacheRead::from_fetch(42, Utc::now());
        assert!(read.was_cache_miss());
        assert_eq!(read.age(), Duration::ZERO);
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_map_keeps_metadata() {
        let read = CacheRead::from_cache(vec![1, 2, 3], Utc::now(), Duration::from_secs(1));
        let mapped = read.map(|v| v.len());
        assert!(mapped.was_cache_hit());
        assert_eq!(*mapped.value(), 3);
    }
}
