//! Fetcher trait and cache statistics.

use std::future::Future;

use async_trait::async_trait;
use superate_core::SuperateResult;

use crate::QueryKey;

/// Source of fresh values on a cache miss.
///
/// Abstracts over the backend call, so the cache works with any data
/// service (or a closure, through [`fetch_fn`]).
#[async_trait]
pub trait QueryFetcher<T>: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> SuperateResult<T>;
}

/// Adapter turning an async closure into a [`QueryFetcher`].
pub struct FnFetcher<F>(F);

/// Wrap `f` as a fetcher. The closure receives a clone of the key.
pub fn fetch_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher(f)
}

#[async_trait]
impl<T, F, Fut> QueryFetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(QueryKey) -> Fut + Send + Sync,
    Fut: Future<Output = SuperateResult<T>> + Send + 'static,
{
    async fn fetch(&self, key: &QueryKey) -> SuperateResult<T> {
        (self.0)(key.clone()).await
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served without contacting the backend.
    pub hits: u64,
    /// Reads that went to the backend.
    pub misses: u64,
    /// Backend fetches that failed.
    pub fetch_errors: u64,
    /// Entries discarded by garbage collection.
    pub evictions: u64,
    /// Entries currently held.
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryResource;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_fetch_fn_receives_key() {
        let fetcher = fetch_fn(|key: QueryKey| async move {
            Ok::<_, superate_core::SuperateError>(key.to_string())
        });
        let key = QueryKey::new(QueryResource::Grades).with_param("level", 11);
        let value = fetcher.fetch(&key).await.unwrap();
        assert_eq!(value, "grades?level=11");
    }
}
