//! Read-through query client.
//!
//! Values are stored JSON-encoded per [`QueryKey`]. Reads are served from
//! memory while the caller's policy considers them fresh; otherwise the
//! fetcher is called and the entry overwritten. Entries nobody observes are
//! discarded once their retention window elapses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use superate_core::{CacheError, Clock, SuperateResult, SystemClock};

use crate::{CachePolicy, CacheRead, CacheStats, QueryFetcher, QueryKey, QueryResource};

struct Entry {
    value: Value,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
    /// Marked stale by an invalidation; the value stays readable via `peek`.
    invalidated: bool,
    retain_for: Duration,
    /// `None` while at least one observer is attached.
    unobserved_since: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        match self.unobserved_since {
            Some(since) => now.saturating_duration_since(since) >= self.retain_for,
            None => false,
        }
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    observers: HashMap<QueryKey, usize>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetch_errors: AtomicU64,
    evictions: AtomicU64,
}

/// Shared query cache.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct QueryClient {
    state: Arc<RwLock<CacheState>>,
    counters: Arc<Counters>,
    clock: Arc<dyn Clock>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient").finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            counters: Arc::new(Counters::default()),
            clock,
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, CacheState>, CacheError> {
        self.state.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CacheState>, CacheError> {
        self.state.write().map_err(|_| CacheError::LockPoisoned)
    }

    /// Read `key`, calling `fetcher` unless a fresh value is cached.
    ///
    /// A fetch failure is returned as-is and leaves any existing entry
    /// untouched.
    pub async fn fetch<T, F>(
        &self,
        key: &QueryKey,
        policy: &CachePolicy,
        fetcher: &F,
    ) -> SuperateResult<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned,
        F: QueryFetcher<T> + ?Sized,
    {
        if let Some(read) = self.lookup_fresh(key, policy)? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, age_ms = read.age().as_millis() as u64, "Cache hit");
            return Ok(read);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        self.refresh(key, policy, fetcher).await
    }

    /// Fetch `key` from the backend and overwrite the entry, ignoring freshness.
    pub async fn refresh<T, F>(
        &self,
        key: &QueryKey,
        policy: &CachePolicy,
        fetcher: &F,
    ) -> SuperateResult<CacheRead<T>>
    where
        T: Serialize,
        F: QueryFetcher<T> + ?Sized,
    {
        tracing::debug!(key = %key, "Fetching query");
        match fetcher.fetch(key).await {
            Ok(value) => {
                let fetched_at = self.store(key, &value, policy)?;
                Ok(CacheRead::from_fetch(value, fetched_at))
            }
            Err(err) => {
                self.counters.fetch_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %err, "Query fetch failed");
                Err(err)
            }
        }
    }

    fn lookup_fresh<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        policy: &CachePolicy,
    ) -> Result<Option<CacheRead<T>>, CacheError> {
        let now = self.clock.now();
        let state = self.read_state()?;
        let Some(entry) = state.entries.get(key) else {
            return Ok(None);
        };
        if entry.invalidated || entry.is_expired(now) || !policy.is_fresh(entry.age(now)) {
            return Ok(None);
        }
        match serde_json::from_value::<T>(entry.value.clone()) {
            Ok(value) => Ok(Some(CacheRead::from_cache(
                value,
                entry.fetched_at_utc,
                entry.age(now),
            ))),
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "Cached value has a different shape, refetching");
                Ok(None)
            }
        }
    }

    fn store<T: Serialize>(
        &self,
        key: &QueryKey,
        value: &T,
        policy: &CachePolicy,
    ) -> Result<DateTime<Utc>, CacheError> {
        let encoded = serde_json::to_value(value).map_err(|e| CacheError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let now = self.clock.now();
        let now_utc = self.clock.utc_now();

        let mut state = self.write_state()?;
        let observed = state.observers.contains_key(key);
        state.entries.insert(
            key.clone(),
            Entry {
                value: encoded,
                fetched_at: now,
                fetched_at_utc: now_utc,
                invalidated: false,
                retain_for: policy.retain_for(),
                unobserved_since: if observed { None } else { Some(now) },
            },
        );
        Ok(now_utc)
    }

    /// Current value of `key` regardless of freshness, if still retained.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> SuperateResult<Option<CacheRead<T>>> {
        let now = self.clock.now();
        let state = self.read_state()?;
        let Some(entry) = state.entries.get(key).filter(|e| !e.is_expired(now)) else {
            return Ok(None);
        };
        let value = serde_json::from_value::<T>(entry.value.clone())?;
        Ok(Some(CacheRead::from_cache(
            value,
            entry.fetched_at_utc,
            entry.age(now),
        )))
    }

    /// Write a value directly, as if it had just been fetched.
    pub fn set_query_data<T: Serialize>(
        &self,
        key: &QueryKey,
        value: &T,
        policy: &CachePolicy,
    ) -> SuperateResult<()> {
        self.store(key, value, policy)?;
        tracing::debug!(key = %key, "Query data set");
        Ok(())
    }

    /// Mark one entry stale. Returns whether it existed.
    pub fn invalidate(&self, key: &QueryKey) -> SuperateResult<bool> {
        let mut state = self.write_state()?;
        Ok(match state.entries.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        })
    }

    /// Mark every parameter variant of `resource` stale.
    pub fn invalidate_resource(&self, resource: QueryResource) -> SuperateResult<usize> {
        self.invalidate_where(|key| key.resource() == resource)
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> SuperateResult<usize> {
        self.invalidate_where(|_| true)
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) -> SuperateResult<usize> {
        let mut state = self.write_state()?;
        let mut count = 0;
        for (key, entry) in state.entries.iter_mut() {
            if matches(key) {
                entry.invalidated = true;
                count += 1;
            }
        }
        tracing::debug!(count, "Queries invalidated");
        Ok(count)
    }

    /// Drop an entry outright.
    pub fn remove(&self, key: &QueryKey) -> SuperateResult<bool> {
        let mut state = self.write_state()?;
        Ok(state.entries.remove(key).is_some())
    }

    /// Attach an observer to `key`; the entry is retained while any is attached.
    pub fn observe(&self, key: &QueryKey) -> SuperateResult<QueryObserver> {
        let mut state = self.write_state()?;
        *state.observers.entry(key.clone()).or_insert(0) += 1;
        if let Some(entry) = state.entries.get_mut(key) {
            entry.unobserved_since = None;
        }
        Ok(QueryObserver {
            client: self.clone(),
            key: key.clone(),
        })
    }

    fn release(&self, key: &QueryKey) {
        let now = self.clock.now();
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let remaining = match state.observers.get_mut(key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            state.observers.remove(key);
            if let Some(entry) = state.entries.get_mut(key) {
                entry.unobserved_since = Some(now);
            }
        }
    }

    pub fn observer_count(&self, key: &QueryKey) -> SuperateResult<usize> {
        Ok(self.read_state()?.observers.get(key).copied().unwrap_or(0))
    }

    /// Discard every unobserved entry whose retention window has elapsed.
    pub fn collect_garbage(&self) -> SuperateResult<usize> {
        let now = self.clock.now();
        let mut state = self.write_state()?;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();
        drop(state);

        if removed > 0 {
            self.counters
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "Cache garbage collected");
        }
        Ok(removed)
    }

    /// Whether a retained entry exists for `key`.
    pub fn contains(&self, key: &QueryKey) -> SuperateResult<bool> {
        let now = self.clock.now();
        Ok(self
            .read_state()?
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired(now)))
    }

    pub fn len(&self) -> SuperateResult<usize> {
        Ok(self.read_state()?.entries.len())
    }

    pub fn is_empty(&self) -> SuperateResult<bool> {
        Ok(self.read_state()?.entries.is_empty())
    }

    pub fn stats(&self) -> SuperateResult<CacheStats> {
        let entries = self.len()? as u64;
        Ok(CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetch_errors: self.counters.fetch_errors.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries,
        })
    }
}

/// Observer registration; detaches when dropped.
#[must_use = "the observer detaches as soon as it is dropped"]
pub struct QueryObserver {
    client: QueryClient,
    key: QueryKey,
}

impl QueryObserver {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        self.client.release(&self.key);
    }
}
