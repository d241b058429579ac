//! Supérate.IA Cache - Query Cache
//!
//! Read-through cache shared by every data query of the client. Each query
//! declares how long its data stays fresh (served without contacting the
//! backend) and how long an unobserved entry is retained in memory.
//!
//! # Example
//!
//! ```ignore
//! let client = QueryClient::new();
//! let key = QueryKey::new(QueryResource::Subjects).with_param("grade", 11);
//! let policy = QueryResource::Subjects.default_policy();
//!
//! let read = client.fetch::<Vec<Subject>, _>(&key, &policy, &fetcher).await?;
//! if read.was_cache_hit() {
//!     tracing::debug!(age_ms = read.age().as_millis() as u64, "served from cache");
//! }
//! ```

pub mod client;
pub mod freshness;
pub mod key;
pub mod policy;
pub mod refresh;
pub mod resource;
pub mod traits;

pub use client::{QueryClient, QueryObserver};
pub use freshness::CacheRead;
pub use key::QueryKey;
pub use policy::CachePolicy;
pub use refresh::{
    spawn_garbage_collector, spawn_periodic_refresh, spawn_policy_refresh, BackgroundTask,
};
pub use resource::{QueryResource, ResourceKind};
pub use traits::{fetch_fn, CacheStats, FnFetcher, QueryFetcher};
