//! Backend collaborator traits.
//!
//! The document database is reached through [`DataService`]; the activity
//! heartbeat writes through [`ActivityWriter`]. Concrete implementations live
//! in `superate-client` (REST) and `superate-test-utils` (mocks).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{SuperateResult, UserId};

/// Generic CRUD access to backend collections.
///
/// Every call resolves to the decoded `data` of a success envelope, or to a
/// [`crate::ServiceError`] carried in [`crate::SuperateError`].
#[async_trait]
pub trait DataService: Send + Sync {
    /// List documents of `collection` matching every `(field, value)` pair.
    async fn list(
        &self,
        collection: &str,
        filter: &[(String, String)],
    ) -> SuperateResult<Vec<Value>>;

    /// Fetch a single document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> SuperateResult<Option<Value>>;

    /// Create a document and return its id.
    async fn create(&self, collection: &str, document: Value) -> SuperateResult<String>;

    /// Merge `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> SuperateResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> SuperateResult<()>;
}

/// Sink for "last seen" activity timestamps. Write-only.
#[async_trait]
pub trait ActivityWriter: Send + Sync {
    async fn record_last_seen(&self, user: &UserId, at: DateTime<Utc>) -> SuperateResult<()>;
}
