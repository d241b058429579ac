//! Cached Data Query Tests
//!
//! Exercises [`DataQueries`] against the in-memory backend:
//! - reads inside the freshness window are served from cache
//! - reads past it go back to the backend
//! - mutations invalidate every query of the touched resource
//! - backend failures surface unchanged and keep the cached value

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use superate_cache::{QueryClient, QueryKey, QueryResource};
use superate_client::DataQueries;
use superate_core::{DataService, ManualClock, ServiceError};
use superate_test_utils::assertions::assert_quota_exceeded;
use superate_test_utils::fixtures::seeded_backend;
use superate_test_utils::{MockDataService, Operation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Subject {
    id: String,
    name: String,
    grade: String,
}

fn setup() -> (DataQueries, Arc<MockDataService>, Arc<ManualClock>) {
    let backend = Arc::new(seeded_backend());
    let clock = Arc::new(ManualClock::new());
    let queries = DataQueries::new(QueryClient::with_clock(clock.clone()), backend.clone());
    (queries, backend, clock)
}

fn grade(grade: &str) -> QueryKey {
    QueryKey::new(QueryResource::Subjects).with_param("grade", grade)
}

// ============================================================================
// READS
// ============================================================================

#[tokio::test]
async fn test_list_is_cached_within_freshness_window() {
    let (queries, backend, clock) = setup();

    let first = queries.list::<Subject>(&grade("10")).await.unwrap();
    assert!(first.was_cache_miss());
    assert_eq!(first.value().len(), 2);

    clock.advance(Duration::from_secs(4 * 60));
    let second = queries.list::<Subject>(&grade("10")).await.unwrap();
    assert!(second.was_cache_hit());
    assert_eq!(second.value(), first.value());
    assert_eq!(backend.calls(Operation::List), 1);
}

#[tokio::test]
async fn test_list_refetches_when_stale() {
    let (queries, backend, clock) = setup();

    queries.list::<Subject>(&grade("10")).await.unwrap();
    clock.advance(Duration::from_secs(5 * 60 + 1));
    let read = queries.list::<Subject>(&grade("10")).await.unwrap();

    assert!(read.was_cache_miss());
    assert_eq!(backend.calls(Operation::List), 2);
}

#[tokio::test]
async fn test_filters_are_separate_queries() {
    let (queries, backend, _clock) = setup();

    let tenth = queries.list::<Subject>(&grade("10")).await.unwrap();
    let eleventh = queries.list::<Subject>(&grade("11")).await.unwrap();

    assert_eq!(tenth.value().len(), 2);
    assert_eq!(eleventh.value().len(), 1);
    assert_eq!(eleventh.value()[0].name, "Ciencias Naturales");
    assert_eq!(backend.calls(Operation::List), 2);
}

#[tokio::test]
async fn test_get_document() {
    let (queries, backend, _clock) = setup();

    let found = queries
        .get::<Subject>(QueryResource::Subjects, "s-2")
        .await
        .unwrap();
    assert_eq!(found.value().as_ref().map(|s| s.name.as_str()), Some("Lenguaje"));

    let missing = queries
        .get::<Subject>(QueryResource::Subjects, "s-404")
        .await
        .unwrap();
    assert!(missing.value().is_none());

    queries
        .get::<Subject>(QueryResource::Subjects, "s-2")
        .await
        .unwrap();
    assert_eq!(backend.calls(Operation::Get), 2);
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[tokio::test]
async fn test_create_invalidates_resource_queries() {
    let (queries, backend, _clock) = setup();
    queries.list::<Subject>(&grade("10")).await.unwrap();
    queries.list::<Subject>(&grade("11")).await.unwrap();

    let new = Subject {
        id: "s-4".to_string(),
        name: "Inglés".to_string(),
        grade: "10".to_string(),
    };
    let id = queries.create(QueryResource::Subjects, &new).await.unwrap();
    assert_eq!(id, "s-4");

    let read = queries.list::<Subject>(&grade("10")).await.unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(read.value().len(), 3);

    queries.list::<Subject>(&grade("11")).await.unwrap();
    assert_eq!(backend.calls(Operation::List), 4);
}

#[tokio::test]
async fn test_mutation_leaves_other_resources_cached() {
    let (queries, backend, _clock) = setup();
    queries.list::<Subject>(&grade("10")).await.unwrap();

    backend
        .create("topics", serde_json::json!({"id": "t-1", "name": "Fracciones"}))
        .await
        .unwrap();
    queries
        .update(QueryResource::Topics, "t-1", &serde_json::json!({"name": "Álgebra"}))
        .await
        .unwrap();

    let read = queries.list::<Subject>(&grade("10")).await.unwrap();
    assert!(read.was_cache_hit());
}

#[tokio::test]
async fn test_delete_invalidates_document_query() {
    let (queries, _backend, _clock) = setup();
    let before = queries
        .get::<Subject>(QueryResource::Subjects, "s-1")
        .await
        .unwrap();
    assert!(before.value().is_some());

    queries.delete(QueryResource::Subjects, "s-1").await.unwrap();

    let after = queries
        .get::<Subject>(QueryResource::Subjects, "s-1")
        .await
        .unwrap();
    assert!(after.was_cache_miss());
    assert!(after.value().is_none());
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_backend_failure_keeps_cached_value() {
    let (queries, backend, clock) = setup();
    queries.list::<Subject>(&grade("10")).await.unwrap();

    clock.advance(Duration::from_secs(6 * 60));
    backend.fail_with(ServiceError::QuotaExceeded {
        operation: "list subjects".to_string(),
    });
    assert_quota_exceeded(&queries.list::<Subject>(&grade("10")).await);

    let cached = queries
        .cache()
        .peek::<Vec<Subject>>(&grade("10"))
        .unwrap()
        .expect("entry retained");
    assert_eq!(cached.value().len(), 2);
    assert_eq!(queries.cache().stats().unwrap().fetch_errors, 1);
}

#[tokio::test]
async fn test_failed_mutation_does_not_invalidate() {
    let (queries, backend, _clock) = setup();
    queries.list::<Subject>(&grade("10")).await.unwrap();

    let result = queries.delete(QueryResource::Subjects, "s-404").await;
    assert!(result.is_err());

    let read = queries.list::<Subject>(&grade("10")).await.unwrap();
    assert!(read.was_cache_hit());
    assert_eq!(backend.calls(Operation::List), 1);
}
