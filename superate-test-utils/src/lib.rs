//! Supérate.IA Test Utilities
//!
//! Shared test infrastructure for the Supérate.IA workspace:
//! - In-memory backend and activity writer with failure injection
//! - Proptest generators for sessions, routes and quiz questions
//! - Fixtures for common scenarios
//! - Assertions for Supérate-specific errors

pub use superate_cache::{CachePolicy, QueryClient, QueryKey, QueryResource};
pub use superate_core::{
    ActivityWriter, AuthState, Clock, ConfigError, DataService, ManualClock, Question, Role,
    Route, ServiceError, Session, SuperateConfig, SuperateError, SuperateResult, UserId,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// MOCK BACKEND
// ============================================================================

/// Backend operation, for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// In-memory [`DataService`].
///
/// Documents live per collection as JSON objects with an `"id"` field. List
/// filters match top-level fields by their string form.
#[derive(Debug, Default)]
pub struct MockDataService {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<HashMap<Operation, usize>>,
    failure: Mutex<Option<ServiceError>>,
    next_id: AtomicUsize,
}

impl MockDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection, replacing its current documents.
    pub fn with_documents(self, collection: &str, documents: Vec<Value>) -> Self {
        lock(&self.collections).insert(collection.to_string(), documents);
        self
    }

    /// Make every following call fail with `error` until [`Self::recover`].
    pub fn fail_with(&self, error: ServiceError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self, operation: Operation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    pub fn documents(&self, collection: &str) -> Vec<Value> {
        lock(&self.collections)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, operation: Operation) -> SuperateResult<()> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match lock(&self.failure).clone() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

fn field_matches(doc: &Value, field: &str, expected: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn list(
        &self,
        collection: &str,
        filter: &[(String, String)],
    ) -> SuperateResult<Vec<Value>> {
        self.begin(Operation::List)?;
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|doc| filter.iter().all(|(f, v)| field_matches(doc, f, v)))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> SuperateResult<Option<Value>> {
        self.begin(Operation::Get)?;
        Ok(self
            .documents(collection)
            .into_iter()
            .find(|doc| doc_id(doc) == Some(id)))
    }

    async fn create(&self, collection: &str, document: Value) -> SuperateResult<String> {
        self.begin(Operation::Create)?;
        let mut fields = match document {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        fields.insert("id".to_string(), Value::String(id.clone()));
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .push(Value::Object(fields));
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> SuperateResult<()> {
        self.begin(Operation::Update)?;
        let mut collections = lock(&self.collections);
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc_id(doc) == Some(id)))
            .ok_or_else(|| ServiceError::NotFound {
                resource: collection.to_string(),
                id: id.to_string(),
            })?;
        if let (Value::Object(target), Value::Object(fields)) = (doc, patch) {
            target.extend(fields);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SuperateResult<()> {
        self.begin(Operation::Delete)?;
        let mut collections = lock(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();
        let before = docs.len();
        docs.retain(|doc| doc_id(doc) != Some(id));
        if docs.len() == before {
            return Err(ServiceError::NotFound {
                resource: collection.to_string(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// MOCK ACTIVITY WRITER
// ============================================================================

/// [`ActivityWriter`] that records every write.
///
/// Failed writes are recorded too, so tests can count attempts. An optional
/// delay keeps each write in flight for a while, which lets tests observe
/// whether writes ever overlap.
#[derive(Debug, Default)]
pub struct RecordingActivityWriter {
    writes: Mutex<Vec<(UserId, DateTime<Utc>)>>,
    failure: Mutex<Option<ServiceError>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingActivityWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep each write pending for `delay` (tokio time).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Refuse every write with a quota error.
    pub fn over_quota() -> Self {
        let writer = Self::new();
        writer.fail_with(ServiceError::QuotaExceeded {
            operation: "update users".to_string(),
        });
        writer
    }

    pub fn fail_with(&self, error: ServiceError) {
        *lock(&self.failure) = Some(error);
    }

    /// Number of attempted writes.
    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }

    pub fn writes(&self) -> Vec<(UserId, DateTime<Utc>)> {
        lock(&self.writes).clone()
    }

    /// Highest number of writes ever in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityWriter for RecordingActivityWriter {
    async fn record_last_seen(&self, user: &UserId, at: DateTime<Utc>) -> SuperateResult<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        lock(&self.writes).push((user.clone(), at));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match lock(&self.failure).clone() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Supérate types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::all().to_vec())
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        "[a-zA-Z0-9]{8,28}".prop_map(UserId::new)
    }

    pub fn arb_session() -> impl Strategy<Value = Session> {
        (arb_user_id(), prop::option::of(arb_role()))
            .prop_map(|(user_id, role)| Session::new(user_id, role))
    }

    /// Any auth state, including loading and signed-out ones.
    pub fn arb_auth_state() -> impl Strategy<Value = AuthState> {
        prop_oneof![
            Just(AuthState::loading()),
            Just(AuthState::signed_out()),
            arb_session().prop_map(AuthState::signed_in),
            (arb_session(), any::<bool>()).prop_map(|(mut session, authenticated)| {
                session.authenticated = authenticated;
                AuthState {
                    session: Some(session),
                    loading: false,
                }
            }),
        ]
    }

    pub fn arb_route() -> impl Strategy<Value = Route> {
        prop_oneof![
            Just(Route::Home),
            Just(Route::Dashboard),
            Just(Route::TeacherDashboard),
            Just(Route::PrincipalDashboard),
            Just(Route::AdminDashboard),
            Just(Route::Login),
            Just(Route::Register),
            Just(Route::About),
            Just(Route::AdaptiveRoute),
            Just(Route::StudyPlan),
            "[a-z0-9-]{1,16}".prop_map(Route::Quiz),
        ]
    }

    /// A question list whose groups are contiguous, as the backend stores them.
    ///
    /// Each block is either a lone question or a group of 2 to 4 questions
    /// sharing a key.
    pub fn arb_question_list() -> impl Strategy<Value = Vec<Question>> {
        prop::collection::vec(prop_oneof![Just(1usize), 2usize..=4], 0..8).prop_map(|blocks| {
            let mut questions = Vec::new();
            for (block, size) in blocks.into_iter().enumerate() {
                for i in 0..size {
                    let id = format!("q-{}-{}", block, i);
                    let question = Question::new(id.clone(), format!("Question {}", id));
                    if size > 1 {
                        questions.push(question.with_group(format!("passage-{}", block)));
                    } else {
                        questions.push(question);
                    }
                }
            }
            questions
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::*;
    use serde_json::json;

    /// Minimal valid configuration, development environment.
    pub const CONFIG_TOML: &str = r#"
environment = "development"
request_timeout_ms = 5000

[endpoints.development]
data_api_url = "http://localhost:8080/api"
auth_url = "http://localhost:9099"
ai_url = "http://localhost:8081"

[endpoints.production]
data_api_url = "https://api.superate.ia"
auth_url = "https://auth.superate.ia"
ai_url = "https://ai.superate.ia"

[credentials]
api_key = "test-api-key"
project_id = "superate-test"
"#;

    pub fn test_config() -> SuperateConfig {
        SuperateConfig::from_toml_str(CONFIG_TOML).expect("fixture config parses")
    }

    /// Test config pointing the development data API at `url`.
    pub fn config_with_data_api(url: &str) -> SuperateConfig {
        let mut config = test_config();
        config.endpoints.development.data_api_url = url.to_string();
        config
    }

    pub fn session_for(role: Role) -> Session {
        Session::new(UserId::new(format!("{}-1", role.as_str())), Some(role))
    }

    pub fn signed_in(role: Role) -> AuthState {
        AuthState::signed_in(session_for(role))
    }

    /// Signed in, but the profile has no role yet.
    pub fn signed_in_without_role() -> AuthState {
        AuthState::signed_in(Session::new(UserId::new("new-user"), None))
    }

    /// Eight questions: a lone one, a three-question reading passage, a
    /// lone one, a two-question chart group, and one more lone question.
    pub fn reading_comprehension_quiz() -> Vec<Question> {
        vec![
            Question::new("q1", "¿Cuánto es 7 x 8?"),
            Question::new("q2", "¿Cuál es la idea principal?").with_group("lectura-1"),
            Question::new("q3", "¿Qué significa 'efímero'?").with_group("lectura-1"),
            Question::new("q4", "¿Qué concluye el autor?").with_group("lectura-1"),
            Question::new("q5", "¿Capital de Colombia?"),
            Question::new("q6", "¿Qué año tuvo más ventas?").with_group("grafica-1"),
            Question::new("q7", "¿Cuál es la tendencia?").with_group("grafica-1"),
            Question::new("q8", "¿Qué es la fotosíntesis?"),
        ]
    }

    pub fn subject(id: &str, name: &str, grade: &str) -> Value {
        json!({ "id": id, "name": name, "grade": grade })
    }

    /// A backend seeded with a few subjects across two grades.
    pub fn seeded_backend() -> MockDataService {
        MockDataService::new().with_documents(
            QueryResource::Subjects.collection(),
            vec![
                subject("s-1", "Matemáticas", "10"),
                subject("s-2", "Lenguaje", "10"),
                subject("s-3", "Ciencias Naturales", "11"),
            ],
        )
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Supérate-specific error variants.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &SuperateResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_quota_exceeded<T: std::fmt::Debug>(result: &SuperateResult<T>) {
        match result {
            Err(err) if err.is_quota_exceeded() => {}
            other => panic!("Expected quota error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_service_error<T: std::fmt::Debug>(result: &SuperateResult<T>) {
        match result {
            Err(SuperateError::Service(_)) => {}
            other => panic!("Expected Service error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &Result<T, ConfigError>) {
        assert!(result.is_err(), "Expected ConfigError, got: {:?}", result);
    }
}
