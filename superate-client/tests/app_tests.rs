//! Smoke tests for the wired client services.

use std::sync::Arc;
use std::time::Duration;

use superate_cache::{QueryKey, QueryResource};
use superate_client::{AppServices, HistoryNavigator, Interaction, Navigator};
use superate_core::{Role, Route, SystemClock};
use superate_test_utils::fixtures::{config_with_data_api, session_for, test_config};
use superate_test_utils::{MockDataService, Operation, RecordingActivityWriter};

struct Harness {
    app: AppServices,
    backend: Arc<MockDataService>,
    activity: Arc<RecordingActivityWriter>,
    navigator: Arc<HistoryNavigator>,
}

fn harness() -> Harness {
    let backend = Arc::new(MockDataService::new());
    let activity = Arc::new(RecordingActivityWriter::new());
    let navigator = Arc::new(HistoryNavigator::new(Route::Login));
    let app = AppServices::new(
        test_config(),
        backend.clone(),
        activity.clone(),
        navigator.clone(),
        Arc::new(SystemClock),
    );
    Harness {
        app,
        backend,
        activity,
        navigator,
    }
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_lands_on_role_dashboard() {
    let mut h = harness();
    h.app.start();

    h.app.sessions().sign_in(session_for(Role::Teacher));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.navigator.current(), Route::TeacherDashboard);
    assert_eq!(h.app.navigator().current(), Route::TeacherDashboard);

    h.app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_refresh_does_not_interrupt_quiz() {
    let mut h = harness();
    h.app.start();

    h.app.sessions().sign_in(session_for(Role::Student));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let quiz = Route::Quiz("algebra-1".into());
    h.app
        .route_guard()
        .navigate(quiz.clone(), &h.app.sessions().current())
        .unwrap();

    h.app.sessions().set_loading(true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.app.sessions().set_loading(false);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.navigator.current(), quiz);
    h.app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_active_sessions_refresh_runs_every_five_minutes() {
    let mut h = harness();
    h.app.start();

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(h.backend.calls(Operation::List), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.backend.calls(Operation::List), 1);
    let key = QueryKey::new(QueryResource::ActiveSessions);
    assert!(h.app.queries().cache().contains(&key).unwrap());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.backend.calls(Operation::List), 2);

    h.app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_spawns_nothing_new() {
    let mut h = harness();
    h.app.start();
    h.app.start();

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(h.backend.calls(Operation::List), 1);
    h.app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_uses_configured_cooldown() {
    let h = harness();
    let heartbeat = h.app.start_heartbeat(session_for(Role::Student).user_id);

    tokio::time::sleep(Duration::from_secs(1)).await;
    heartbeat.record(Interaction::Click);
    assert_eq!(h.activity.write_count(), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.activity.write_count(), 2);
    heartbeat.shutdown().await;
}

#[tokio::test]
async fn test_from_config_wires_rest_backend() {
    let app = AppServices::from_config(config_with_data_api("http://127.0.0.1:9/api/")).unwrap();
    assert_eq!(app.navigator().current(), Route::Home);
    assert!(!app.config().environment.is_production());
    app.shutdown().await;
}
