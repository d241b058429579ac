//! Activity Heartbeat Tests
//!
//! Runs the heartbeat task on a paused tokio clock and checks:
//! - the initial write happens right away
//! - interactions during a cooldown collapse into one deferred write
//! - writes never overlap, even when a write outlasts the cooldown
//! - quota refusals never surface at warn or error level
//! - dropping or shutting down the handle stops all further writes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use superate_client::{spawn_heartbeat, HeartbeatHandle, Interaction};
use superate_core::{ServiceError, SystemClock, UserId};
use superate_test_utils::RecordingActivityWriter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

const COOLDOWN: Duration = Duration::from_secs(300);

// ============================================================================
// TEST HELPERS
// ============================================================================

fn start(writer: &Arc<RecordingActivityWriter>) -> HeartbeatHandle {
    spawn_heartbeat(
        UserId::new("student-1"),
        writer.clone(),
        Arc::new(SystemClock),
        COOLDOWN,
    )
}

/// Let the paused clock run forward by `secs`, driving every ready task.
async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Counts events at warn level or above.
#[derive(Clone, Default)]
struct LoudEvents(Arc<AtomicUsize>);

impl LoudEvents {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for LoudEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// RATE LIMITING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_write_happens_immediately() {
    let writer = Arc::new(RecordingActivityWriter::new());
    let handle = start(&writer);

    advance(1).await;
    assert_eq!(writer.write_count(), 1);
    assert_eq!(writer.writes()[0].0, UserId::new("student-1"));
    assert!(handle.is_running());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interactions_in_one_cooldown_yield_one_deferred_write() {
    let writer = Arc::new(RecordingActivityWriter::new());
    let handle = start(&writer);
    advance(10).await;

    for interaction in [
        Interaction::Click,
        Interaction::Key,
        Interaction::Press,
        Interaction::Click,
        Interaction::Key,
    ] {
        handle.record(interaction);
    }

    // t = 299s: still inside the cooldown started by the initial write.
    advance(289).await;
    assert_eq!(writer.write_count(), 1);

    // t = 301s: the deferred write has fired, exactly once.
    advance(2).await;
    assert_eq!(writer.write_count(), 2);

    // No interactions since; the next cooldown ends without a write.
    advance(400).await;
    assert_eq!(writer.write_count(), 2);

    // Back to idle, so the next interaction writes straight away.
    handle.record(Interaction::Click);
    advance(1).await;
    assert_eq!(writer.write_count(), 3);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_steady_activity_writes_once_per_cooldown() {
    let writer = Arc::new(RecordingActivityWriter::new());
    let handle = start(&writer);

    // One click every 10 seconds for just under 15 minutes.
    for _ in 0..89 {
        advance(10).await;
        handle.record(Interaction::Click);
    }
    advance(20).await;

    // Initial write plus one deferred write per elapsed cooldown.
    assert_eq!(writer.write_count(), 1 + 900 / 300);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_writes_never_overlap() {
    let writer = Arc::new(RecordingActivityWriter::new().with_delay(Duration::from_secs(400)));
    let handle = start(&writer);

    for _ in 0..20 {
        advance(60).await;
        handle.record(Interaction::Key);
    }
    advance(2000).await;

    assert!(writer.write_count() >= 2);
    assert_eq!(writer.max_concurrent_writes(), 1);
    handle.shutdown().await;
}

// ============================================================================
// FAILURE HANDLING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_quota_refusals_stay_quiet() {
    let loud = LoudEvents::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(loud.clone()));

    let writer = Arc::new(RecordingActivityWriter::over_quota());
    let handle = start(&writer);
    for _ in 0..10 {
        advance(100).await;
        handle.record(Interaction::Press);
    }
    advance(400).await;

    assert!(writer.write_count() >= 3);
    assert_eq!(loud.count(), 0);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_are_logged_and_heartbeat_continues() {
    let loud = LoudEvents::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(loud.clone()));

    let writer = Arc::new(RecordingActivityWriter::new());
    writer.fail_with(ServiceError::Transport {
        operation: "update users".to_string(),
        reason: "connection reset".to_string(),
    });
    let handle = start(&writer);
    advance(1).await;
    assert_eq!(loud.count(), 1);

    handle.record(Interaction::Click);
    advance(300).await;
    assert_eq!(writer.write_count(), 2);
    assert!(handle.is_running());
    handle.shutdown().await;
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_cancels_deferred_write() {
    let writer = Arc::new(RecordingActivityWriter::new());
    let handle = start(&writer);
    advance(1).await;

    handle.record(Interaction::Click);
    advance(1).await;
    drop(handle);

    advance(3600).await;
    assert_eq!(writer.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_writes() {
    let writer = Arc::new(RecordingActivityWriter::new());
    let handle = start(&writer);
    advance(1).await;
    handle.record(Interaction::Key);
    advance(1).await;

    handle.shutdown().await;
    advance(3600).await;
    assert_eq!(writer.write_count(), 1);
}
