//! Background cache tasks: periodic forced refresh and garbage collection.
//!
//! Both tasks tick on a `tokio::time::interval` and stop on a watch-channel
//! shutdown signal. Dropping the [`BackgroundTask`] handle aborts the task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::{CachePolicy, QueryClient, QueryFetcher, QueryKey};

/// Handle owning a spawned background task.
#[must_use = "the task is aborted as soon as the handle is dropped"]
pub struct BackgroundTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Spawn `run` with a fresh shutdown channel.
    pub fn spawn<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(shutdown_rx));
        Self {
            name,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal shutdown and wait for the task to finish its current tick.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(task = self.name, error = %err, "Background task panicked");
                }
            }
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Returns true once shutdown was requested or the sender is gone.
fn shutdown_requested(
    changed: Result<(), watch::error::RecvError>,
    rx: &watch::Receiver<bool>,
) -> bool {
    changed.is_err() || *rx.borrow()
}

/// Re-fetch `key` every `period`, overwriting the entry regardless of staleness.
///
/// The first refresh happens one full period after spawning. Failures are
/// logged by the client and retried on the next tick only.
pub fn spawn_periodic_refresh<T, F>(
    client: QueryClient,
    key: QueryKey,
    policy: CachePolicy,
    period: Duration,
    fetcher: Arc<F>,
) -> BackgroundTask
where
    T: Serialize + Send + 'static,
    F: QueryFetcher<T> + ?Sized + 'static,
{
    BackgroundTask::spawn("periodic_refresh", move |mut shutdown_rx| async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            key = %key,
            period_secs = period.as_secs(),
            "Periodic query refresh started"
        );

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if shutdown_requested(changed, &shutdown_rx) {
                        tracing::info!(key = %key, "Periodic query refresh shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Failure already logged by the client.
                    let _ = client.refresh::<T, F>(&key, &policy, fetcher.as_ref()).await;
                }
            }
        }
    })
}

/// Refresh `key` on the interval its policy declares, if any.
pub fn spawn_policy_refresh<T, F>(
    client: QueryClient,
    key: QueryKey,
    policy: CachePolicy,
    fetcher: Arc<F>,
) -> Option<BackgroundTask>
where
    T: Serialize + Send + 'static,
    F: QueryFetcher<T> + ?Sized + 'static,
{
    let period = policy.refetch_interval()?;
    Some(spawn_periodic_refresh(client, key, policy, period, fetcher))
}

/// Run [`QueryClient::collect_garbage`] every `period`.
pub fn spawn_garbage_collector(client: QueryClient, period: Duration) -> BackgroundTask {
    BackgroundTask::spawn("cache_gc", move |mut shutdown_rx| async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(period_secs = period.as_secs(), "Cache garbage collector started");

        let mut total_removed = 0usize;
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if shutdown_requested(changed, &shutdown_rx) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match client.collect_garbage() {
                        Ok(removed) => total_removed += removed,
                        Err(err) => tracing::error!(error = %err, "Cache garbage collection failed"),
                    }
                }
            }
        }

        tracing::info!(total_removed, "Cache garbage collector stopped");
    })
}
