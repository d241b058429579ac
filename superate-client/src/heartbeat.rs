//! Rate-limited "last seen" activity heartbeat.
//!
//! User interactions feed a two-state machine:
//!
//! - `Idle` + interaction: write now, enter `CoolingDown`.
//! - `CoolingDown` + interaction: schedule one deferred write for the end of
//!   the cooldown; later interactions are coalesced into it.
//! - Cooldown ends: write the deferred timestamp and cool down again, or go
//!   back to `Idle` when nothing was deferred.
//!
//! One task owns the machine, its single timer and the writes. Writes are
//! awaited in order, so two writes never overlap.

use std::sync::Arc;
use std::time::Duration;

use superate_cache::BackgroundTask;
use superate_core::{ActivityWriter, Clock, UserId};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Buffered interactions; overflow is dropped since it would be coalesced anyway.
const INTERACTION_BUFFER: usize = 64;

/// Interaction kinds that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    Press,
    Click,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Idle,
    CoolingDown { since: Instant, deferred: bool },
}

/// What the owner of the machine should do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    WriteNow,
    Deferred,
    Ignored,
}

/// The pure heartbeat state machine.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    state: HeartbeatState,
    cooldown: Duration,
}

impl Heartbeat {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: HeartbeatState::Idle,
            cooldown,
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// The initial write, unconditional. Starts a cooldown.
    pub fn on_start(&mut self, now: Instant) -> HeartbeatAction {
        self.state = HeartbeatState::CoolingDown {
            since: now,
            deferred: false,
        };
        HeartbeatAction::WriteNow
    }

    pub fn on_interaction(&mut self, now: Instant) -> HeartbeatAction {
        match self.state {
            HeartbeatState::Idle => {
                self.state = HeartbeatState::CoolingDown {
                    since: now,
                    deferred: false,
                };
                HeartbeatAction::WriteNow
            }
            HeartbeatState::CoolingDown {
                since,
                deferred: false,
            } => {
                self.state = HeartbeatState::CoolingDown {
                    since,
                    deferred: true,
                };
                HeartbeatAction::Deferred
            }
            HeartbeatState::CoolingDown { deferred: true, .. } => HeartbeatAction::Ignored,
        }
    }

    /// When the armed timer fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            HeartbeatState::Idle => None,
            HeartbeatState::CoolingDown { since, .. } => Some(since + self.cooldown),
        }
    }

    pub fn on_timer(&mut self, now: Instant) -> HeartbeatAction {
        match self.state {
            HeartbeatState::CoolingDown { deferred: true, .. } => {
                self.state = HeartbeatState::CoolingDown {
                    since: now,
                    deferred: false,
                };
                HeartbeatAction::WriteNow
            }
            HeartbeatState::CoolingDown { deferred: false, .. } => {
                self.state = HeartbeatState::Idle;
                HeartbeatAction::Ignored
            }
            HeartbeatState::Idle => HeartbeatAction::Ignored,
        }
    }
}

/// Handle to a running heartbeat. Dropping it stops the heartbeat.
pub struct HeartbeatHandle {
    user: UserId,
    interactions: mpsc::Sender<Interaction>,
    task: BackgroundTask,
}

impl HeartbeatHandle {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Report a user interaction. Never blocks.
    pub fn record(&self, interaction: Interaction) {
        if self.interactions.try_send(interaction).is_err() {
            tracing::trace!(?interaction, "Heartbeat busy, interaction coalesced");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer and stop the task, letting an in-flight write finish.
    pub async fn shutdown(self) {
        self.task.shutdown().await;
    }
}

/// Start the heartbeat for `user`.
///
/// Performs the initial write right away, then rate-limits writes to one per
/// `cooldown`.
pub fn spawn_heartbeat(
    user: UserId,
    writer: Arc<dyn ActivityWriter>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
) -> HeartbeatHandle {
    let (tx, mut rx) = mpsc::channel(INTERACTION_BUFFER);
    let task_user = user.clone();

    let task = BackgroundTask::spawn("activity_heartbeat", move |mut shutdown_rx| async move {
        let user = task_user;
        let mut machine = Heartbeat::new(cooldown);

        tracing::info!(
            user_id = %user,
            cooldown_secs = cooldown.as_secs(),
            "Activity heartbeat started"
        );

        if machine.on_start(Instant::now()) == HeartbeatAction::WriteNow {
            write_last_seen(writer.as_ref(), clock.as_ref(), &user).await;
        }

        loop {
            let deadline = machine.deadline();
            let action = tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                received = rx.recv() => match received {
                    Some(interaction) => {
                        let action = machine.on_interaction(Instant::now());
                        tracing::trace!(?interaction, ?action, "Heartbeat interaction");
                        action
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    machine.on_timer(Instant::now())
                }
            };

            if action == HeartbeatAction::WriteNow {
                write_last_seen(writer.as_ref(), clock.as_ref(), &user).await;
            }
        }

        tracing::info!(user_id = %user, "Activity heartbeat stopped");
    });

    HeartbeatHandle {
        user,
        interactions: tx,
        task,
    }
}

async fn write_last_seen(writer: &dyn ActivityWriter, clock: &dyn Clock, user: &UserId) {
    match writer.record_last_seen(user, clock.utc_now()).await {
        Ok(()) => tracing::debug!(user_id = %user, "Last-seen timestamp recorded"),
        // Quota refusals repeat on every write; keep them out of warn/error.
        Err(err) if err.is_quota_exceeded() => {
            tracing::debug!(user_id = %user, "Activity write skipped, quota exceeded")
        }
        Err(err) => tracing::warn!(user_id = %user, error = %err, "Failed to record activity"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(300);

    #[test]
    fn test_idle_interaction_writes_now() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(COOLDOWN);
        assert_eq!(hb.on_interaction(now), HeartbeatAction::WriteNow);
        assert_eq!(hb.deadline(), Some(now + COOLDOWN));
    }

    #[test]
    fn test_interactions_during_cooldown_coalesce() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(COOLDOWN);
        hb.on_interaction(now);

        assert_eq!(
            hb.on_interaction(now + Duration::from_secs(10)),
            HeartbeatAction::Deferred
        );
        for s in 11..60 {
            assert_eq!(
                hb.on_interaction(now + Duration::from_secs(s)),
                HeartbeatAction::Ignored
            );
        }
        // Timer is not reset by later interactions.
        assert_eq!(hb.deadline(), Some(now + COOLDOWN));
    }

    #[test]
    fn test_timer_with_deferred_write_restarts_cooldown() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(COOLDOWN);
        hb.on_interaction(now);
        hb.on_interaction(now + Duration::from_secs(1));

        let fired = now + COOLDOWN;
        assert_eq!(hb.on_timer(fired), HeartbeatAction::WriteNow);
        assert_eq!(
            hb.state(),
            HeartbeatState::CoolingDown {
                since: fired,
                deferred: false
            }
        );
    }

    #[test]
    fn test_timer_without_deferred_write_returns_to_idle() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(COOLDOWN);
        hb.on_interaction(now);

        assert_eq!(hb.on_timer(now + COOLDOWN), HeartbeatAction::Ignored);
        assert_eq!(hb.state(), HeartbeatState::Idle);
        assert_eq!(hb.deadline(), None);
    }

    #[test]
    fn test_start_write_begins_cooldown() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(COOLDOWN);
        assert_eq!(hb.on_start(now), HeartbeatAction::WriteNow);
        assert_eq!(
            hb.on_interaction(now + Duration::from_secs(5)),
            HeartbeatAction::Deferred
        );
    }
}
