use std::{sync::Arc, time::Duration};

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{clock::Clock, models::FocusSession, repository::Repository};

use super::state::{SessionDraft, TickOutcome, TimerState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("a focus session is already running")]
    AlreadyRunning,
    #[error("focus duration must be at least one minute")]
    InvalidDuration,
}

/// Lifecycle notifications for whoever is presenting the timer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Started {
        label: String,
        total_seconds: u32,
    },
    /// The countdown reached zero. `session` is the persisted record, if the write
    /// went through.
    Completed { session: Option<FocusSession> },
    /// Ended early by the user. `session` is `None` for sub-minute runs.
    Stopped { session: Option<FocusSession> },
}

#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    repository: Repository,
    clock: Arc<dyn Clock>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerController {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            repository,
            clock,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn start(&self, label: &str, minutes: u32) -> Result<TimerState, TimerError> {
        if minutes == 0 {
            return Err(TimerError::InvalidDuration);
        }

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.running {
                return Err(TimerError::AlreadyRunning);
            }
            state.begin(label.to_string(), minutes, self.clock.now_ms());
            state.clone()
        };

        self.spawn_ticker().await;

        log_info!("Focus started: \"{}\" for {} min", snapshot.label, minutes);
        let _ = self.events.send(TimerEvent::Started {
            label: snapshot.label.clone(),
            total_seconds: snapshot.total_seconds,
        });

        Ok(snapshot)
    }

    /// End the running countdown early. The ticker is torn down before any write so no
    /// tick can land after this returns.
    pub async fn stop(&self) -> Result<Option<FocusSession>> {
        let draft = {
            let mut state = self.state.lock().await;
            state.stop(self.clock.now_ms())
        };
        self.cancel_ticker().await;

        let session = match draft {
            Some(draft) => Some(persist(&self.repository, draft).await?),
            None => {
                log_debug!("Focus stopped before one minute; nothing recorded");
                None
            }
        };

        let _ = self.events.send(TimerEvent::Stopped {
            session: session.clone(),
        });
        Ok(session)
    }

    /// Abort the ticker without recording anything. Used on teardown.
    pub async fn shutdown(&self) {
        self.state.lock().await.reset();
        self.cancel_ticker().await;
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let repository = self.repository.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            // First tick one full period after start; `interval` would fire immediately.
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let draft = {
                    let mut guard = state.lock().await;
                    match guard.tick() {
                        TickOutcome::Continue => continue,
                        TickOutcome::Idle => break,
                        TickOutcome::Finished => guard.finish_naturally(clock.now_ms()),
                    }
                };

                // Detached so a racing stop() aborting this ticker cannot cut the write.
                tokio::spawn(async move {
                    let session = match draft {
                        Some(draft) => match persist(&repository, draft).await {
                            Ok(session) => Some(session),
                            Err(err) => {
                                log_error!("Failed to record completed session: {err:?}");
                                None
                            }
                        },
                        None => None,
                    };

                    log_info!("Focus completed");
                    let _ = events.send(TimerEvent::Completed { session });
                });
                break;
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

async fn persist(repository: &Repository, draft: SessionDraft) -> Result<FocusSession> {
    repository
        .record_session(
            draft.start_time,
            draft.end_time,
            draft.duration_minutes,
            &draft.label,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, store::MemoryStore};

    const T0: i64 = 1_700_000_000_000;

    fn controller() -> (TimerController, Repository, ManualClock) {
        let clock = ManualClock::new(T0);
        let repository = Repository::new(Arc::new(MemoryStore::new()));
        let controller = TimerController::new(
            repository.clone(),
            Arc::new(clock.clone()),
            Duration::from_secs(1),
        );
        (controller, repository, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_drops_one_per_second() {
        let (controller, _, _) = controller();
        controller.start("Reading", 5).await.expect("start");

        time::sleep(Duration::from_millis(10_500)).await;
        let state = controller.snapshot().await;
        assert_eq!(state.remaining_seconds, 300 - 10);
        assert!(state.running);
    }

    #[tokio::test(start_paused = true)]
    async fn natural_completion_records_exactly_one_session() {
        let (controller, repository, clock) = controller();
        let mut events = controller.subscribe();
        controller.start("Reading", 1).await.expect("start");
        clock.advance_ms(60_000);

        loop {
            match events.recv().await.expect("event") {
                TimerEvent::Completed { session } => {
                    assert!(session.is_some());
                    break;
                }
                _ => continue,
            }
        }

        let sessions = repository.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_minutes, 1);
        assert_eq!(sessions[0].start_time, T0);
        assert!(!controller.is_running().await);

        // No further ticks after completion.
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(repository.sessions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn early_stop_under_a_minute_records_nothing() {
        let (controller, repository, clock) = controller();
        controller.start("Reading", 25).await.expect("start");
        clock.advance_ms(45_000);

        assert_eq!(controller.stop().await.expect("stop"), None);
        assert!(repository.sessions().is_empty());
        assert!(!controller.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn early_stop_records_elapsed_minutes() {
        let (controller, repository, clock) = controller();
        controller.start("Reading", 25).await.expect("start");
        clock.advance_ms(61_000);

        let session = controller.stop().await.expect("stop").expect("session");
        assert_eq!(session.duration_minutes, 1);
        assert_eq!(repository.sessions(), vec![session]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_after_stop() {
        let (controller, _, _) = controller();
        controller.start("Reading", 25).await.expect("start");
        time::sleep(Duration::from_millis(3_500)).await;
        controller.stop().await.expect("stop");

        let frozen = controller.snapshot().await.remaining_seconds;
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.snapshot().await.remaining_seconds, frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_second_start_and_zero_minutes() {
        let (controller, _, _) = controller();
        assert_eq!(
            controller.start("Reading", 0).await,
            Err(TimerError::InvalidDuration)
        );
        controller.start("Reading", 25).await.expect("start");
        assert_eq!(
            controller.start("Writing", 25).await,
            Err(TimerError::AlreadyRunning)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_uses_a_single_ticker() {
        let (controller, _, _) = controller();
        controller.start("Reading", 25).await.expect("start");
        controller.stop().await.expect("stop");
        controller.start("Writing", 25).await.expect("restart");

        time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(controller.snapshot().await.remaining_seconds, 1500 - 4);
    }
}
