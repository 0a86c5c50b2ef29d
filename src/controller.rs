//! Top-level application state and the dashboard / timer view switch.
//!
//! `App` owns the repository, the timer and the periodic tasks. Everything it hands
//! out to projections is a read-only copy; the timer and the block form are the only
//! writers, and both go through the repository.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    db::Database,
    grid::{project_spans, project_week, week::to_zone, BlockForm, PlanError, Span, WeekGrid},
    models::{FocusBlock, FocusSession},
    repository::Repository,
    settings::SettingsStore,
    stats::{compute_stats, FocusStats},
    store::{SqliteStore, Store},
    tasks::PeriodicTask,
    timer::{format_clock, TimerController, TimerError, TimerEvent, TimerState},
    watcher::spawn_block_watcher,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Minutes a "Start Now" from the planned-block banner runs for.
pub const PLANNED_FOCUS_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub sessions: Vec<FocusSession>,
    pub blocks: Vec<FocusBlock>,
    pub active_block: Option<FocusBlock>,
    pub stats: FocusStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub label: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

impl TimerView {
    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

impl From<TimerState> for TimerView {
    fn from(state: TimerState) -> Self {
        Self {
            label: state.label,
            remaining_seconds: state.remaining_seconds,
            total_seconds: state.total_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum View {
    Dashboard(DashboardView),
    Timer(TimerView),
}

pub struct App {
    config: AppConfig,
    repository: Repository,
    timer: TimerController,
    settings: Arc<SettingsStore>,
    clock: Arc<dyn Clock>,
    active_block: watch::Receiver<Option<FocusBlock>>,
    grid_now: watch::Receiver<i64>,
    grid_now_tx: Arc<watch::Sender<i64>>,
    tasks: Vec<PeriodicTask>,
}

impl App {
    /// Open the SQLite-backed store and settings under `config.data_dir`.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let database = Database::new(config.database_path())?;
        let store = SqliteStore::open(database).await?;
        let settings = SettingsStore::new(config.settings_path())?;
        Ok(Self::with_store(
            config,
            Arc::new(store),
            settings,
            Arc::new(SystemClock),
        ))
    }

    /// Wire the app over an existing store. Must run inside a Tokio runtime since the
    /// periodic tasks start immediately.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn Store>,
        settings: SettingsStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let repository = Repository::new(store);
        let timer = TimerController::new(repository.clone(), clock.clone(), config.tick_interval());
        let settings = Arc::new(settings);

        // An active block becomes the label the next focus form starts from.
        let (watcher_task, active_block) = {
            let settings = settings.clone();
            spawn_block_watcher(
                repository.clone(),
                clock.clone(),
                config.watcher_period(),
                move |block| {
                    if let Err(err) = settings.set_last_label(&block.label) {
                        log_warn!("Failed to remember block label: {err:?}");
                    }
                },
            )
        };

        let (grid_now_tx, grid_now) = watch::channel(clock.now_ms());
        let grid_now_tx = Arc::new(grid_now_tx);
        let clock_task = {
            let tx = grid_now_tx.clone();
            let clock = clock.clone();
            PeriodicTask::spawn("clock refresh", config.clock_refresh(), move || {
                tx.send_replace(clock.now_ms());
                async {}
            })
        };

        log_info!(
            "Focus app ready ({} sessions, {} blocks)",
            repository.sessions().len(),
            repository.blocks().len()
        );

        Self {
            config,
            repository,
            timer,
            settings,
            clock,
            active_block,
            grid_now,
            grid_now_tx,
            tasks: vec![watcher_task, clock_task],
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn subscribe_timer(&self) -> broadcast::Receiver<TimerEvent> {
        self.timer.subscribe()
    }

    pub fn active_block(&self) -> Option<FocusBlock> {
        self.active_block.borrow().clone()
    }

    pub fn last_label(&self) -> String {
        self.settings.last_label()
    }

    /// The timer view while a countdown runs, the dashboard otherwise.
    pub async fn view(&self) -> View {
        let state = self.timer.snapshot().await;
        if state.running {
            return View::Timer(state.into());
        }

        let sessions = self.repository.sessions();
        let stats = compute_stats(&sessions, &local_now(self.clock.now_ms()));
        View::Dashboard(DashboardView {
            sessions,
            blocks: self.repository.blocks(),
            active_block: self.active_block(),
            stats,
        })
    }

    pub async fn start_focus(&self, label: &str, minutes: u32) -> Result<TimerState, TimerError> {
        let state = self.timer.start(label, minutes).await?;
        if let Err(err) = self.settings.set_last_label(&state.label) {
            log_warn!("Failed to remember last label: {err:?}");
        }
        Ok(state)
    }

    pub async fn start_default_focus(&self) -> Result<TimerState, TimerError> {
        let label = self.settings.last_label();
        self.start_focus(&label, self.config.default_minutes).await
    }

    /// "Start Now" on the planned-block banner. `None` when no block is active.
    pub async fn start_active_block(&self) -> Result<Option<TimerState>, TimerError> {
        match self.active_block() {
            Some(block) => self
                .start_focus(&block.label, PLANNED_FOCUS_MINUTES)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// End the running countdown and return to the dashboard. A failed write is logged
    /// and otherwise dropped.
    pub async fn stop_focus(&self) -> Option<FocusSession> {
        match self.timer.stop().await {
            Ok(session) => session,
            Err(err) => {
                log_error!("Failed to record stopped session: {err:?}");
                None
            }
        }
    }

    /// Re-read the clock for grid purposes without waiting for the next refresh.
    pub fn refresh_now(&self) {
        self.grid_now_tx.send_replace(self.clock.now_ms());
    }

    pub fn week_grid(&self) -> WeekGrid {
        let now = local_now(*self.grid_now.borrow());
        project_week(
            &now,
            &self.repository.sessions(),
            &self.repository.blocks(),
            &self.config.geometry(),
        )
    }

    pub fn week_spans(&self) -> Vec<Span> {
        let now = local_now(*self.grid_now.borrow());
        project_spans(
            &now,
            &self.repository.sessions(),
            &self.repository.blocks(),
            &self.config.geometry(),
        )
    }

    /// Open the planning form for a grid cell. Past slots are refused.
    pub fn open_slot(&self, day_index: usize, hour: u32) -> Result<BlockForm, PlanError> {
        let grid = self.week_grid();
        let slot = grid
            .slot(day_index, hour)
            .ok_or(PlanError::UnknownSlot { day_index, hour })?;
        BlockForm::for_slot(
            slot,
            self.clock.now_ms(),
            &self.repository.blocks(),
            &self.settings.last_label(),
        )
    }

    pub async fn save_block(&self, form: &BlockForm) -> Result<FocusBlock, PlanError> {
        form.save(&self.repository).await
    }

    pub async fn delete_block(&self, id: &str) -> Result<()> {
        self.repository.delete_block(id).await
    }

    /// Cancel every periodic task and the countdown.
    pub async fn shutdown(self) {
        self.timer.shutdown().await;
        for task in self.tasks {
            let name = task.name();
            task.stop().await;
            log_info!("Stopped {name}");
        }
    }
}

fn local_now(now_ms: i64) -> DateTime<Local> {
    to_zone(&Local, now_ms).unwrap_or_else(Local::now)
}
