use serde::{Deserialize, Serialize};

use crate::models::MINUTE_MS;

pub const DEFAULT_LABEL: &str = "Deep Work";
pub const DEFAULT_MINUTES: u32 = 60;

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down.
    Continue,
    /// The countdown just reached zero.
    Finished,
    /// Nothing to do; the timer is not running.
    Idle,
}

/// A session ready to be written, produced when a countdown ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub start_time: i64,
    pub end_time: i64,
    pub duration_minutes: u32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub label: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub running: bool,
    /// Epoch milliseconds at which the current countdown began.
    pub started_at: Option<i64>,
}

impl Default for TimerState {
    fn default() -> Self {
        let total_seconds = DEFAULT_MINUTES * 60;
        Self {
            label: DEFAULT_LABEL.to_string(),
            remaining_seconds: total_seconds,
            total_seconds,
            running: false,
            started_at: None,
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, label: String, minutes: u32, now_ms: i64) {
        let total_seconds = minutes.saturating_mul(60);
        *self = Self {
            label,
            remaining_seconds: total_seconds,
            total_seconds,
            running: true,
            started_at: Some(now_ms),
        };
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_seconds == 0 {
            return TickOutcome::Idle;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            TickOutcome::Finished
        } else {
            TickOutcome::Continue
        }
    }

    /// Close out a countdown that ran to zero. The recorded duration is the planned
    /// one, matching sessions already in history.
    pub fn finish_naturally(&mut self, now_ms: i64) -> Option<SessionDraft> {
        if !self.running {
            return None;
        }

        let draft = self.started_at.map(|start_time| SessionDraft {
            start_time,
            end_time: now_ms,
            duration_minutes: self.total_seconds / 60,
            label: self.label.clone(),
        });
        self.reset();
        draft
    }

    /// End the countdown early. Anything shorter than a whole minute is discarded.
    pub fn stop(&mut self, now_ms: i64) -> Option<SessionDraft> {
        let draft = match (self.running, self.started_at) {
            (true, Some(start_time)) => {
                let elapsed_minutes = (now_ms - start_time).max(0) / MINUTE_MS;
                (elapsed_minutes >= 1).then(|| SessionDraft {
                    start_time,
                    end_time: now_ms,
                    duration_minutes: u32::try_from(elapsed_minutes).unwrap_or(u32::MAX),
                    label: self.label.clone(),
                })
            }
            _ => None,
        };
        self.reset();
        draft
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.started_at = None;
    }

    /// "MM:SS"; minutes are not wrapped into hours.
    pub fn format_clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }

    /// Fraction of the countdown still remaining, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        f64::from(self.remaining_seconds) / f64::from(self.total_seconds)
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn begin_sets_total_and_remaining() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 25, T0);

        assert_eq!(state.total_seconds, 1500);
        assert_eq!(state.remaining_seconds, 1500);
        assert!(state.running);
        assert_eq!(state.started_at, Some(T0));
    }

    #[test]
    fn ticks_count_down_by_one_second() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 2, T0);
        for _ in 0..45 {
            assert_eq!(state.tick(), TickOutcome::Continue);
        }
        assert_eq!(state.remaining_seconds, 120 - 45);
    }

    #[test]
    fn last_tick_reports_finished() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 1, T0);
        let outcomes: Vec<_> = (0..60).map(|_| state.tick()).collect();
        assert_eq!(outcomes.last(), Some(&TickOutcome::Finished));
        assert_eq!(state.tick(), TickOutcome::Idle);
    }

    #[test]
    fn natural_finish_records_planned_minutes() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 25, T0);
        let draft = state
            .finish_naturally(T0 + 25 * 60_000 + 700)
            .expect("draft");

        assert_eq!(draft.duration_minutes, 25);
        assert_eq!(draft.start_time, T0);
        assert!(!state.running);
        assert_eq!(state.started_at, None);
    }

    #[test]
    fn stop_discards_sub_minute_sessions() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 25, T0);
        assert_eq!(state.stop(T0 + 45_000), None);
        assert!(!state.running);
    }

    #[test]
    fn stop_records_whole_elapsed_minutes() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 25, T0);
        let draft = state.stop(T0 + 61_000).expect("draft");

        assert_eq!(draft.duration_minutes, 1);
        assert_eq!(draft.end_time, T0 + 61_000);
        assert_eq!(draft.label, "Reading");
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let mut state = TimerState::new();
        assert_eq!(state.stop(T0), None);
    }

    #[test]
    fn clock_format_and_progress() {
        let mut state = TimerState::new();
        state.begin("Reading".into(), 90, T0);
        assert_eq!(state.format_clock(), "90:00");
        state.tick();
        assert_eq!(state.format_clock(), "89:59");
        assert!((state.progress() - 5399.0 / 5400.0).abs() < f64::EPSILON);
        assert_eq!(format_clock(5), "00:05");
    }
}
