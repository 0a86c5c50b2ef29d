//! Dashboard aggregates over session history.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::Serialize;

use crate::{grid::week::to_zone, models::FocusSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    pub total_minutes: u64,
    pub session_count: usize,
    pub daily_streak: u32,
}

impl FocusStats {
    pub fn total_hours(&self) -> f64 {
        self.total_minutes as f64 / 60.0
    }

    /// Hours with one decimal, e.g. "12.5h".
    pub fn total_hours_label(&self) -> String {
        format!("{:.1}h", self.total_hours())
    }
}

pub fn compute_stats<Tz: TimeZone>(sessions: &[FocusSession], now: &DateTime<Tz>) -> FocusStats {
    FocusStats {
        total_minutes: sessions
            .iter()
            .map(|session| u64::from(session.duration_minutes))
            .sum(),
        session_count: sessions.len(),
        daily_streak: daily_streak(sessions, now),
    }
}

/// Consecutive local days with at least one session, counting back from today. A day
/// with nothing yet does not break a streak that ran through yesterday.
pub fn daily_streak<Tz: TimeZone>(sessions: &[FocusSession], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let active_days: HashSet<NaiveDate> = sessions
        .iter()
        .filter_map(|session| to_zone(&tz, session.start_time))
        .map(|at| at.date_naive())
        .collect();

    let today = now.date_naive();
    let mut day = if active_days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while active_days.contains(&day) {
        streak += 1;
        day = day - Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn on_day(day: u32, minutes: u32) -> FocusSession {
        let start = Utc
            .with_ymd_and_hms(2026, 10, day, 9, 0, 0)
            .single()
            .expect("valid time")
            .timestamp_millis();
        FocusSession::new(
            format!("s{day}-{minutes}"),
            start,
            start + i64::from(minutes) * 60_000,
            minutes,
            "Deep Work".into(),
        )
    }

    #[test]
    fn totals_sum_recorded_minutes() {
        let sessions = vec![on_day(14, 50), on_day(15, 25), on_day(15, 95)];
        let stats = compute_stats(&sessions, &now());

        assert_eq!(stats.total_minutes, 170);
        assert_eq!(stats.session_count, 3);
        assert_eq!(stats.total_hours_label(), "2.8h");
    }

    #[test]
    fn empty_history() {
        let stats = compute_stats(&[], &now());
        assert_eq!(stats.total_minutes, 0);
        assert_eq!(stats.total_hours_label(), "0.0h");
        assert_eq!(stats.daily_streak, 0);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let sessions = vec![on_day(16, 30), on_day(15, 30), on_day(14, 30), on_day(12, 30)];
        assert_eq!(daily_streak(&sessions, &now()), 3);
    }

    #[test]
    fn streak_survives_an_empty_today() {
        let sessions = vec![on_day(15, 30), on_day(14, 30)];
        assert_eq!(daily_streak(&sessions, &now()), 2);
    }

    #[test]
    fn streak_breaks_after_a_missed_day() {
        let sessions = vec![on_day(14, 30), on_day(13, 30)];
        assert_eq!(daily_streak(&sessions, &now()), 0);
    }
}
