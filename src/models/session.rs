//! Completed focus sessions.
//!
//! Sessions are append-only history: they are written once when a countdown is stopped
//! or runs out, and never updated afterwards.

use serde::{Deserialize, Serialize};

/// A finished interval of focused work. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_minutes: u32,
    pub label: String,
}

impl FocusSession {
    pub fn new(
        id: String,
        start_time: i64,
        end_time: i64,
        duration_minutes: u32,
        label: String,
    ) -> Self {
        Self {
            id,
            start_time,
            // Clock skew must never produce an inverted interval.
            end_time: end_time.max(start_time),
            duration_minutes,
            label,
        }
    }
}
