use serde::{Deserialize, Serialize};

use super::HOUR_MS;

/// Fixed span of every planned block.
pub const BLOCK_SPAN_MS: i64 = HOUR_MS;

/// A planned focus interval on the weekly grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusBlock {
    pub id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub label: String,
}

impl FocusBlock {
    /// Builds a block spanning one hour from `start_time`.
    pub fn planned(id: String, start_time: i64, label: String) -> Self {
        Self {
            id,
            start_time,
            end_time: start_time + BLOCK_SPAN_MS,
            label,
        }
    }

    /// Half-open containment: `[start_time, end_time)`.
    pub fn contains(&self, at_ms: i64) -> bool {
        at_ms >= self.start_time && at_ms < self.end_time
    }
}
