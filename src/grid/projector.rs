//! Projects sessions and blocks onto the 7 x 24 weekly grid.
//!
//! Two projections are offered. [`project_week`] buckets records into hour slots by
//! their start time. [`project_spans`] places each record at a continuous vertical
//! offset. In both, a real session hides any plan it overlaps.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::Serialize;

use crate::models::{FocusBlock, FocusSession, HOUR_MS};

use super::week::{slot_bounds, to_zone, week_dates, DAYS_PER_WEEK, DAY_NAMES, HOURS_PER_DAY};

pub const DEFAULT_CELL_HEIGHT: f64 = 48.0;

/// Vertical geometry of one day column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridGeometry {
    pub cell_height: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_height: DEFAULT_CELL_HEIGHT,
        }
    }
}

impl GridGeometry {
    pub fn new(cell_height: f64) -> Self {
        Self { cell_height }
    }

    /// Offset of a wall-clock time from the top of its day column.
    pub fn offset_for<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> f64 {
        (f64::from(at.hour()) + f64::from(at.minute()) / 60.0) * self.cell_height
    }

    pub fn height_for_minutes(&self, minutes: f64) -> f64 {
        minutes / 60.0 * self.cell_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotTiming {
    Past,
    Current,
    Future,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SlotContent {
    Empty,
    #[serde(rename_all = "camelCase")]
    Session {
        /// Label of the earliest session in the hour.
        label: String,
        session_ids: Vec<String>,
        total_minutes: u64,
        /// Opacity scalar in `0.0..=1.0`: an hour's worth of focus saturates it.
        intensity: f64,
    },
    #[serde(rename_all = "camelCase")]
    Planned { block_id: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub day_index: usize,
    pub hour: u32,
    pub start_time: i64,
    pub end_time: i64,
    pub timing: SlotTiming,
    pub content: SlotContent,
}

impl Slot {
    /// Only slots that have not yet ended accept new plans.
    pub fn is_clickable(&self) -> bool {
        self.timing != SlotTiming::Past
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayColumn {
    pub date: NaiveDate,
    pub name: &'static str,
    pub is_today: bool,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowIndicator {
    pub day_index: usize,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub days: Vec<DayColumn>,
    pub now: Option<NowIndicator>,
}

impl WeekGrid {
    pub fn slot(&self, day_index: usize, hour: u32) -> Option<&Slot> {
        self.days.get(day_index)?.slots.get(hour as usize)
    }

    pub fn today_index(&self) -> Option<usize> {
        self.now.map(|indicator| indicator.day_index)
    }
}

/// Locate the `(day_index, hour)` cell a timestamp falls in, if it is inside `week`.
fn cell_of<Tz: TimeZone>(
    tz: &Tz,
    week: &[NaiveDate; DAYS_PER_WEEK],
    ms: i64,
) -> Option<(usize, u32)> {
    let at = to_zone(tz, ms)?;
    let day_index = week.iter().position(|date| *date == at.date_naive())?;
    Some((day_index, at.hour()))
}

fn timing_for(start: i64, end: i64, now_ms: i64) -> SlotTiming {
    if end <= now_ms {
        SlotTiming::Past
    } else if start <= now_ms {
        SlotTiming::Current
    } else {
        SlotTiming::Future
    }
}

fn now_indicator<Tz: TimeZone>(
    now: &DateTime<Tz>,
    week: &[NaiveDate; DAYS_PER_WEEK],
    geometry: &GridGeometry,
) -> Option<NowIndicator> {
    let day_index = week.iter().position(|date| *date == now.date_naive())?;
    Some(NowIndicator {
        day_index,
        offset: geometry.offset_for(now),
    })
}

/// Hour-bucketed view of the week containing `now`.
pub fn project_week<Tz: TimeZone>(
    now: &DateTime<Tz>,
    sessions: &[FocusSession],
    blocks: &[FocusBlock],
    geometry: &GridGeometry,
) -> WeekGrid {
    let tz = now.timezone();
    let now_ms = now.timestamp_millis();
    let week = week_dates(now.date_naive());

    let mut session_cells: HashMap<(usize, u32), Vec<&FocusSession>> = HashMap::new();
    for session in sessions {
        if let Some(cell) = cell_of(&tz, &week, session.start_time) {
            session_cells.entry(cell).or_default().push(session);
        }
    }

    let mut block_cells: HashMap<(usize, u32), Vec<&FocusBlock>> = HashMap::new();
    for block in blocks {
        if let Some(cell) = cell_of(&tz, &week, block.start_time) {
            block_cells.entry(cell).or_default().push(block);
        }
    }

    let days = week
        .iter()
        .enumerate()
        .map(|(day_index, date)| {
            let slots = (0..HOURS_PER_DAY)
                .filter_map(|hour| {
                    let (start_time, end_time) = slot_bounds(&tz, *date, hour)?;
                    let cell = (day_index, hour);
                    let content = match (session_cells.get_mut(&cell), block_cells.get_mut(&cell)) {
                        (Some(hour_sessions), _) => session_content(hour_sessions),
                        (None, Some(hour_blocks)) => block_content(hour_blocks),
                        (None, None) => SlotContent::Empty,
                    };

                    Some(Slot {
                        day_index,
                        hour,
                        start_time,
                        end_time,
                        timing: timing_for(start_time, end_time, now_ms),
                        content,
                    })
                })
                .collect();

            DayColumn {
                date: *date,
                name: DAY_NAMES[day_index],
                is_today: *date == now.date_naive(),
                slots,
            }
        })
        .collect();

    WeekGrid {
        days,
        now: now_indicator(now, &week, geometry),
    }
}

fn session_content(hour_sessions: &mut [&FocusSession]) -> SlotContent {
    hour_sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    let total_minutes: u64 = hour_sessions
        .iter()
        .map(|s| u64::from(s.duration_minutes))
        .sum();

    SlotContent::Session {
        label: hour_sessions[0].label.clone(),
        session_ids: hour_sessions.iter().map(|s| s.id.clone()).collect(),
        total_minutes,
        intensity: (total_minutes as f64 / 60.0).min(1.0),
    }
}

fn block_content(hour_blocks: &mut [&FocusBlock]) -> SlotContent {
    hour_blocks.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    SlotContent::Planned {
        block_id: hour_blocks[0].id.clone(),
        label: hour_blocks[0].label.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpanKind {
    Session,
    Planned,
}

/// A record positioned continuously within its day column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub kind: SpanKind,
    pub id: String,
    pub label: String,
    pub day_index: usize,
    pub top: f64,
    pub height: f64,
    pub start_time: i64,
    pub end_time: i64,
}

/// Continuously positioned view of the week containing `now`. Blocks with a session
/// starting inside `[start_time, end_time)` are left out.
pub fn project_spans<Tz: TimeZone>(
    now: &DateTime<Tz>,
    sessions: &[FocusSession],
    blocks: &[FocusBlock],
    geometry: &GridGeometry,
) -> Vec<Span> {
    let tz = now.timezone();
    let week = week_dates(now.date_naive());

    let locate = |ms: i64| -> Option<(usize, f64)> {
        let at = to_zone(&tz, ms)?;
        let day_index = week.iter().position(|date| *date == at.date_naive())?;
        Some((day_index, geometry.offset_for(&at)))
    };

    let session_spans = sessions.iter().filter_map(|session| {
        let (day_index, top) = locate(session.start_time)?;
        Some(Span {
            kind: SpanKind::Session,
            id: session.id.clone(),
            label: session.label.clone(),
            day_index,
            top,
            height: geometry.height_for_minutes(f64::from(session.duration_minutes)),
            start_time: session.start_time,
            end_time: session.end_time,
        })
    });

    let block_spans = blocks
        .iter()
        .filter(|block| {
            !sessions
                .iter()
                .any(|session| block.contains(session.start_time))
        })
        .filter_map(|block| {
            let (day_index, top) = locate(block.start_time)?;
            let minutes = (block.end_time - block.start_time) as f64 * 60.0 / HOUR_MS as f64;
            Some(Span {
                kind: SpanKind::Planned,
                id: block.id.clone(),
                label: block.label.clone(),
                day_index,
                top,
                height: geometry.height_for_minutes(minutes),
                start_time: block.start_time,
                end_time: block.end_time,
            })
        });

    let mut spans: Vec<Span> = session_spans.chain(block_spans).collect();
    spans.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    spans
}
