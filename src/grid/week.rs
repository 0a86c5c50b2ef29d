//! Calendar arithmetic for the Monday-to-Sunday week.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAY_NAMES: [&str; DAYS_PER_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The seven consecutive dates of the week containing `date`, Monday first.
pub fn week_dates(date: NaiveDate) -> [NaiveDate; DAYS_PER_WEEK] {
    let monday = week_start(date);
    std::array::from_fn(|offset| monday + Duration::days(offset as i64))
}

/// Resolve a wall-clock time in `tz`. Ambiguous times take the earlier instant;
/// times skipped by a DST jump move forward an hour.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Epoch-millisecond bounds `[start, end)` of `hour` on `date` in `tz`.
pub fn slot_bounds<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<(i64, i64)> {
    let start_naive = date.and_hms_opt(hour, 0, 0)?;
    let start = resolve_local(tz, start_naive)?;
    let end = resolve_local(tz, start_naive + Duration::hours(1))?;
    Some((start.timestamp_millis(), end.timestamp_millis()))
}

/// Convert an epoch-millisecond timestamp into `tz`.
pub fn to_zone<Tz: TimeZone>(tz: &Tz, ms: i64) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(ms).single()
}
