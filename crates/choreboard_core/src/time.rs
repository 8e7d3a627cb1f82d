//! crates/choreboard_core/src/time.rs
//!
//! Timestamp parsing, display formatting and the calendar-day cutoffs used by
//! the classifier. Every local-time computation takes the zone explicitly so the
//! record and "now" are always compared in the same zone.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Minute-precision display format for timestamps.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a backend timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive date-time/date which is read as
/// wall-clock time in `tz`. Returns `None` when nothing matches.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(resolve_local(tz, naive).with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| start_of(tz, date).with_timezone(&Utc))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM` in `tz`.
pub fn display(ts: &DateTime<Utc>, tz: &Tz) -> String {
    ts.with_timezone(tz).format(DISPLAY_FORMAT).to_string()
}

/// Parses and re-displays a timestamp string. Idempotent on its own output.
pub fn normalize_timestamp(raw: &str, tz: &Tz) -> Option<String> {
    parse_timestamp(raw, tz).map(|ts| display(&ts, tz))
}

/// The first instant of `now`'s calendar day.
pub fn start_of_day(now: &DateTime<Tz>) -> DateTime<Tz> {
    start_of(&now.timezone(), now.date_naive())
}

/// The last instant (23:59:59.999999) of `now`'s calendar day.
pub fn end_of_day(now: &DateTime<Tz>) -> DateTime<Tz> {
    match now.date_naive().succ_opt() {
        Some(next) => start_of(&now.timezone(), next) - Duration::microseconds(1),
        None => *now,
    }
}

/// True when `due` falls on or before the end of `now`'s calendar day.
pub fn is_due_today(due: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    *due <= end_of_day(now).with_timezone(&Utc)
}

/// Formats a duration as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn start_of(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Wall-clock time inside a DST gap: move forward to the first minute that exists.
            let mut probe = naive;
            for _ in 0..(24 * 60) {
                probe += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt;
                }
            }
            tz.from_utc_datetime(&naive)
        }
    }
}
