//! Deadline arithmetic.
//!
//! Every function here is pure given `(deadline_date, deadline_time, now)`.
//! Malformed input never raises: it reads as expired, or as `"Invalid Date"`
//! when formatting.
//!
//! Local wall-clock resolution is delegated to [`chrono::Local`], so DST is
//! handled by the platform tz database rather than computed here. A deadline
//! that falls in a fall-back overlap resolves to the earlier instant; one that
//! falls in a spring-forward gap is pushed one hour later.

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: u64 = 86_400_000;
pub const MS_PER_HOUR: u64 = 3_600_000;
pub const MS_PER_MINUTE: u64 = 60_000;
pub const MS_PER_SECOND: u64 = 1_000;

/// Rendered by [`format_deadline`] for anything it cannot parse.
pub const INVALID_DATE: &str = "Invalid Date";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Time left until a deadline, decomposed into whole units.
///
/// All-zero (`total_ms == 0`) is the canonical "expired" value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRemaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub total_ms: u64,
}

impl TimeRemaining {
    pub const ZERO: TimeRemaining = TimeRemaining {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        total_ms: 0,
    };

    /// Decompose a positive millisecond count, truncating each unit.
    pub fn from_millis(total_ms: u64) -> Self {
        Self {
            days: total_ms / MS_PER_DAY,
            hours: (total_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (total_ms % MS_PER_MINUTE) / MS_PER_SECOND,
            total_ms,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_ms == 0
    }

    /// `"2d 3h 4m 5s"`, with the day part dropped when it is zero.
    pub fn format_compact(&self) -> String {
        if self.days > 0 {
            format!(
                "{}d {}h {}m {}s",
                self.days, self.hours, self.minutes, self.seconds
            )
        } else {
            format!("{}h {}m {}s", self.hours, self.minutes, self.seconds)
        }
    }
}

/// Parse the stored `"YYYY-MM-DD"` / `"HH:MM"` pair into a wall-clock value.
pub fn parse_deadline(deadline_date: &str, deadline_time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(deadline_date.trim(), DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(deadline_time.trim(), TIME_FORMAT).ok()?;
    Some(date.and_time(time))
}

/// Resolve a local wall-clock value to an instant.
pub fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    resolve_in(&Local, naive)
}

/// [`resolve_local`] for any zone.
///
/// chrono orders the two candidates of an overlap by offset, not by instant,
/// so the earlier instant is picked explicitly.
pub fn resolve_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    fn earliest<Tz: TimeZone>(result: LocalResult<DateTime<Tz>>) -> Option<DateTime<Tz>> {
        match result {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(a, b) => Some(a.min(b)),
            LocalResult::None => None,
        }
    }

    earliest(tz.from_local_datetime(&naive)).or_else(|| {
        // Spring-forward gap: the wall-clock time never happens.
        earliest(tz.from_local_datetime(&(naive + Duration::hours(1))))
    })
}

/// Re-render a valid `deadline_date` as zero-padded `YYYY-MM-DD`. Anything
/// unparseable comes back trimmed but otherwise untouched.
pub fn canonical_date(deadline_date: &str) -> String {
    let trimmed = deadline_date.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// Re-render a valid `deadline_time` as zero-padded `HH:MM`.
pub fn canonical_time(deadline_time: &str) -> String {
    let trimmed = deadline_time.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// The deadline as an instant, at zero seconds and milliseconds.
pub fn deadline_instant(deadline_date: &str, deadline_time: &str) -> Option<DateTime<Local>> {
    parse_deadline(deadline_date, deadline_time).and_then(resolve_local)
}

/// Parse an ISO-8601 `createdAt` stamp.
pub fn parse_created_at(created_at: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(created_at.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Time left until the deadline. Zero when the deadline has passed or the
/// input cannot be parsed.
pub fn compute_remaining(
    deadline_date: &str,
    deadline_time: &str,
    now: DateTime<Local>,
) -> TimeRemaining {
    let Some(deadline) = deadline_instant(deadline_date, deadline_time) else {
        return TimeRemaining::ZERO;
    };
    let diff = deadline.timestamp_millis() - now.timestamp_millis();
    if diff <= 0 {
        return TimeRemaining::ZERO;
    }
    TimeRemaining::from_millis(diff as u64)
}

/// `deadline <= now`. Unparseable deadlines count as expired so a corrupt
/// record never shows a countdown that cannot finish.
pub fn is_expired(deadline_date: &str, deadline_time: &str, now: DateTime<Local>) -> bool {
    match deadline_instant(deadline_date, deadline_time) {
        Some(deadline) => deadline <= now,
        None => true,
    }
}

/// `"Wednesday, January 1, 2099 at 12:00 AM"`, or [`INVALID_DATE`].
pub fn format_deadline(deadline_date: &str, deadline_time: &str) -> String {
    match parse_deadline(deadline_date, deadline_time) {
        Some(naive) => naive.format("%A, %B %-d, %Y at %-I:%M %p").to_string(),
        None => INVALID_DATE.to_string(),
    }
}
