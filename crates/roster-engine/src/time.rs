//! Minute-of-day arithmetic for block and task time windows.
//!
//! Every time in the roster is a wall-clock time on a single school day, so
//! the engine works in plain minutes since midnight instead of datetimes.
//! Effective spans (a block widened by its approach time) may start before
//! midnight or run past it, which is why [`MinuteSpan`] is signed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

/// Number of minutes in a day; valid clock times are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Parse an `"HH:MM"` time of day into minutes since midnight.
///
/// Single-digit hours (`"7:05"`) are accepted; minutes must have two digits.
///
/// # Errors
/// Returns `RosterError::InvalidTimeFormat` if the string is malformed, the hour
/// is outside `0..=23` or the minute is outside `0..=59`.
pub fn to_minutes(time: &str) -> Result<u16> {
    let invalid = || RosterError::InvalidTimeFormat(time.to_string());

    let (hours, minutes) = time.trim().split_once(':').ok_or_else(invalid)?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }

    let hour: u16 = hours.parse().map_err(|_| invalid())?;
    let minute: u16 = minutes.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok(hour * 60 + minute)
}

/// Format minutes since midnight as `"HH:MM"`.
pub fn minutes_to_time(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Format a worked-minute total as `"HH:MM"`. Hours are not wrapped at 24, so a
/// weekly total of 2400 minutes renders as `"40:00"`.
pub fn format_hours_minutes(total_minutes: i64) -> String {
    let sign = if total_minutes < 0 { "-" } else { "" };
    let total = total_minutes.unsigned_abs();
    format!("{}{:02}:{:02}", sign, total / 60, total % 60)
}

/// Minutes of overlap between `[a_start, a_end)` and `[b_start, b_end)`.
///
/// Touching intervals (`a_end == b_start`) overlap by 0.
pub fn overlap_minutes(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> i64 {
    let overlap = i64::from(a_end.min(b_end)) - i64::from(a_start.max(b_start));
    overlap.max(0)
}

/// A validated time of day, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build a clock time from minutes since midnight.
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(RosterError::InvalidTimeFormat(minutes.to_string()));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        to_minutes(s).map(ClockTime)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(time: ClockTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&minutes_to_time(self.0))
    }
}

/// A half-open span of occupied minutes, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MinuteSpan {
    pub start: i32,
    pub end: i32,
}

impl MinuteSpan {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Span of a plain start/end window with no approach time.
    pub fn between(start: ClockTime, end: ClockTime) -> Self {
        Self::new(i32::from(start.minutes()), i32::from(end.minutes()))
    }

    pub fn duration_minutes(&self) -> i64 {
        i64::from(self.end - self.start).max(0)
    }

    pub fn overlap_minutes(&self, other: &MinuteSpan) -> i64 {
        overlap_minutes(self.start, self.end, other.start, other.end)
    }
}

impl fmt::Display for MinuteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", wall_clock(self.start), wall_clock(self.end))
    }
}

/// Render a possibly out-of-day minute offset on the 24h clock.
fn wall_clock(minutes: i32) -> String {
    let wrapped = minutes.rem_euclid(i32::from(MINUTES_PER_DAY));
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}
