//! Worked-minute totals per day and per week.
//!
//! Totals are the plain sum of every activation's effective duration (block
//! span plus approach time, or the flat duration). Overlapping activations are
//! NOT deduplicated here; overlaps surface through conflict detection instead.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::expander::Activation;
use crate::time::format_hours_minutes;

/// Advisory classification of a weekly total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursFlag {
    #[default]
    Normal,
    /// Above the overtime threshold.
    Overtime,
    /// Worked, but below the undertime threshold.
    Undertime,
}

impl HoursFlag {
    pub fn classify(weekly_minutes: i64, config: &EngineConfig) -> Self {
        if weekly_minutes > config.overtime_threshold_minutes {
            HoursFlag::Overtime
        } else if weekly_minutes > 0 && weekly_minutes < config.undertime_threshold_minutes {
            HoursFlag::Undertime
        } else {
            HoursFlag::Normal
        }
    }
}

/// Per-day and weekly totals for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyHours {
    /// One entry per requested date, zero when nothing was worked.
    pub daily_minutes: BTreeMap<NaiveDate, i64>,
    pub weekly_minutes: i64,
    /// `weekly_minutes` as `"HH:MM"`, hours not wrapped at 24.
    pub weekly_total_formatted: String,
    pub flag: HoursFlag,
}

/// Sum one employee's activations over `week_dates`.
///
/// Activations dated outside `week_dates` are ignored. The caller is expected
/// to pass only the employee's own activations.
pub fn aggregate_hours<'a, I>(activations: I, week_dates: &[NaiveDate], config: &EngineConfig) -> WeeklyHours
where
    I: IntoIterator<Item = &'a Activation>,
{
    let mut daily_minutes: BTreeMap<NaiveDate, i64> =
        week_dates.iter().map(|d| (*d, 0)).collect();

    for activation in activations {
        if let Some(total) = daily_minutes.get_mut(&activation.date) {
            *total += activation.duration_minutes;
        }
    }

    let weekly_minutes = daily_minutes.values().sum();
    WeeklyHours {
        daily_minutes,
        weekly_minutes,
        weekly_total_formatted: format_hours_minutes(weekly_minutes),
        flag: HoursFlag::classify(weekly_minutes, config),
    }
}
