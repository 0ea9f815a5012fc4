//! Worked-hours report over an arbitrary date range.
//!
//! Produces the table data behind the printable hours report: one row per
//! employee, one cell per school day, and a range total. Rendering (PDF,
//! spreadsheet) is left to the caller; [`DayCell::label`] gives the short text
//! used in printed tables.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, RosterError};
use crate::expander::{expand_dates, Exceptions};
use crate::model::{DateRange, Employee};
use crate::source::ScheduleSource;
use crate::time::format_hours_minutes;

/// What happened for one employee on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "minutes", rename_all = "snake_case")]
pub enum DayCell {
    /// Holiday with nothing worked.
    Holiday,
    /// Whole-day absence with nothing worked.
    Absent,
    Worked(i64),
}

impl DayCell {
    pub fn minutes(&self) -> i64 {
        match self {
            DayCell::Worked(minutes) => *minutes,
            DayCell::Holiday | DayCell::Absent => 0,
        }
    }

    /// `"F"` for a holiday (férié), `"A"` for an absence, otherwise `"HH:MM"`.
    pub fn label(&self) -> String {
        match self {
            DayCell::Holiday => "F".to_string(),
            DayCell::Absent => "A".to_string(),
            DayCell::Worked(minutes) => format_hours_minutes(*minutes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub employee_id: String,
    pub employee_name: String,
    pub cells: BTreeMap<NaiveDate, DayCell>,
    pub total_minutes: i64,
    /// `total_minutes` as `"HH:MM"`.
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursReport {
    pub title: String,
    pub period: DateRange,
    /// School days covered, in order.
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<ReportRow>,
}

/// Build the hours report for `[from, to]`.
///
/// `employee_ids` filters the rows; source order is kept. A day shows
/// `Holiday` or `Absent` only when nothing was worked, so a flat-rate
/// administrative shift on a holiday still counts.
///
/// # Errors
/// - `RosterError::InvalidDateRange` if `to` is before `from`.
/// - `RosterError::UnknownEmployeeReference` for an id not in the source.
pub fn hours_report<S: ScheduleSource + ?Sized>(
    source: &S,
    from: NaiveDate,
    to: NaiveDate,
    employee_ids: Option<&[String]>,
) -> Result<HoursReport> {
    let period = DateRange::new(from, to)?;
    let dates = period.school_days();
    let employees = select_employees(source.list_employees(), employee_ids)?;

    let expansion = expand_dates(source, &dates)?;
    let exceptions = Exceptions::load(source, period)?;

    let rows: Vec<ReportRow> = employees
        .into_iter()
        .map(|employee| {
            let mut worked: BTreeMap<NaiveDate, i64> = dates.iter().map(|d| (*d, 0)).collect();
            for activation in expansion.for_employee(&employee.id) {
                if let Some(total) = worked.get_mut(&activation.date) {
                    *total += activation.duration_minutes;
                }
            }

            let cells: BTreeMap<NaiveDate, DayCell> = worked
                .into_iter()
                .map(|(date, minutes)| {
                    let cell = if minutes > 0 {
                        DayCell::Worked(minutes)
                    } else if exceptions.is_holiday(date) {
                        DayCell::Holiday
                    } else if exceptions.is_absent_all_day(&employee.id, date) {
                        DayCell::Absent
                    } else {
                        DayCell::Worked(0)
                    };
                    (date, cell)
                })
                .collect();

            let total_minutes = cells.values().map(DayCell::minutes).sum();
            ReportRow {
                employee_id: employee.id,
                employee_name: employee.name,
                cells,
                total_minutes,
                total: format_hours_minutes(total_minutes),
            }
        })
        .collect();

    info!(%from, %to, rows = rows.len(), days = dates.len(), "hours report");

    Ok(HoursReport {
        title: format!("Rapport des heures travaillées - {} au {}", from, to),
        period,
        dates,
        rows,
    })
}

fn select_employees(employees: Vec<Employee>, ids: Option<&[String]>) -> Result<Vec<Employee>> {
    let Some(ids) = ids else {
        return Ok(employees);
    };
    if let Some(unknown) = ids.iter().find(|id| !employees.iter().any(|e| &e.id == *id)) {
        return Err(RosterError::UnknownEmployeeReference(unknown.clone()));
    }
    Ok(employees
        .into_iter()
        .filter(|e| ids.contains(&e.id))
        .collect())
}
