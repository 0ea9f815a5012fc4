//! Request-level operations: the weekly schedule, pre-commit conflict checks
//! and the post-hoc conflict audit.
//!
//! Each call reads one consistent view of the [`ScheduleSource`], computes its
//! result from scratch and keeps nothing afterwards, so calls for different
//! weeks can run in parallel without coordination.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::conflict::{conflicts_with, find_conflicts, Conflict, ConflictDescriptor};
use crate::error::{Result, RosterError};
use crate::expander::{expand_dates, expand_day, Activation, WorkItem};
use crate::hours::{aggregate_hours, WeeklyHours};
use crate::model::{Employee, Holiday};
use crate::replacements::{resolve_replacements, Replacements};
use crate::source::ScheduleSource;
use crate::time::{ClockTime, MinuteSpan};

/// Monday of the week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Monday through Friday of the week starting at `week_start`.
///
/// # Errors
/// Returns `RosterError::InvalidWeekStart` unless `week_start` is a Monday.
pub fn week_dates(week_start: NaiveDate) -> Result<Vec<NaiveDate>> {
    if week_start.weekday() != Weekday::Mon {
        return Err(RosterError::InvalidWeekStart(week_start));
    }
    Ok(week_start.iter_days().take(5).collect())
}

/// One employee's week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeWeek {
    pub employee: Employee,
    #[serde(flatten)]
    pub hours: WeeklyHours,
    pub activations: Vec<Activation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySchedule {
    pub week_start: NaiveDate,
    pub week_dates: Vec<NaiveDate>,
    /// Holidays falling inside the week.
    pub holidays: Vec<Holiday>,
    pub per_employee: Vec<EmployeeWeek>,
    pub replacements: Replacements,
}

/// Compute hours, activations and replacement needs for a Monday-to-Friday week.
///
/// Employees are listed in source order, inactive ones included (they simply
/// have no activations). Callers normalize arbitrary dates with [`week_monday`].
///
/// # Errors
/// Returns `RosterError::InvalidWeekStart` if `week_start` is not a Monday, or a
/// validation error for malformed entities.
pub fn compute_weekly_schedule<S: ScheduleSource + ?Sized>(
    source: &S,
    week_start: NaiveDate,
    config: &EngineConfig,
) -> Result<WeeklySchedule> {
    let dates = week_dates(week_start)?;
    let expansion = expand_dates(source, &dates)?;

    let per_employee: Vec<EmployeeWeek> = source
        .list_employees()
        .into_iter()
        .map(|employee| {
            let activations: Vec<Activation> =
                expansion.for_employee(&employee.id).cloned().collect();
            let hours = aggregate_hours(&activations, &dates, config);
            EmployeeWeek {
                employee,
                hours,
                activations,
            }
        })
        .collect();

    let replacements = resolve_replacements(
        &expansion.activations,
        &expansion.orphans,
        &source.list_temporary_tasks(None),
    );

    let holidays: Vec<Holiday> = source
        .list_holidays()
        .into_iter()
        .filter(|h| dates.contains(&h.date))
        .collect();

    info!(
        %week_start,
        employees = per_employee.len(),
        activations = expansion.activations.len(),
        unassigned_assignments = replacements.unassigned_assignments.len(),
        unassigned_tasks = replacements.unassigned_tasks.len(),
        absence_orphans = replacements.absence_orphans.len(),
        "computed weekly schedule"
    );

    Ok(WeeklySchedule {
        week_start,
        week_dates: dates,
        holidays,
        per_employee,
        replacements,
    })
}

/// The item a conflict check is made for.
///
/// When an existing item is being edited, its committed activations are left
/// out of the comparison so it never conflicts with itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateItem {
    NewTask,
    Task { id: String },
    Assignment { id: String },
}

impl CandidateItem {
    fn excludes(&self, item: &WorkItem) -> bool {
        match self {
            CandidateItem::NewTask => false,
            CandidateItem::Task { id } => item.task_id() == Some(id.as_str()),
            CandidateItem::Assignment { id } => item.assignment_id() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub candidate: CandidateItem,
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default)]
    pub school_id: Option<String>,
}

impl ConflictCheckRequest {
    /// Build a request from `"HH:MM"` strings.
    ///
    /// # Errors
    /// Returns `RosterError::InvalidTimeFormat` for malformed times.
    pub fn new(
        candidate: CandidateItem,
        employee_id: impl Into<String>,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self> {
        Ok(Self {
            candidate,
            employee_id: employee_id.into(),
            date,
            start_time: start_time.parse()?,
            end_time: end_time.parse()?,
            school_id: None,
        })
    }

    pub fn with_school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictCheck {
    pub conflict: bool,
    pub conflicts: Vec<ConflictDescriptor>,
}

/// Check a proposed time window against an employee's committed activations
/// for the date.
///
/// A reported conflict is advisory; the caller decides whether to commit
/// anyway. With no commits in between, repeated calls return identical results.
///
/// # Errors
/// - `RosterError::InvalidTimeRange` if the window does not end after it starts.
/// - `RosterError::UnknownEmployeeReference` / `UnknownSchoolReference` for
///   dangling ids.
pub fn check_conflict<S: ScheduleSource + ?Sized>(
    source: &S,
    request: &ConflictCheckRequest,
    config: &EngineConfig,
) -> Result<ConflictCheck> {
    validate_request(source, request).inspect_err(|err| {
        warn!(employee = %request.employee_id, date = %request.date, %err, "conflict check rejected");
    })?;

    let candidate = MinuteSpan::between(request.start_time, request.end_time);
    let expansion = expand_day(source, request.date)?;
    let existing = expansion
        .for_employee(&request.employee_id)
        .filter(|a| !request.candidate.excludes(&a.item));
    let conflicts = conflicts_with(candidate, existing, config.min_conflict_overlap_minutes);

    info!(
        employee = %request.employee_id,
        date = %request.date,
        window = %candidate,
        conflicts = conflicts.len(),
        "conflict check"
    );

    Ok(ConflictCheck {
        conflict: !conflicts.is_empty(),
        conflicts,
    })
}

fn validate_request<S: ScheduleSource + ?Sized>(source: &S, request: &ConflictCheckRequest) -> Result<()> {
    if request.end_time <= request.start_time {
        return Err(RosterError::InvalidTimeRange {
            start: request.start_time.to_string(),
            end: request.end_time.to_string(),
        });
    }
    if !source
        .list_employees()
        .iter()
        .any(|e| e.id == request.employee_id)
    {
        return Err(RosterError::UnknownEmployeeReference(
            request.employee_id.clone(),
        ));
    }
    if let Some(school_id) = &request.school_id {
        if !source.list_schools().iter().any(|s| &s.id == school_id) {
            return Err(RosterError::UnknownSchoolReference(school_id.clone()));
        }
    }
    Ok(())
}

/// Conflicts among one employee's committed work for a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeConflicts {
    pub employee_id: String,
    pub employee_name: String,
    pub conflicts: Vec<Conflict>,
}

/// Audit every employee's committed activations on `date` for overlaps.
///
/// Only employees with at least one conflict are returned, in source order.
pub fn audit_conflicts<S: ScheduleSource + ?Sized>(
    source: &S,
    date: NaiveDate,
    config: &EngineConfig,
) -> Result<Vec<EmployeeConflicts>> {
    let expansion = expand_day(source, date)?;

    let audit: Vec<EmployeeConflicts> = source
        .list_employees()
        .into_iter()
        .filter_map(|employee| {
            let own: Vec<Activation> = expansion.for_employee(&employee.id).cloned().collect();
            let conflicts = find_conflicts(&own, config.min_conflict_overlap_minutes);
            (!conflicts.is_empty()).then(|| EmployeeConflicts {
                employee_id: employee.id,
                employee_name: employee.name,
                conflicts,
            })
        })
        .collect();

    info!(%date, employees_with_conflicts = audit.len(), "conflict audit");
    Ok(audit)
}
