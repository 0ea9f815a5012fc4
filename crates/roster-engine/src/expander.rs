//! Recurrence expansion: circuits and temporary tasks become concrete,
//! date-specific activations.
//!
//! An assignment recurs on every school day inside its date range. Block-based
//! shifts follow each block's weekday mask and are skipped on holidays; flat-rate
//! administrative shifts run every school day and ignore holidays. Absences and
//! inactive drivers do not make work disappear: the affected items come out as
//! [`OrphanCandidate`]s that need a replacement driver.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RosterError};
use crate::model::{
    is_school_day, Absence, Assignment, BlockReassignment, DateRange, Employee, Holiday, ShiftKind,
    TemporaryTask,
};
use crate::source::ScheduleSource;
use crate::time::MinuteSpan;

/// The source work item behind an activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    /// One block of a block-based shift.
    Block {
        assignment_id: String,
        circuit_number: String,
        shift_id: String,
        shift_name: String,
        block_id: String,
        school_id: String,
    },
    /// A flat-rate administrative shift.
    Flat {
        assignment_id: String,
        circuit_number: String,
        shift_id: String,
        shift_name: String,
    },
    Task {
        task_id: String,
        name: String,
        school_id: Option<String>,
    },
}

impl WorkItem {
    /// Identifier that is unique per item and stable across calls.
    pub fn stable_key(&self) -> String {
        match self {
            WorkItem::Block {
                assignment_id,
                shift_id,
                block_id,
                ..
            } => format!("assignment:{}:{}:{}", assignment_id, shift_id, block_id),
            WorkItem::Flat {
                assignment_id,
                shift_id,
                ..
            } => format!("assignment:{}:{}", assignment_id, shift_id),
            WorkItem::Task { task_id, .. } => format!("task:{}", task_id),
        }
    }

    pub fn assignment_id(&self) -> Option<&str> {
        match self {
            WorkItem::Block { assignment_id, .. } | WorkItem::Flat { assignment_id, .. } => {
                Some(assignment_id)
            }
            WorkItem::Task { .. } => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            WorkItem::Task { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Shift name used by the absence label rule; tasks have none.
    pub fn shift_name(&self) -> Option<&str> {
        match self {
            WorkItem::Block { shift_name, .. } | WorkItem::Flat { shift_name, .. } => {
                Some(shift_name)
            }
            WorkItem::Task { .. } => None,
        }
    }
}

/// A work item materialized on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activation {
    pub date: NaiveDate,
    /// The driver working it; `None` when the item has no driver at all.
    pub employee_id: Option<String>,
    pub item: WorkItem,
    /// Effective occupied span including approach time. Flat-rate shifts have none.
    pub span: Option<MinuteSpan>,
    pub duration_minutes: i64,
}

/// Why a work item lost its driver for a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    Absent,
    Inactive,
    /// Moved to the replacement pool by a block reassignment.
    Released,
}

/// A work item that still needs coverage on `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanCandidate {
    pub date: NaiveDate,
    pub item: WorkItem,
    pub span: Option<MinuteSpan>,
    pub duration_minutes: i64,
    /// Driver who would normally work the item.
    pub original_employee: String,
    pub reason: OrphanReason,
}

/// Activations plus orphan candidates for some set of items and dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expansion {
    pub activations: Vec<Activation>,
    pub orphans: Vec<OrphanCandidate>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.activations.is_empty() && self.orphans.is_empty()
    }

    pub fn extend(&mut self, other: Expansion) {
        self.activations.extend(other.activations);
        self.orphans.extend(other.orphans);
    }

    /// Activations worked by `employee_id`.
    pub fn for_employee<'a>(&'a self, employee_id: &'a str) -> impl Iterator<Item = &'a Activation> {
        self.activations
            .iter()
            .filter(move |a| a.employee_id.as_deref() == Some(employee_id))
    }

    /// Route an item to the activation list, or to the orphans when its driver
    /// is inactive or absent for that shift.
    fn place(
        &mut self,
        exceptions: &Exceptions,
        date: NaiveDate,
        employee_id: Option<&str>,
        item: WorkItem,
        span: Option<MinuteSpan>,
        duration_minutes: i64,
    ) {
        if let Some(employee) = employee_id {
            let reason = if exceptions.is_inactive(employee) {
                Some(OrphanReason::Inactive)
            } else if exceptions
                .absence_for(employee, date, item.shift_name())
                .is_some()
            {
                Some(OrphanReason::Absent)
            } else {
                None
            };

            if let Some(reason) = reason {
                debug!(%date, employee, item = %item.stable_key(), ?reason, "activation orphaned");
                self.orphans.push(OrphanCandidate {
                    date,
                    item,
                    span,
                    duration_minutes,
                    original_employee: employee.to_string(),
                    reason,
                });
                return;
            }
        }

        self.activations.push(Activation {
            date,
            employee_id: employee_id.map(str::to_string),
            item,
            span,
            duration_minutes,
        });
    }
}

/// Holidays, absences, inactive drivers and block reassignments that bend the
/// regular recurrence.
#[derive(Debug, Clone, Default)]
pub struct Exceptions {
    holidays: BTreeMap<NaiveDate, String>,
    absences: Vec<Absence>,
    inactive: HashSet<String>,
    reassignments: Vec<BlockReassignment>,
}

impl Exceptions {
    /// Build the exception calendar, validating absence date ranges.
    pub fn new(
        holidays: &[Holiday],
        absences: &[Absence],
        employees: &[Employee],
        reassignments: &[BlockReassignment],
    ) -> Result<Self> {
        for absence in absences {
            absence.validate()?;
        }
        Ok(Self {
            holidays: holidays
                .iter()
                .map(|h| (h.date, h.name.clone()))
                .collect(),
            absences: absences.to_vec(),
            inactive: employees
                .iter()
                .filter(|e| e.is_inactive)
                .map(|e| e.id.clone())
                .collect(),
            reassignments: reassignments.to_vec(),
        })
    }

    /// Load the exceptions relevant to `range` from a source.
    ///
    /// Every absence is validated, not only those overlapping `range`, so an
    /// inverted absence is reported whichever week is asked for.
    pub fn load<S: ScheduleSource + ?Sized>(source: &S, range: DateRange) -> Result<Self> {
        let absences = source.list_absences(None);
        for absence in &absences {
            absence.validate()?;
        }
        let absences: Vec<Absence> = absences
            .into_iter()
            .filter(|a| range.overlaps(a.start_date, a.end_date))
            .collect();
        let reassignments: Vec<BlockReassignment> = source
            .list_reassignments(None)
            .into_iter()
            .filter(|r| range.contains(r.date))
            .collect();
        Self::new(
            &source.list_holidays(),
            &absences,
            &source.list_employees(),
            &reassignments,
        )
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains_key(&date)
    }

    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.holidays.get(&date).map(String::as_str)
    }

    pub fn is_inactive(&self, employee_id: &str) -> bool {
        self.inactive.contains(employee_id)
    }

    /// First absence of `employee_id` covering `date` that affects the shift.
    pub fn absence_for(
        &self,
        employee_id: &str,
        date: NaiveDate,
        shift_name: Option<&str>,
    ) -> Option<&Absence> {
        self.absences
            .iter()
            .find(|a| a.employee_id == employee_id && a.covers(date) && a.affects(shift_name))
    }

    /// Whether `employee_id` has a whole-day absence on `date`.
    pub fn is_absent_all_day(&self, employee_id: &str, date: NaiveDate) -> bool {
        self.absences
            .iter()
            .any(|a| a.employee_id == employee_id && a.covers(date) && a.is_whole_day())
    }

    fn reassignment_for(
        &self,
        date: NaiveDate,
        assignment_id: &str,
        shift_id: &str,
        block_id: &str,
    ) -> Option<&BlockReassignment> {
        self.reassignments
            .iter()
            .find(|r| r.matches(date, assignment_id, shift_id, block_id))
    }
}

/// Expand one assignment on one date.
///
/// Returns an empty expansion outside the assignment's date range and on
/// weekends. Unassigned circuits produce activations with `employee_id: None`.
///
/// # Errors
/// Returns a validation error if the assignment's date range or any of its
/// shifts is malformed.
pub fn expand_assignment(
    assignment: &Assignment,
    date: NaiveDate,
    exceptions: &Exceptions,
) -> Result<Expansion> {
    assignment.validate()?;

    let mut expansion = Expansion::default();
    if !assignment.is_active_on(date) || !is_school_day(date) {
        return Ok(expansion);
    }

    let weekday = date.weekday();
    let holiday = exceptions.holiday_name(date);
    let driver = assignment.employee_id.as_deref();

    for shift in &assignment.shifts {
        match shift.kind()? {
            ShiftKind::Flat(minutes) => {
                let item = WorkItem::Flat {
                    assignment_id: assignment.id.clone(),
                    circuit_number: assignment.circuit_number.clone(),
                    shift_id: shift.id.clone(),
                    shift_name: shift.name.clone(),
                };
                expansion.place(exceptions, date, driver, item, None, i64::from(minutes));
            }
            ShiftKind::Blocks(blocks) => {
                if let Some(name) = holiday {
                    debug!(%date, holiday = name, circuit = %assignment.circuit_number, shift = %shift.name, "shift suppressed by holiday");
                    continue;
                }

                for block in blocks.iter().filter(|b| b.days.contains(weekday)) {
                    let item = WorkItem::Block {
                        assignment_id: assignment.id.clone(),
                        circuit_number: assignment.circuit_number.clone(),
                        shift_id: shift.id.clone(),
                        shift_name: shift.name.clone(),
                        block_id: block.id.clone(),
                        school_id: block.school_id.clone(),
                    };
                    let span = block.effective_span();

                    let worker = match exceptions.reassignment_for(
                        date,
                        &assignment.id,
                        &shift.id,
                        &block.id,
                    ) {
                        Some(reassignment) => match (&reassignment.new_employee_id, driver) {
                            (Some(new_employee), _) => Some(new_employee.as_str()),
                            (None, Some(original)) => {
                                debug!(%date, block = %block.id, "block released to replacements");
                                expansion.orphans.push(OrphanCandidate {
                                    date,
                                    item,
                                    span: Some(span),
                                    duration_minutes: span.duration_minutes(),
                                    original_employee: original.to_string(),
                                    reason: OrphanReason::Released,
                                });
                                continue;
                            }
                            (None, None) => None,
                        },
                        None => driver,
                    };

                    expansion.place(
                        exceptions,
                        date,
                        worker,
                        item,
                        Some(span),
                        span.duration_minutes(),
                    );
                }
            }
        }
    }

    Ok(expansion)
}

/// Expand a temporary task on one date.
///
/// A task is active only on its own date. Holidays never suppress it; only a
/// whole-day absence of its driver does, since a task carries no shift name.
///
/// # Errors
/// Returns `RosterError::InvalidTimeRange` if the task ends before it starts.
pub fn expand_task(task: &TemporaryTask, date: NaiveDate, exceptions: &Exceptions) -> Result<Expansion> {
    task.validate()?;

    let mut expansion = Expansion::default();
    if task.date != date {
        return Ok(expansion);
    }

    let span = task.span();
    let item = WorkItem::Task {
        task_id: task.id.clone(),
        name: task.name.clone(),
        school_id: task.school_id.clone(),
    };
    expansion.place(
        exceptions,
        date,
        task.employee_id.as_deref(),
        item,
        Some(span),
        span.duration_minutes(),
    );
    Ok(expansion)
}

/// Expand every assignment and temporary task over `dates`.
///
/// Activations come out grouped by date, assignments before tasks, each in
/// source order.
///
/// # Errors
/// Every assignment, task and absence in the source is validated, including
/// those outside `dates`. Driver references must name a listed employee,
/// otherwise `RosterError::UnknownEmployeeReference` is returned.
pub fn expand_dates<S: ScheduleSource + ?Sized>(source: &S, dates: &[NaiveDate]) -> Result<Expansion> {
    let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) else {
        return Ok(Expansion::default());
    };
    let range = DateRange::new(*first, *last)?;
    let exceptions = Exceptions::load(source, range)?;

    let employees = source.list_employees();
    let known: HashSet<&str> = employees.iter().map(|e| e.id.as_str()).collect();
    let check_driver = |employee_id: Option<&str>| match employee_id {
        Some(id) if !known.contains(id) => {
            Err(RosterError::UnknownEmployeeReference(id.to_string()))
        }
        _ => Ok(()),
    };

    let assignments = source.list_assignments(None);
    for assignment in &assignments {
        assignment.validate()?;
        check_driver(assignment.employee_id.as_deref())?;
    }
    let tasks = source.list_temporary_tasks(None);
    for task in &tasks {
        task.validate()?;
        check_driver(task.employee_id.as_deref())?;
    }
    for reassignment in source.list_reassignments(None) {
        check_driver(reassignment.new_employee_id.as_deref())?;
    }

    let assignments: Vec<Assignment> = assignments
        .into_iter()
        .filter(|a| range.overlaps(a.start_date, a.end_date))
        .collect();
    let tasks: Vec<TemporaryTask> = tasks
        .into_iter()
        .filter(|t| range.contains(t.date))
        .collect();

    let mut expansion = Expansion::default();
    for &date in dates {
        for assignment in &assignments {
            expansion.extend(expand_assignment(assignment, date, &exceptions)?);
        }
        for task in tasks.iter().filter(|t| t.date == date) {
            expansion.extend(expand_task(task, date, &exceptions)?);
        }
    }

    debug!(
        dates = dates.len(),
        activations = expansion.activations.len(),
        orphans = expansion.orphans.len(),
        "expanded roster"
    );
    Ok(expansion)
}

/// Expand every assignment and temporary task on a single date.
pub fn expand_day<S: ScheduleSource + ?Sized>(source: &S, date: NaiveDate) -> Result<Expansion> {
    expand_dates(source, &[date])
}
