//! The storage collaborator seam.
//!
//! The engine never talks to a database. Callers hand it something that
//! implements [`ScheduleSource`]; the in-memory [`Snapshot`] is the reference
//! implementation and is what the CLI deserializes from JSON.
//!
//! Read-after-write: a pre-commit conflict check is only sound if the source it
//! reads already reflects every edit committed for the same employee and date.
//! Implementations backed by a shared store must provide that guarantee; the
//! engine relies on it and on nothing else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    Absence, Assignment, BlockReassignment, DateRange, Employee, Holiday, School, TemporaryTask,
};

/// Read-only listing operations the engine consumes.
///
/// Listings return entities in their natural creation order; the replacement
/// resolver relies on that order for temporary tasks.
pub trait ScheduleSource {
    fn list_employees(&self) -> Vec<Employee>;

    fn list_schools(&self) -> Vec<School>;

    /// Assignments whose date range contains `active_on`, or all of them.
    fn list_assignments(&self, active_on: Option<NaiveDate>) -> Vec<Assignment>;

    /// Temporary tasks on `date`, or all of them.
    fn list_temporary_tasks(&self, date: Option<NaiveDate>) -> Vec<TemporaryTask>;

    /// Absences overlapping `overlapping`, or all of them.
    fn list_absences(&self, overlapping: Option<DateRange>) -> Vec<Absence>;

    fn list_holidays(&self) -> Vec<Holiday>;

    /// Block reassignments on `date`, or all of them.
    fn list_reassignments(&self, date: Option<NaiveDate>) -> Vec<BlockReassignment>;
}

/// An immutable copy of every roster entity, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub employees: Vec<Employee>,
    pub schools: Vec<School>,
    pub assignments: Vec<Assignment>,
    pub temporary_tasks: Vec<TemporaryTask>,
    pub absences: Vec<Absence>,
    pub holidays: Vec<Holiday>,
    pub reassignments: Vec<BlockReassignment>,
}

impl Snapshot {
    /// Parse a snapshot from its JSON document.
    ///
    /// # Errors
    /// Returns `RosterError::SnapshotParse` for malformed JSON, including bad
    /// `"HH:MM"` times and weekday codes, which are rejected during parsing.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ScheduleSource for Snapshot {
    fn list_employees(&self) -> Vec<Employee> {
        self.employees.clone()
    }

    fn list_schools(&self) -> Vec<School> {
        self.schools.clone()
    }

    fn list_assignments(&self, active_on: Option<NaiveDate>) -> Vec<Assignment> {
        self.assignments
            .iter()
            .filter(|a| active_on.is_none_or(|d| a.is_active_on(d)))
            .cloned()
            .collect()
    }

    fn list_temporary_tasks(&self, date: Option<NaiveDate>) -> Vec<TemporaryTask> {
        self.temporary_tasks
            .iter()
            .filter(|t| date.is_none_or(|d| t.date == d))
            .cloned()
            .collect()
    }

    fn list_absences(&self, overlapping: Option<DateRange>) -> Vec<Absence> {
        self.absences
            .iter()
            .filter(|a| overlapping.is_none_or(|r| r.overlaps(a.start_date, a.end_date)))
            .cloned()
            .collect()
    }

    fn list_holidays(&self) -> Vec<Holiday> {
        self.holidays.clone()
    }

    fn list_reassignments(&self, date: Option<NaiveDate>) -> Vec<BlockReassignment> {
        self.reassignments
            .iter()
            .filter(|r| date.is_none_or(|d| r.date == d))
            .cloned()
            .collect()
    }
}
