//! Error types for roster-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Invalid time format: '{0}' (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("Invalid time range: end {end} must be after start {start}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Invalid date range on {entity}: {end} is before {start}")]
    InvalidDateRange {
        entity: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid weekday mask: {0}")]
    InvalidWeekdayMask(String),

    #[error("Invalid shift '{shift}': {reason}")]
    InvalidShift { shift: String, reason: String },

    #[error("Week start {0} is not a Monday")]
    InvalidWeekStart(NaiveDate),

    #[error("Unknown employee reference: {0}")]
    UnknownEmployeeReference(String),

    #[error("Unknown school reference: {0}")]
    UnknownSchoolReference(String),

    /// The snapshot document was not valid JSON for the entity model.
    #[error("Snapshot parse error: {0}")]
    SnapshotParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;
