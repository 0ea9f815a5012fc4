//! # roster-engine
//!
//! Deterministic scheduling core for school bus driver rosters.
//!
//! Given a snapshot of circuits (assignments), temporary tasks, absences,
//! holidays and block reassignments, the engine works out which work items are
//! active for each driver on each date, how many minutes everyone works per day
//! and per week, where a driver's items overlap, and which items have lost
//! their driver and need a replacement. Everything is a pure function over the
//! snapshot; nothing is cached between calls.
//!
//! ## Modules
//!
//! - [`time`]: `"HH:MM"` parsing, minute spans, overlap arithmetic
//! - [`model`]: roster entities and their validation
//! - [`source`]: the storage collaborator trait and the in-memory snapshot
//! - [`expander`]: circuits and tasks → dated activations and orphan candidates
//! - [`hours`]: daily and weekly worked-minute totals
//! - [`conflict`]: overlap detection between a driver's items
//! - [`replacements`]: unassigned and orphaned items needing a driver
//! - [`schedule`]: weekly schedule, conflict check, conflict audit
//! - [`report`]: worked-hours report over a date range
//! - [`config`]: thresholds
//! - [`error`]: Error types

pub mod config;
pub mod conflict;
pub mod error;
pub mod expander;
pub mod hours;
pub mod model;
pub mod replacements;
pub mod report;
pub mod schedule;
pub mod source;
pub mod time;

pub use config::EngineConfig;
pub use conflict::{find_conflicts, Conflict, ConflictDescriptor};
pub use error::RosterError;
pub use expander::{expand_assignment, expand_day, expand_task, Activation, Expansion, WorkItem};
pub use hours::{aggregate_hours, HoursFlag, WeeklyHours};
pub use replacements::{resolve_replacements, Replacements};
pub use report::hours_report;
pub use schedule::{
    audit_conflicts, check_conflict, compute_weekly_schedule, week_monday, CandidateItem,
    ConflictCheckRequest,
};
pub use source::{ScheduleSource, Snapshot};
pub use time::{overlap_minutes, to_minutes};
