//! Tests for circuit and task expansion on concrete dates.

use chrono::{NaiveDate, Weekday};
use roster_engine::expander::{expand_assignment, expand_dates, expand_task, Exceptions, OrphanReason};
use roster_engine::model::{
    Absence, Assignment, BlockReassignment, Employee, Holiday, Shift, TemporaryTask, TimeBlock,
    WeekdayMask,
};
use roster_engine::time::MinuteSpan;
use roster_engine::{RosterError, Snapshot, WorkItem};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn block(id: &str, start: &str, end: &str, before: u16, after: u16, days: &[Weekday]) -> TimeBlock {
    TimeBlock {
        id: id.to_string(),
        school_id: "sch-1".to_string(),
        start: start.parse().unwrap(),
        end: end.parse().unwrap(),
        approach_before: before,
        approach_after: after,
        days: WeekdayMask::from_days(days).unwrap(),
    }
}

const SCHOOL_WEEK: &[Weekday] = &[
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

fn block_shift(id: &str, name: &str, blocks: Vec<TimeBlock>) -> Shift {
    Shift {
        id: id.to_string(),
        name: name.to_string(),
        blocks,
        flat_minutes: None,
    }
}

fn flat_shift(id: &str, name: &str, minutes: u32) -> Shift {
    Shift {
        id: id.to_string(),
        name: name.to_string(),
        blocks: vec![],
        flat_minutes: Some(minutes),
    }
}

fn assignment(employee: Option<&str>, shifts: Vec<Shift>) -> Assignment {
    Assignment {
        id: "asg-204".to_string(),
        circuit_number: "204".to_string(),
        employee_id: employee.map(str::to_string),
        start_date: date("2025-09-01"),
        end_date: date("2026-06-30"),
        shifts,
        is_adapted: false,
    }
}

fn absence(employee: &str, start: &str, end: &str, labels: &[&str]) -> Absence {
    Absence {
        id: format!("abs-{}-{}", employee, start),
        employee_id: employee.to_string(),
        start_date: date(start),
        end_date: date(end),
        shift_types: labels.iter().map(|l| l.to_string()).collect(),
        reason: String::new(),
    }
}

fn holiday(day: &str) -> Holiday {
    Holiday {
        id: format!("hol-{}", day),
        name: "Journée pédagogique".to_string(),
        date: date(day),
    }
}

fn employee(id: &str, inactive: bool) -> Employee {
    Employee {
        id: id.to_string(),
        name: id.to_uppercase(),
        is_inactive: inactive,
        hire_date: None,
        phone: String::new(),
        email: String::new(),
    }
}

fn am_pm() -> Vec<Shift> {
    vec![
        block_shift(
            "sh-am",
            "AM",
            vec![
                block("b-am-1", "07:00", "07:45", 15, 0, SCHOOL_WEEK),
                block("b-am-2", "07:50", "08:20", 0, 10, SCHOOL_WEEK),
            ],
        ),
        block_shift(
            "sh-pm",
            "PM",
            vec![block("b-pm-1", "15:00", "16:00", 0, 0, &[Weekday::Mon, Weekday::Wed])],
        ),
    ]
}

// Monday 2025-12-15, Tuesday 2025-12-16.
const MONDAY: &str = "2025-12-15";
const TUESDAY: &str = "2025-12-16";

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

#[test]
fn blocks_follow_weekday_mask_and_include_approach_time() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::default();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 3);
    assert!(monday.orphans.is_empty());

    let first = &monday.activations[0];
    assert_eq!(first.span, Some(MinuteSpan::new(6 * 60 + 45, 7 * 60 + 45)));
    assert_eq!(first.duration_minutes, 60);
    assert_eq!(monday.activations[1].duration_minutes, 40);
    assert_eq!(monday.activations[2].duration_minutes, 60);

    // PM block only runs Mondays and Wednesdays.
    let tuesday = expand_assignment(&a, date(TUESDAY), &exceptions).unwrap();
    assert_eq!(tuesday.activations.len(), 2);
}

#[test]
fn outside_date_range_and_weekends_produce_nothing() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::default();

    assert!(expand_assignment(&a, date("2025-08-29"), &exceptions)
        .unwrap()
        .is_empty());
    assert!(expand_assignment(&a, date("2026-07-01"), &exceptions)
        .unwrap()
        .is_empty());
    // Saturday inside the range.
    assert!(expand_assignment(&a, date("2025-12-13"), &exceptions)
        .unwrap()
        .is_empty());
    // Range endpoints are inclusive.
    assert!(!expand_assignment(&a, date("2025-09-01"), &exceptions)
        .unwrap()
        .is_empty());
}

#[test]
fn flat_shift_runs_every_school_day_and_ignores_holidays() {
    let a = assignment(
        Some("emp-m"),
        vec![
            flat_shift("sh-admin", "ADMIN", 480),
            block_shift("sh-am", "AM", vec![block("b-1", "07:00", "08:00", 0, 0, &[Weekday::Fri])]),
        ],
    );
    let exceptions = Exceptions::new(&[holiday(MONDAY)], &[], &[], &[]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 1);
    assert!(matches!(monday.activations[0].item, WorkItem::Flat { .. }));
    assert_eq!(monday.activations[0].duration_minutes, 480);
    assert_eq!(monday.activations[0].span, None);
    assert!(monday.orphans.is_empty(), "holidays never create orphans");
}

#[test]
fn holiday_suppresses_every_block() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::new(&[holiday(MONDAY)], &[], &[], &[]).unwrap();

    assert!(expand_assignment(&a, date(MONDAY), &exceptions)
        .unwrap()
        .is_empty());
    assert_eq!(
        expand_assignment(&a, date(TUESDAY), &exceptions)
            .unwrap()
            .activations
            .len(),
        2
    );
}

// ---------------------------------------------------------------------------
// Absences
// ---------------------------------------------------------------------------

#[test]
fn labelled_absence_only_orphans_matching_shift() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions =
        Exceptions::new(&[], &[absence("emp-h", MONDAY, MONDAY, &["PM"])], &[], &[]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 2);
    assert_eq!(monday.orphans.len(), 1);
    assert_eq!(monday.orphans[0].original_employee, "emp-h");
    assert_eq!(monday.orphans[0].reason, OrphanReason::Absent);
    assert_eq!(monday.orphans[0].item.shift_name(), Some("PM"));
}

#[test]
fn absence_also_suppresses_flat_shifts() {
    let a = assignment(Some("emp-m"), vec![flat_shift("sh-admin", "ADMIN", 480)]);
    let exceptions =
        Exceptions::new(&[], &[absence("emp-m", MONDAY, TUESDAY, &[])], &[], &[]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert!(monday.activations.is_empty());
    assert_eq!(monday.orphans.len(), 1);
    assert_eq!(monday.orphans[0].duration_minutes, 480);
}

#[test]
fn absence_of_someone_else_changes_nothing() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions =
        Exceptions::new(&[], &[absence("emp-v", MONDAY, MONDAY, &[])], &[], &[]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 3);
    assert!(monday.orphans.is_empty());
}

#[test]
fn inverted_absence_range_is_rejected() {
    let err = Exceptions::new(&[], &[absence("emp-h", TUESDAY, MONDAY, &[])], &[], &[]).unwrap_err();
    assert!(matches!(err, RosterError::InvalidDateRange { .. }));
}

#[test]
fn inactive_driver_orphans_everything() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::new(&[], &[], &[employee("emp-h", true)], &[]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert!(monday.activations.is_empty());
    assert_eq!(monday.orphans.len(), 3);
    assert!(monday
        .orphans
        .iter()
        .all(|o| o.reason == OrphanReason::Inactive));
}

#[test]
fn unassigned_circuit_yields_driverless_activations() {
    let a = assignment(None, am_pm());
    let monday = expand_assignment(&a, date(MONDAY), &Exceptions::default()).unwrap();

    assert_eq!(monday.activations.len(), 3);
    assert!(monday.activations.iter().all(|a| a.employee_id.is_none()));
    assert!(monday.orphans.is_empty());
}

// ---------------------------------------------------------------------------
// Block reassignments
// ---------------------------------------------------------------------------

fn reassignment(new_employee: Option<&str>) -> BlockReassignment {
    BlockReassignment {
        id: "re-1".to_string(),
        date: date(MONDAY),
        assignment_id: "asg-204".to_string(),
        shift_id: "sh-am".to_string(),
        block_id: "b-am-1".to_string(),
        new_employee_id: new_employee.map(str::to_string),
    }
}

#[test]
fn reassigned_block_moves_to_new_driver_for_that_date_only() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::new(&[], &[], &[], &[reassignment(Some("emp-v"))]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    let moved: Vec<_> = monday
        .activations
        .iter()
        .filter(|a| a.employee_id.as_deref() == Some("emp-v"))
        .collect();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].duration_minutes, 60);

    let tuesday = expand_assignment(&a, date(TUESDAY), &exceptions).unwrap();
    assert!(tuesday
        .activations
        .iter()
        .all(|a| a.employee_id.as_deref() == Some("emp-h")));
}

#[test]
fn released_block_goes_to_replacements() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::new(&[], &[], &[], &[reassignment(None)]).unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 2);
    assert_eq!(monday.orphans.len(), 1);
    assert_eq!(monday.orphans[0].reason, OrphanReason::Released);
    assert_eq!(monday.orphans[0].original_employee, "emp-h");
}

#[test]
fn reassignment_to_absent_driver_is_orphaned() {
    let a = assignment(Some("emp-h"), am_pm());
    let exceptions = Exceptions::new(
        &[],
        &[absence("emp-v", MONDAY, MONDAY, &[])],
        &[],
        &[reassignment(Some("emp-v"))],
    )
    .unwrap();

    let monday = expand_assignment(&a, date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.orphans.len(), 1);
    assert_eq!(monday.orphans[0].original_employee, "emp-v");
}

// ---------------------------------------------------------------------------
// Temporary tasks
// ---------------------------------------------------------------------------

fn task(employee: Option<&str>) -> TemporaryTask {
    TemporaryTask {
        id: "t-1".to_string(),
        name: "Sortie musée".to_string(),
        date: date(MONDAY),
        start: "09:00".parse().unwrap(),
        end: "11:30".parse().unwrap(),
        employee_id: employee.map(str::to_string),
        school_id: Some("sch-1".to_string()),
    }
}

#[test]
fn task_is_active_only_on_its_date_even_on_holidays() {
    let exceptions = Exceptions::new(&[holiday(MONDAY)], &[], &[], &[]).unwrap();

    let monday = expand_task(&task(Some("emp-h")), date(MONDAY), &exceptions).unwrap();
    assert_eq!(monday.activations.len(), 1);
    assert_eq!(monday.activations[0].duration_minutes, 150);

    assert!(expand_task(&task(Some("emp-h")), date(TUESDAY), &exceptions)
        .unwrap()
        .is_empty());
}

#[test]
fn task_only_yields_to_whole_day_absence() {
    let partial =
        Exceptions::new(&[], &[absence("emp-h", MONDAY, MONDAY, &["AM"])], &[], &[]).unwrap();
    let whole = Exceptions::new(&[], &[absence("emp-h", MONDAY, MONDAY, &[])], &[], &[]).unwrap();

    let kept = expand_task(&task(Some("emp-h")), date(MONDAY), &partial).unwrap();
    assert_eq!(kept.activations.len(), 1);

    let orphaned = expand_task(&task(Some("emp-h")), date(MONDAY), &whole).unwrap();
    assert!(orphaned.activations.is_empty());
    assert_eq!(orphaned.orphans.len(), 1);
    assert!(matches!(orphaned.orphans[0].item, WorkItem::Task { .. }));
}

#[test]
fn task_with_reversed_window_is_rejected() {
    let mut t = task(None);
    t.end = "08:00".parse().unwrap();
    assert!(matches!(
        expand_task(&t, date(MONDAY), &Exceptions::default()),
        Err(RosterError::InvalidTimeRange { .. })
    ));
}

// ---------------------------------------------------------------------------
// Validation and source-level expansion
// ---------------------------------------------------------------------------

#[test]
fn malformed_assignments_are_rejected() {
    let mut inverted = assignment(Some("emp-h"), am_pm());
    inverted.end_date = date("2025-01-01");
    assert!(matches!(
        expand_assignment(&inverted, date(MONDAY), &Exceptions::default()),
        Err(RosterError::InvalidDateRange { .. })
    ));

    let both = Shift {
        flat_minutes: Some(60),
        ..block_shift("sh", "AM", vec![block("b", "07:00", "08:00", 0, 0, SCHOOL_WEEK)])
    };
    assert!(matches!(
        expand_assignment(&assignment(Some("emp-h"), vec![both]), date(MONDAY), &Exceptions::default()),
        Err(RosterError::InvalidShift { .. })
    ));
}

#[test]
fn expand_dates_reads_everything_from_the_source() {
    let snapshot = Snapshot {
        employees: vec![employee("emp-h", false)],
        assignments: vec![assignment(Some("emp-h"), am_pm())],
        temporary_tasks: vec![task(Some("emp-h"))],
        holidays: vec![holiday(TUESDAY)],
        ..Snapshot::default()
    };

    let expansion = expand_dates(&snapshot, &[date(MONDAY), date(TUESDAY)]).unwrap();
    // Monday: 3 blocks + 1 task. Tuesday: holiday.
    assert_eq!(expansion.activations.len(), 4);
    assert!(expansion
        .activations
        .iter()
        .all(|a| a.date == date(MONDAY)));
}

#[test]
fn snapshot_json_accepts_hlp_aliases_and_weekday_codes() {
    let snapshot = Snapshot::from_json(
        r#"{
            "assignments": [{
                "id": "a", "circuit_number": "7", "employee_id": "e",
                "start_date": "2025-01-01", "end_date": "2025-12-31",
                "shifts": [{"id": "s", "name": "MIDI", "blocks": [{
                    "id": "b", "school_id": "x",
                    "start_time": "11:30", "end_time": "12:15",
                    "hlp_before": 10, "hlp_after": 5,
                    "days": ["lundi", "WE"]
                }]}]
            }]
        }"#,
    )
    .unwrap();

    let block = &snapshot.assignments[0].shifts[0].blocks[0];
    assert_eq!(block.approach_before, 10);
    assert_eq!(block.approach_after, 5);
    assert_eq!(block.days.days(), vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(block.effective_span().duration_minutes(), 60);

    let bad = Snapshot::from_json(
        r#"{"temporary_tasks": [{"id": "t", "name": "x", "date": "2025-01-06",
            "start_time": "7h30", "end_time": "08:00"}]}"#,
    );
    assert!(matches!(bad, Err(RosterError::SnapshotParse(_))));
}
