//! Work items that need a replacement driver.
//!
//! Three disjoint lists come out of an expansion:
//!
//! - circuits that have no driver at all,
//! - temporary tasks that have no driver at all,
//! - items whose driver is absent, inactive, or released the block for the day.
//!
//! Holiday-suppressed work is not a replacement need and never shows up here,
//! because the expander does not produce it in the first place.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::expander::{Activation, OrphanCandidate, WorkItem};
use crate::model::TemporaryTask;
use crate::time::MinuteSpan;

/// A circuit with no driver, with what it needs covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedAssignment {
    pub assignment_id: String,
    pub circuit_number: String,
    /// Dates on which the circuit runs without a driver.
    pub dates: Vec<NaiveDate>,
    pub activations: Vec<Activation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedTask {
    pub task_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub span: Option<MinuteSpan>,
    pub school_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Replacements {
    pub unassigned_assignments: Vec<UnassignedAssignment>,
    pub unassigned_tasks: Vec<UnassignedTask>,
    pub absence_orphans: Vec<OrphanCandidate>,
}

impl Replacements {
    pub fn is_empty(&self) -> bool {
        self.unassigned_assignments.is_empty()
            && self.unassigned_tasks.is_empty()
            && self.absence_orphans.is_empty()
    }
}

/// Sort key for circuit numbers: numeric circuits first in numeric order, then
/// the rest lexically.
pub fn circuit_order(circuit_number: &str) -> (u8, u64, String) {
    match circuit_number.trim().parse::<u64>() {
        Ok(n) => (0, n, circuit_number.to_string()),
        Err(_) => (1, 0, circuit_number.to_string()),
    }
}

/// Build the replacement lists.
///
/// `tasks` gives the creation order used to sort task entries; tasks missing
/// from it sort last.
pub fn resolve_replacements(
    activations: &[Activation],
    orphans: &[OrphanCandidate],
    tasks: &[TemporaryTask],
) -> Replacements {
    let task_rank: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();
    let rank_of = |item: &WorkItem| {
        item.task_id()
            .and_then(|id| task_rank.get(id).copied())
            .unwrap_or(usize::MAX)
    };

    let mut unassigned_assignments: Vec<UnassignedAssignment> = Vec::new();
    let mut unassigned_tasks: Vec<UnassignedTask> = Vec::new();

    for activation in activations.iter().filter(|a| a.employee_id.is_none()) {
        match &activation.item {
            WorkItem::Block {
                assignment_id,
                circuit_number,
                ..
            }
            | WorkItem::Flat {
                assignment_id,
                circuit_number,
                ..
            } => {
                let entry = match unassigned_assignments
                    .iter()
                    .position(|u| &u.assignment_id == assignment_id)
                {
                    Some(i) => &mut unassigned_assignments[i],
                    None => {
                        unassigned_assignments.push(UnassignedAssignment {
                            assignment_id: assignment_id.clone(),
                            circuit_number: circuit_number.clone(),
                            dates: Vec::new(),
                            activations: Vec::new(),
                        });
                        let last = unassigned_assignments.len() - 1;
                        &mut unassigned_assignments[last]
                    }
                };
                if !entry.dates.contains(&activation.date) {
                    entry.dates.push(activation.date);
                }
                entry.activations.push(activation.clone());
            }
            WorkItem::Task {
                task_id,
                name,
                school_id,
            } => unassigned_tasks.push(UnassignedTask {
                task_id: task_id.clone(),
                name: name.clone(),
                date: activation.date,
                span: activation.span,
                school_id: school_id.clone(),
            }),
        }
    }

    for entry in &mut unassigned_assignments {
        entry.dates.sort();
    }
    unassigned_assignments.sort_by(|a, b| {
        circuit_order(&a.circuit_number)
            .cmp(&circuit_order(&b.circuit_number))
            .then_with(|| a.assignment_id.cmp(&b.assignment_id))
    });
    unassigned_tasks.sort_by_key(|t| {
        (
            task_rank.get(t.task_id.as_str()).copied().unwrap_or(usize::MAX),
            t.date,
        )
    });

    let mut absence_orphans = orphans.to_vec();
    absence_orphans.sort_by_cached_key(|o| {
        let circuit = match &o.item {
            WorkItem::Block { circuit_number, .. } | WorkItem::Flat { circuit_number, .. } => {
                Some(circuit_order(circuit_number))
            }
            WorkItem::Task { .. } => None,
        };
        // Assignments (Some) sort before tasks (None) within a date.
        (
            o.date,
            circuit.is_none(),
            circuit,
            rank_of(&o.item),
            o.item.stable_key(),
        )
    });

    Replacements {
        unassigned_assignments,
        unassigned_tasks,
        absence_orphans,
    }
}
