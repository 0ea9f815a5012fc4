//! Detect overlapping work items in a driver's day.
//!
//! Overlap is measured on effective spans, so approach time counts as occupied
//! time. Touching items (one ends exactly when the next starts) never conflict,
//! and overlaps up to the configured tolerance are ignored. Flat-rate shifts
//! have no time window and never take part.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::expander::{Activation, WorkItem};
use crate::time::MinuteSpan;

/// Which kind of entity a conflicting item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Assignment,
    Task,
}

/// One side of a conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictItem {
    pub kind: ConflictKind,
    pub item: WorkItem,
    pub span: MinuteSpan,
    /// Effective span rendered as `"HH:MM-HH:MM"`.
    pub time_range: String,
}

impl ConflictItem {
    /// `None` for activations without a time window.
    pub fn from_activation(activation: &Activation) -> Option<Self> {
        let span = activation.span?;
        let kind = match activation.item {
            WorkItem::Task { .. } => ConflictKind::Task,
            WorkItem::Block { .. } | WorkItem::Flat { .. } => ConflictKind::Assignment,
        };
        Some(Self {
            kind,
            item: activation.item.clone(),
            span,
            time_range: span.to_string(),
        })
    }
}

/// Two committed activations of the same day that overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub date: NaiveDate,
    /// The side with the smaller stable key.
    pub first: ConflictItem,
    pub second: ConflictItem,
    pub overlap_minutes: i64,
}

/// An existing item that a proposed time window would overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictDescriptor {
    #[serde(flatten)]
    pub with: ConflictItem,
    pub overlap_minutes: i64,
}

/// Find every pair of activations whose effective spans overlap by more than
/// `min_overlap_minutes`.
///
/// Activations are swept in start order; each is compared with every later one
/// that starts before it ends, so three-way overlaps yield three pairs. Only
/// activations on the same date are compared. Each unordered pair is reported
/// once with the smaller stable key first.
///
/// Output is sorted by overlap (largest first), then by the pair's stable keys,
/// so identical inputs always produce identical output.
pub fn find_conflicts(activations: &[Activation], min_overlap_minutes: i64) -> Vec<Conflict> {
    let mut timed: Vec<(&Activation, MinuteSpan, String)> = activations
        .iter()
        .filter_map(|a| a.span.map(|span| (a, span, a.item.stable_key())))
        .collect();
    timed.sort_by(|(a, a_span, a_key), (b, b_span, b_key)| {
        (a.date, a_span.start, a_span.end, a_key).cmp(&(b.date, b_span.start, b_span.end, b_key))
    });

    let mut conflicts = Vec::new();
    for (i, (a, a_span, a_key)) in timed.iter().enumerate() {
        let later = timed[i + 1..]
            .iter()
            .take_while(|(b, b_span, _)| b.date == a.date && b_span.start < a_span.end);

        for (b, b_span, b_key) in later {
            if a_key == b_key {
                continue;
            }
            let overlap_minutes = a_span.overlap_minutes(b_span);
            if overlap_minutes <= min_overlap_minutes {
                continue;
            }

            let (first, second) = if a_key <= b_key { (*a, *b) } else { (*b, *a) };
            if let (Some(first), Some(second)) = (
                ConflictItem::from_activation(first),
                ConflictItem::from_activation(second),
            ) {
                conflicts.push(Conflict {
                    date: a.date,
                    first,
                    second,
                    overlap_minutes,
                });
            }
        }
    }

    conflicts.sort_by(compare_conflicts);
    conflicts
}

fn compare_conflicts(a: &Conflict, b: &Conflict) -> Ordering {
    b.overlap_minutes
        .cmp(&a.overlap_minutes)
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.first.item.stable_key().cmp(&b.first.item.stable_key()))
        .then_with(|| a.second.item.stable_key().cmp(&b.second.item.stable_key()))
}

/// Compare a proposed time window against existing activations.
///
/// Returns a descriptor for every existing item overlapping `candidate` by more
/// than `min_overlap_minutes`, largest overlap first, ties by stable key.
pub fn conflicts_with<'a, I>(
    candidate: MinuteSpan,
    existing: I,
    min_overlap_minutes: i64,
) -> Vec<ConflictDescriptor>
where
    I: IntoIterator<Item = &'a Activation>,
{
    let mut descriptors: Vec<ConflictDescriptor> = existing
        .into_iter()
        .filter_map(ConflictItem::from_activation)
        .filter_map(|with| {
            let overlap_minutes = candidate.overlap_minutes(&with.span);
            (overlap_minutes > min_overlap_minutes).then_some(ConflictDescriptor {
                with,
                overlap_minutes,
            })
        })
        .collect();

    descriptors.sort_by(|a, b| {
        b.overlap_minutes
            .cmp(&a.overlap_minutes)
            .then_with(|| a.with.item.stable_key().cmp(&b.with.item.stable_key()))
    });
    descriptors
}
