// src/engine/propagate.rs

//! Forward propagation of date shifts to downstream activities.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::dag::PrecedenceGraph;
use crate::engine::constraint::compute_min_constraints;
use crate::model::dates::{finish_from_start, shift_days};
use crate::model::{ActivityId, ProjectSchedule};

/// A single forward move applied by the propagator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shift {
    pub activity: ActivityId,
    pub from_start: NaiveDate,
    pub to_start: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    /// Number of downstream activities that were re-checked.
    pub visited: usize,
    pub shifted: Vec<Shift>,
}

/// Push every activity reachable from `origin` forward far enough to
/// satisfy its predecessors again.
///
/// `order` must be a topological order of the whole schedule (see
/// [`topo_sort`](crate::dag::topo_sort)); each reachable node is visited
/// once, in that order, so a node is only checked after all of its
/// predecessors have settled. Durations are preserved, moves are
/// forward-only, actual dates are never touched, and nodes without a
/// planned start are left alone.
pub fn propagate_from(
    schedule: &mut ProjectSchedule,
    origin: &str,
    order: &[ActivityId],
    use_actuals: bool,
) -> PropagationReport {
    let reachable: BTreeSet<ActivityId> = {
        let graph = PrecedenceGraph::from_nodes(&schedule.nodes);
        graph
            .reachable_from(origin)
            .into_iter()
            .map(ActivityId::new)
            .collect()
    };

    let mut report = PropagationReport::default();

    for id in order.iter().filter(|id| reachable.contains(*id)) {
        report.visited += 1;

        let Some(node) = schedule.nodes.get(id) else {
            continue;
        };
        let Some(start) = node.planned_start else {
            debug!(activity = %id, "no planned start; skipping propagation");
            continue;
        };

        let bounds = compute_min_constraints(node, &schedule.nodes, use_actuals);
        let target = earliest_allowed_start(
            start,
            node.duration,
            bounds.min_start,
            bounds.min_finish,
        );

        if target <= start {
            continue;
        }

        if let Some(node) = schedule.nodes.get_mut(id) {
            node.reschedule_from(target);
            let days = (target - start).num_days();
            debug!(
                activity = %id,
                from = %start,
                to = %target,
                days,
                "shifted successor forward"
            );
            report.shifted.push(Shift {
                activity: id.clone(),
                from_start: start,
                to_start: target,
                days,
            });
        }
    }

    report
}

/// Smallest start `>= start` that keeps both the start and the derived
/// finish at or after their minimums.
fn earliest_allowed_start(
    start: NaiveDate,
    duration: u32,
    min_start: Option<NaiveDate>,
    min_finish: Option<NaiveDate>,
) -> NaiveDate {
    let mut target = match min_start {
        Some(min) if min > start => min,
        _ => start,
    };

    if let Some(min) = min_finish {
        let finish = finish_from_start(target, duration);
        if finish < min {
            target = shift_days(target, (min - finish).num_days());
        }
    }

    target
}
