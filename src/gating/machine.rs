// src/gating/machine.rs

//! Activity lifecycle state machine and dependency gating.
//!
//! Transitions:
//! - `not_started -> in_progress -> completed`
//! - `completed -> in_progress` (regression)
//! - any state `-> not_started` (manual reset)
//!
//! A dependency is `allowed` only while its owning activity is completed.
//! An external actor may then mark it `approved` or `rejected`, which holds
//! until the owner changes status again.

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::PropagationReport;
use crate::errors::{EntityKind, PlandagError, Result};
use crate::gating::dispatch::{IdempotencyKey, TaskRequest};
use crate::model::{
    ActivityId, ActivityNode, DependencyId, ExternalDependency, ProjectId, ProjectSchedule,
    StatusEntry,
};
use crate::types::{ActivityStatus, DependencyDecision, DependencyStatus};

/// Settings that shape emitted task requests.
#[derive(Debug, Clone, Default)]
pub struct GatingPolicy {
    /// Assignee used when a dependency names none.
    pub default_assignee: Option<String>,
}

/// Result of a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub activity: ActivityId,
    pub from: ActivityStatus,
    pub to: ActivityStatus,
    /// `false` when the activity was already in the requested status.
    pub changed: bool,
    /// New task requests; each key appears here at most once per project.
    pub emitted: Vec<TaskRequest>,
    pub plan_status_changed: bool,
    /// Successors pushed forward because the activity's actual dates moved.
    pub propagation: PropagationReport,
}

/// Whether the lifecycle allows moving from `from` to `to`.
///
/// Same-state "transitions" are accepted as no-ops and are not covered here.
pub fn can_transition(from: ActivityStatus, to: ActivityStatus) -> bool {
    use ActivityStatus::*;

    matches!(
        (from, to),
        (NotStarted, InProgress)
            | (InProgress, Completed)
            | (Completed, InProgress)
            | (InProgress, NotStarted)
            | (Completed, NotStarted)
    )
}

/// Apply a status transition to one activity of `schedule`.
///
/// Status, actual dates, dependency fan-out and the idempotency ledger are
/// all updated on `schedule` in one go; callers persist it before handing
/// the returned requests to a task service.
pub fn transition(
    schedule: &mut ProjectSchedule,
    activity_id: &str,
    to: ActivityStatus,
    clock: &dyn Clock,
    policy: &GatingPolicy,
) -> Result<TransitionOutcome> {
    let project_id = schedule.project_id.clone();
    let node = schedule.get_mut(activity_id)?;
    let from = node.current_status;

    if from == to {
        debug!(activity = %activity_id, status = %to, "status unchanged; nothing to do");
        return Ok(TransitionOutcome {
            activity: node.id.clone(),
            from,
            to,
            changed: false,
            emitted: Vec::new(),
            plan_status_changed: false,
            propagation: PropagationReport::default(),
        });
    }

    if !can_transition(from, to) {
        return Err(PlandagError::invalid_transition(activity_id, from, to));
    }

    let now = clock.now();
    let today = clock.today();

    node.current_status = to;
    node.status_history.push(StatusEntry { status: to, at: now });

    let gate = match to {
        ActivityStatus::InProgress => {
            node.actual_finish = None;
            node.actual_start.get_or_insert(today);
            DependencyStatus::NotAllowed
        }
        ActivityStatus::Completed => {
            node.actual_finish.get_or_insert(today);
            node.percent_complete = 100;
            DependencyStatus::Allowed
        }
        ActivityStatus::NotStarted => {
            node.actual_start = None;
            node.actual_finish = None;
            node.percent_complete = 0;
            DependencyStatus::NotAllowed
        }
    };

    for dep in node.dependencies.iter_mut() {
        dep.set_status(gate, now);
    }

    let node: &ActivityNode = node;
    let candidates: Vec<TaskRequest> = if to == ActivityStatus::Completed {
        node.dependencies
            .iter()
            .map(|dep| task_request(&project_id, node, dep, policy))
            .collect()
    } else {
        Vec::new()
    };

    let activity = node.id.clone();
    let dependency_count = node.dependencies.len();

    let emitted: Vec<TaskRequest> = candidates
        .into_iter()
        .filter(|req| schedule.emitted_task_keys.insert(req.idempotency_key.clone()))
        .collect();

    let plan_status_changed = schedule.refresh_plan_status(now);

    info!(
        project = %project_id,
        activity = %activity,
        from = %from,
        to = %to,
        dependencies = dependency_count,
        emitted = emitted.len(),
        "activity status changed"
    );

    Ok(TransitionOutcome {
        activity,
        from,
        to,
        changed: true,
        emitted,
        plan_status_changed,
        propagation: PropagationReport::default(),
    })
}

/// Record an external approval or rejection on an allowed dependency.
pub fn decide_dependency(
    schedule: &mut ProjectSchedule,
    activity_id: &str,
    dependency_id: &str,
    decision: DependencyDecision,
    clock: &dyn Clock,
) -> Result<DependencyStatus> {
    let node = schedule.get_mut(activity_id)?;
    let dep = node
        .dependency_mut(dependency_id)
        .ok_or_else(|| PlandagError::not_found(EntityKind::Dependency, dependency_id))?;

    let target = DependencyStatus::from(decision);
    if dep.status != DependencyStatus::Allowed {
        return Err(PlandagError::InvalidTransition {
            activity: format!("{activity_id}/{dependency_id}"),
            from: dep.status.to_string(),
            to: target.to_string(),
        });
    }

    dep.set_status(target, clock.now());
    info!(
        activity = %activity_id,
        dependency = %dependency_id,
        status = %target,
        "dependency decision recorded"
    );
    Ok(target)
}

fn task_request(
    project_id: &ProjectId,
    node: &ActivityNode,
    dep: &ExternalDependency,
    policy: &GatingPolicy,
) -> TaskRequest {
    TaskRequest {
        title: format!("{} can proceed", dep.display_name),
        description: format!(
            "Activity '{}' is completed; {} '{}' is now allowed.",
            node.name, dep.external_model, dep.external_id
        ),
        project_id: project_id.clone(),
        assignee: dep
            .assignee
            .clone()
            .or_else(|| policy.default_assignee.clone()),
        idempotency_key: IdempotencyKey::new(
            node.id.clone(),
            dep.id.clone(),
            dep.external_id.clone(),
        ),
        source_reference: source_reference(project_id, &node.id, &dep.id),
    }
}

fn source_reference(
    project_id: &ProjectId,
    activity: &ActivityId,
    dependency: &DependencyId,
) -> String {
    format!("{project_id}/{activity}/{dependency}")
}
