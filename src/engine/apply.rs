// src/engine/apply.rs

//! Edit pipeline for a single project schedule.
//!
//! Every function here takes the committed schedule by shared reference,
//! works on a copy, and only hands the copy back when the whole edit
//! validated. A rejected edit leaves nothing behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::CatalogEntry;
use crate::dag::{GraphWarning, ensure_acyclic, resync};
use crate::engine::EngineOptions;
use crate::engine::constraint::{
    ConstraintBounds, DateInput, compute_min_constraints, reconcile_dates,
};
use crate::engine::propagate::{PropagationReport, propagate_from};
use crate::errors::{EntityKind, PlandagError, Result};
use crate::model::{
    ActivityId, ActivityNode, PredecessorLink, ProjectSchedule, ResourceRequirement,
};

/// Fields an edit may change on one activity. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_finish: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub percent_complete: Option<u8>,
    #[serde(default)]
    pub predecessors: Option<Vec<PredecessorLink>>,
    #[serde(default)]
    pub resources: Option<Vec<ResourceRequirement>>,
}

impl ActivityPatch {
    pub fn dates(&self) -> DateInput {
        DateInput {
            start: self.planned_start,
            finish: self.planned_finish,
            duration: self.duration,
        }
    }

    /// Whether the edit can move the activity's allowed window.
    pub fn touches_schedule(&self) -> bool {
        !self.dates().is_empty() || self.predecessors.is_some()
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self
    }

    pub fn with_finish(mut self, finish: NaiveDate) -> Self {
        self.planned_finish = Some(finish);
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_predecessors(mut self, predecessors: Vec<PredecessorLink>) -> Self {
        self.predecessors = Some(predecessors);
        self
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Accepted edit: the resulting node plus diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub activity: ActivityNode,
    pub bounds: ConstraintBounds,
    pub propagation: PropagationReport,
    pub warnings: Vec<GraphWarning>,
}

/// Validate `patch` against the whole graph and return the updated schedule.
///
/// Order of checks: patch sanity, dangling-edge cleanup and successor
/// rebuild, acyclicity (`DependencyCycle`), duration reconciliation, then
/// the predecessor constraints (`ConstraintViolation`). Only when all pass
/// are downstream activities shifted forward.
pub fn validate_and_apply(
    schedule: &ProjectSchedule,
    activity_id: &str,
    patch: &ActivityPatch,
    options: &EngineOptions,
) -> Result<(ProjectSchedule, ApplyOutcome)> {
    let current = schedule.get(activity_id)?;
    check_patch(patch)?;

    let mut working = schedule.clone();
    {
        let node = working.get_mut(activity_id)?;
        if let Some(name) = &patch.name {
            node.name = name.clone();
        }
        if let Some(percent) = patch.percent_complete {
            node.percent_complete = percent;
        }
        if let Some(resources) = &patch.resources {
            node.resources = resources.clone();
        }
        if let Some(predecessors) = &patch.predecessors {
            node.predecessors = predecessors.clone();
        }
    }

    let warnings = resync(&mut working);
    let order = ensure_acyclic(&working.nodes).inspect_err(|err| {
        warn!(project = %schedule.project_id, activity = %activity_id, error = %err, "edit rejected");
    })?;

    if patch.touches_schedule() {
        let dates = reconcile_dates(patch.dates(), current)?;
        let node = working.get_mut(activity_id)?;
        node.planned_start = dates.start;
        node.planned_finish = dates.finish;
        node.duration = dates.duration;
    }

    let node = working.get(activity_id)?;
    let bounds = compute_min_constraints(node, &working.nodes, options.use_actuals);
    if patch.touches_schedule() {
        bounds
            .check(&node.id, node.planned_start, node.planned_finish)
            .map_err(|violation| {
                warn!(
                    project = %schedule.project_id,
                    activity = %activity_id,
                    min_start = ?violation.min_start,
                    min_finish = ?violation.min_finish,
                    "edit rejected: dates precede predecessor constraints"
                );
                PlandagError::from(violation)
            })?;
    }

    let propagation = propagate_from(&mut working, activity_id, &order, options.use_actuals);
    let activity = working.get(activity_id)?.clone();

    info!(
        project = %schedule.project_id,
        activity = %activity_id,
        shifted = propagation.shifted.len(),
        warnings = warnings.len(),
        "edit validated"
    );

    Ok((
        working,
        ApplyOutcome {
            activity,
            bounds,
            propagation,
            warnings,
        },
    ))
}

/// Add a new node to the schedule through the same validation as an edit.
///
/// A node with `order == 0` is appended after the current last node. The
/// node's own dates are reconciled and checked against its predecessors.
pub fn attach_activity(
    schedule: &ProjectSchedule,
    mut node: ActivityNode,
    options: &EngineOptions,
) -> Result<(ProjectSchedule, ApplyOutcome)> {
    if schedule.contains(node.id.as_str()) {
        return Err(PlandagError::InvalidPatch(format!(
            "activity '{}' already exists in project '{}'",
            node.id, schedule.project_id
        )));
    }
    if node.percent_complete > 100 {
        return Err(PlandagError::InvalidPatch(format!(
            "percent_complete must be 0..=100 (got {})",
            node.percent_complete
        )));
    }
    check_resources(&node.resources)?;
    if node.order == 0 {
        node.order = schedule.next_order();
    }

    // With both dates present the span decides the duration.
    let duration = match (node.planned_start, node.planned_finish) {
        (Some(_), Some(_)) => None,
        _ => Some(node.duration),
    };
    let dates = reconcile_dates(
        DateInput {
            start: node.planned_start,
            finish: node.planned_finish,
            duration,
        },
        &node,
    )?;
    node.planned_start = dates.start;
    node.planned_finish = dates.finish;
    node.duration = dates.duration;

    let id = node.id.clone();
    let mut working = schedule.clone();
    working.insert(node);

    let warnings = resync(&mut working);
    let order = ensure_acyclic(&working.nodes)?;

    let node = working.get(id.as_str())?;
    let bounds = compute_min_constraints(node, &working.nodes, options.use_actuals);
    bounds.check(&node.id, node.planned_start, node.planned_finish)?;

    let propagation = propagate_from(&mut working, id.as_str(), &order, options.use_actuals);
    let activity = working.get(id.as_str())?.clone();

    info!(project = %schedule.project_id, activity = %id, "activity attached");

    Ok((
        working,
        ApplyOutcome {
            activity,
            bounds,
            propagation,
            warnings,
        },
    ))
}

/// Build a node for `entry`, resolving the catalog's default predecessors
/// against nodes of `schedule` that were attached from those catalog ids.
///
/// Catalog predecessors with no matching node are reported and skipped.
pub fn node_from_catalog(
    schedule: &ProjectSchedule,
    entry: &CatalogEntry,
    id: ActivityId,
) -> (ActivityNode, Vec<GraphWarning>) {
    let mut node = ActivityNode::new(id);
    node.catalog_activity_id = Some(entry.id.clone());
    node.name = entry.name.clone();
    node.kind = entry.kind;
    node.duration = entry.duration.max(1);
    node.resources = entry.resources.clone();
    node.dependencies = entry
        .dependencies
        .iter()
        .map(|template| template.instantiate())
        .collect();

    let mut warnings = Vec::new();
    for pred in &entry.predecessors {
        let matches: Vec<&ActivityNode> = schedule
            .nodes()
            .filter(|n| n.catalog_activity_id.as_ref() == Some(&pred.catalog_activity_id))
            .collect();

        if matches.is_empty() {
            debug!(
                catalog = %entry.id,
                missing = %pred.catalog_activity_id,
                "catalog predecessor not attached to this project"
            );
            warnings.push(GraphWarning::UnresolvedCatalogPredecessor {
                activity: node.id.clone(),
                catalog_activity: pred.catalog_activity_id.clone(),
            });
            continue;
        }

        for m in matches {
            node.predecessors
                .push(PredecessorLink::new(m.id.clone(), pred.link_type, pred.lag));
        }
    }

    (node, warnings)
}

/// Remove a node, strip every edge that references it and resync.
pub fn remove_activity(
    schedule: &ProjectSchedule,
    activity_id: &str,
) -> Result<(ProjectSchedule, ActivityNode, Vec<GraphWarning>)> {
    let mut working = schedule.clone();
    let removed = working
        .remove(activity_id)
        .ok_or_else(|| PlandagError::not_found(EntityKind::Activity, activity_id))?;

    let warnings = resync(&mut working);
    info!(project = %schedule.project_id, activity = %activity_id, "activity removed");
    Ok((working, removed, warnings))
}

/// Assign dense `order` values `1..=n`.
///
/// Ids in `ordered_ids` come first, in that order; unknown and repeated ids
/// are ignored (and returned). Any activity not listed keeps its relative
/// position and is appended at the tail.
pub fn reorder(
    schedule: &ProjectSchedule,
    ordered_ids: &[ActivityId],
) -> (ProjectSchedule, Vec<ActivityId>) {
    let mut working = schedule.clone();
    let mut sequence: Vec<ActivityId> = Vec::with_capacity(working.len());
    let mut ignored = Vec::new();

    for id in ordered_ids {
        if !working.contains(id.as_str()) || sequence.contains(id) {
            ignored.push(id.clone());
            continue;
        }
        sequence.push(id.clone());
    }

    let tail: Vec<ActivityId> = working
        .ordered()
        .into_iter()
        .map(|n| n.id.clone())
        .filter(|id| !sequence.contains(id))
        .collect();
    sequence.extend(tail);

    for (idx, id) in sequence.iter().enumerate() {
        if let Some(node) = working.node_mut(id.as_str()) {
            node.order = idx as u32 + 1;
        }
    }

    if !ignored.is_empty() {
        debug!(project = %schedule.project_id, ?ignored, "reorder ignored unknown or repeated ids");
    }

    (working, ignored)
}

fn check_patch(patch: &ActivityPatch) -> Result<()> {
    if let Some(percent) = patch.percent_complete {
        if percent > 100 {
            return Err(PlandagError::InvalidPatch(format!(
                "percent_complete must be 0..=100 (got {percent})"
            )));
        }
    }
    if let Some(resources) = &patch.resources {
        check_resources(resources)?;
    }
    Ok(())
}

fn check_resources(resources: &[ResourceRequirement]) -> Result<()> {
    if let Some(bad) = resources.iter().find(|r| r.number == 0) {
        return Err(PlandagError::InvalidPatch(format!(
            "resource '{}' must request at least 1 unit",
            bad.role
        )));
    }
    Ok(())
}
