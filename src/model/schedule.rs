// src/model/schedule.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dag::graph::Adjacency;
use crate::errors::{EntityKind, PlandagError, Result};
use crate::gating::dispatch::IdempotencyKey;
use crate::model::activity::{ActivityNode, StatusEntry};
use crate::model::ids::{ActivityId, ProjectId};
use crate::types::{ActivityStatus, PlanStatus};

/// Aggregate root: every activity attached to one project.
///
/// Nodes are keyed by id; display order lives in [`ActivityNode::order`]
/// and is only ever used for presentation and tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSchedule {
    pub project_id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: BTreeMap<ActivityId, ActivityNode>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub status_history: Vec<StatusEntry<PlanStatus>>,
    /// Keys of every task request ever emitted for this project.
    #[serde(default)]
    pub emitted_task_keys: BTreeSet<IdempotencyKey>,
}

impl ProjectSchedule {
    pub fn new(project_id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            nodes: BTreeMap::new(),
            status: PlanStatus::NotStarted,
            status_history: Vec::new(),
            emitted_task_keys: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&ActivityNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut ActivityNode> {
        self.nodes.get_mut(id)
    }

    /// Like [`node`](Self::node) but reports a missing id as `NotFound`.
    pub fn get(&self, id: &str) -> Result<&ActivityNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| PlandagError::not_found(EntityKind::Activity, id))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut ActivityNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| PlandagError::not_found(EntityKind::Activity, id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ActivityNode> {
        self.nodes.values()
    }

    /// Nodes sorted by `(order, id)`.
    pub fn ordered(&self) -> Vec<&ActivityNode> {
        let mut nodes: Vec<&ActivityNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        nodes
    }

    /// Order value for a node appended at the end of the list.
    pub fn next_order(&self) -> u32 {
        self.nodes
            .values()
            .map(|n| n.order)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    pub fn insert(&mut self, node: ActivityNode) -> Option<ActivityNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Remove a node and every predecessor edge that points at it.
    ///
    /// Successor lists are left stale; callers must rebuild them.
    pub fn remove(&mut self, id: &str) -> Option<ActivityNode> {
        let removed = self.nodes.remove(id)?;
        for node in self.nodes.values_mut() {
            node.predecessors.retain(|p| p.activity_id.as_str() != id);
        }
        Some(removed)
    }

    /// Replace every node's successor list with the given adjacency.
    pub fn apply_adjacency(&mut self, mut adjacency: Adjacency) {
        for (id, node) in self.nodes.iter_mut() {
            node.successors = adjacency.remove(id).unwrap_or_default();
        }
    }

    /// Recompute the plan-level status from the nodes, appending to the
    /// history when it changed. Returns `true` on change.
    pub fn refresh_plan_status(&mut self, at: DateTime<Utc>) -> bool {
        let status = derive_plan_status(self.nodes.values().map(|n| n.current_status));
        if status == self.status {
            return false;
        }
        self.status = status;
        self.status_history.push(StatusEntry { status, at });
        true
    }
}

fn derive_plan_status(statuses: impl Iterator<Item = ActivityStatus>) -> PlanStatus {
    let mut any = false;
    let mut all_completed = true;
    let mut any_started = false;

    for status in statuses {
        any = true;
        match status {
            ActivityStatus::Completed => any_started = true,
            ActivityStatus::InProgress => {
                any_started = true;
                all_completed = false;
            }
            ActivityStatus::NotStarted => all_completed = false,
        }
    }

    if any && all_completed {
        PlanStatus::Completed
    } else if any_started {
        PlanStatus::InProgress
    } else {
        PlanStatus::NotStarted
    }
}
