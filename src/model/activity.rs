// src/model/activity.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::dates::{finish_from_start, inclusive_span};
use crate::model::ids::{ActivityId, CatalogActivityId, DependencyId, ResourceRole};
use crate::types::{ActivityKind, ActivityStatus, DependencyStatus, LinkType};

/// Edge owned by the child: "this activity waits on `activity_id`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredecessorLink {
    pub activity_id: ActivityId,
    #[serde(default)]
    pub link_type: LinkType,
    /// Signed offset in days; negative values express overlap.
    #[serde(default)]
    pub lag: i32,
}

impl PredecessorLink {
    pub fn new(activity_id: impl Into<ActivityId>, link_type: LinkType, lag: i32) -> Self {
        Self {
            activity_id: activity_id.into(),
            link_type,
            lag,
        }
    }

    pub fn fs(activity_id: impl Into<ActivityId>, lag: i32) -> Self {
        Self::new(activity_id, LinkType::FinishToStart, lag)
    }
}

/// Mirror of a [`PredecessorLink`] stored on the predecessor.
///
/// Never edited directly; always produced by
/// [`rebuild_successors`](crate::dag::graph::rebuild_successors).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuccessorLink {
    pub activity_id: ActivityId,
    pub link_type: LinkType,
    pub lag: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    #[serde(rename = "type")]
    pub role: ResourceRole,
    pub number: u32,
}

impl ResourceRequirement {
    pub fn new(role: impl Into<ResourceRole>, number: u32) -> Self {
        Self {
            role: role.into(),
            number,
        }
    }
}

/// A timestamped status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry<S> {
    pub status: S,
    pub at: DateTime<Utc>,
}

/// External entity (purchase order, permit, ...) gated on an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub id: DependencyId,
    pub external_model: String,
    pub external_id: String,
    pub display_name: String,
    /// Who should be asked to act once the dependency is allowed.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: DependencyStatus,
    #[serde(default)]
    pub status_history: Vec<StatusEntry<DependencyStatus>>,
}

impl ExternalDependency {
    pub fn new(
        id: impl Into<DependencyId>,
        external_model: impl Into<String>,
        external_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_model: external_model.into(),
            external_id: external_id.into(),
            display_name: display_name.into(),
            assignee: None,
            status: DependencyStatus::NotAllowed,
            status_history: Vec::new(),
        }
    }

    /// Record a new status; no-op when the status does not change.
    pub fn set_status(&mut self, status: DependencyStatus, at: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.status_history.push(StatusEntry { status, at });
        true
    }
}

/// One activity attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityNode {
    pub id: ActivityId,
    #[serde(default)]
    pub catalog_activity_id: Option<CatalogActivityId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub order: u32,

    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_finish: Option<NaiveDate>,
    /// Inclusive length in days; never below 1.
    pub duration: u32,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_finish: Option<NaiveDate>,
    #[serde(default)]
    pub percent_complete: u8,

    #[serde(default)]
    pub predecessors: Vec<PredecessorLink>,
    #[serde(default)]
    pub successors: Vec<SuccessorLink>,
    #[serde(default)]
    pub resources: Vec<ResourceRequirement>,
    #[serde(default)]
    pub dependencies: Vec<ExternalDependency>,

    #[serde(default)]
    pub current_status: ActivityStatus,
    #[serde(default)]
    pub status_history: Vec<StatusEntry<ActivityStatus>>,
}

impl ActivityNode {
    pub fn new(id: impl Into<ActivityId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            catalog_activity_id: None,
            kind: ActivityKind::default(),
            order: 0,
            planned_start: None,
            planned_finish: None,
            duration: 1,
            actual_start: None,
            actual_finish: None,
            percent_complete: 0,
            predecessors: Vec::new(),
            successors: Vec::new(),
            resources: Vec::new(),
            dependencies: Vec::new(),
            current_status: ActivityStatus::NotStarted,
            status_history: Vec::new(),
        }
    }

    /// Start date used when this node acts as a predecessor.
    pub fn effective_start(&self, use_actuals: bool) -> Option<NaiveDate> {
        if use_actuals {
            self.actual_start.or(self.planned_start)
        } else {
            self.planned_start
        }
    }

    /// Finish date used when this node acts as a predecessor.
    pub fn effective_finish(&self, use_actuals: bool) -> Option<NaiveDate> {
        if use_actuals {
            self.actual_finish.or(self.planned_finish)
        } else {
            self.planned_finish
        }
    }

    /// Planned interval when both planned dates are known.
    pub fn planned_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.planned_start?, self.planned_finish?))
    }

    /// Move the planned start, keeping the duration.
    pub fn reschedule_from(&mut self, start: NaiveDate) {
        self.planned_start = Some(start);
        self.planned_finish = Some(finish_from_start(start, self.duration));
    }

    /// Whether planned dates and duration agree (`finish - start + 1 == duration`).
    pub fn duration_consistent(&self) -> bool {
        match self.planned_span() {
            Some((start, finish)) => inclusive_span(start, finish) == i64::from(self.duration),
            None => true,
        }
    }

    pub fn dependency_mut(&mut self, id: &str) -> Option<&mut ExternalDependency> {
        self.dependencies.iter_mut().find(|d| d.id.as_str() == id)
    }

    pub fn is_completed(&self) -> bool {
        self.current_status == ActivityStatus::Completed
    }
}
