// src/service.rs

//! Request/response facade over the engine.
//!
//! Each mutating call reads the full project aggregate, runs the pure
//! engine on a copy, and writes the result back with the version it read.
//! A concurrent writer makes the save fail with `VersionConflict`; nothing
//! is merged or partially written, and the caller retries.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::catalog::ActivityCatalog;
use crate::clock::Clock;
use crate::dag::{GraphWarning, ensure_acyclic};
use crate::engine::{self, ActivityPatch, ApplyOutcome, EngineOptions};
use crate::errors::{EntityKind, PlandagError, Result};
use crate::gating::{
    self, DispatchReport, GatingPolicy, TaskRequest, TaskService, TransitionOutcome,
};
use crate::model::{ActivityId, ActivityNode, ProjectId, ProjectSchedule, ResourceRole};
use crate::resources::{ResourceScope, ResourceSeries, aggregate_demand};
use crate::store::ScheduleStore;
use crate::types::{ActivityStatus, DependencyDecision, DependencyStatus, PlanStatus, WindowSize};

/// One line of [`PlanningService::get_schedule`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRow {
    pub activity: ActivityNode,
    /// Planned finish is before today and the activity is not completed.
    pub overdue: bool,
    /// Every predecessor is completed.
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub project_id: ProjectId,
    pub name: String,
    pub status: PlanStatus,
    pub version: u64,
    pub rows: Vec<ScheduleRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderOutcome {
    /// Activity ids in their new order.
    pub order: Vec<ActivityId>,
    /// Requested ids that were unknown or repeated.
    pub ignored: Vec<ActivityId>,
}

/// Options for attaching a catalog activity.
#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    /// Id for the new node; generated when absent.
    pub id: Option<ActivityId>,
    pub planned_start: Option<NaiveDate>,
    pub duration: Option<u32>,
}

/// Ties the engine to a store, a catalog and a clock.
#[derive(Debug, Clone)]
pub struct PlanningService {
    store: Arc<dyn ScheduleStore>,
    catalog: Arc<dyn ActivityCatalog>,
    clock: Arc<dyn Clock>,
    options: EngineOptions,
    policy: GatingPolicy,
    known_roles: Vec<ResourceRole>,
}

impl PlanningService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        catalog: Arc<dyn ActivityCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            options: EngineOptions::default(),
            policy: GatingPolicy::default(),
            known_roles: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: GatingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resource types that always appear in resource series.
    pub fn with_known_roles(mut self, roles: Vec<ResourceRole>) -> Self {
        self.known_roles = roles;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn create_project(&self, schedule: ProjectSchedule) -> Result<u64> {
        self.store.create(schedule)
    }

    /// Validate an edit to one activity against the whole graph and commit it.
    pub fn validate_and_apply(
        &self,
        project: &str,
        activity: &str,
        patch: &ActivityPatch,
    ) -> Result<ApplyOutcome> {
        let current = self.store.load(project)?;
        let (updated, outcome) =
            engine::validate_and_apply(&current.value, activity, patch, &self.options)?;
        self.store.save(updated, current.version)?;
        Ok(outcome)
    }

    /// Assign dense `order` values; omitted activities go to the tail.
    pub fn reorder(&self, project: &str, ordered_ids: &[ActivityId]) -> Result<ReorderOutcome> {
        let current = self.store.load(project)?;
        let (updated, ignored) = engine::reorder(&current.value, ordered_ids);
        let order = updated.ordered().into_iter().map(|n| n.id.clone()).collect();
        self.store.save(updated, current.version)?;
        Ok(ReorderOutcome { order, ignored })
    }

    /// Attach a new activity built by the caller.
    pub fn attach_activity(&self, project: &str, node: ActivityNode) -> Result<ApplyOutcome> {
        let current = self.store.load(project)?;
        let (updated, outcome) = engine::attach_activity(&current.value, node, &self.options)?;
        self.store.save(updated, current.version)?;
        Ok(outcome)
    }

    /// Attach a new activity from its catalog definition.
    pub fn attach_from_catalog(
        &self,
        project: &str,
        catalog_id: &str,
        attach: AttachOptions,
    ) -> Result<ApplyOutcome> {
        let entry = self
            .catalog
            .lookup(catalog_id)
            .ok_or_else(|| PlandagError::not_found(EntityKind::CatalogActivity, catalog_id))?;

        let current = self.store.load(project)?;
        let id = attach.id.unwrap_or_else(ActivityId::generate);
        let (mut node, mut warnings) = engine::node_from_catalog(&current.value, &entry, id);
        if let Some(duration) = attach.duration {
            node.duration = duration.max(1);
        }
        node.planned_start = attach.planned_start;

        let (updated, mut outcome) =
            engine::attach_activity(&current.value, node, &self.options)?;
        self.store.save(updated, current.version)?;

        warnings.append(&mut outcome.warnings);
        outcome.warnings = warnings;
        Ok(outcome)
    }

    /// Remove an activity and every edge referencing it.
    pub fn remove_activity(&self, project: &str, activity: &str) -> Result<Vec<GraphWarning>> {
        let current = self.store.load(project)?;
        let (updated, _removed, warnings) = engine::remove_activity(&current.value, activity)?;
        self.store.save(updated, current.version)?;
        Ok(warnings)
    }

    /// Change an activity's status and commit the resulting gating updates.
    ///
    /// The returned requests are already recorded in the project's ledger;
    /// hand them to [`dispatch`](Self::dispatch) after this returns.
    pub fn transition_status(
        &self,
        project: &str,
        activity: &str,
        to: ActivityStatus,
    ) -> Result<TransitionOutcome> {
        let current = self.store.load(project)?;
        let mut updated = current.value.clone();
        let mut outcome =
            gating::transition(&mut updated, activity, to, self.clock.as_ref(), &self.policy)?;

        if !outcome.changed {
            return Ok(outcome);
        }

        // Actual dates feed successor bounds only when actuals are in use.
        if self.options.use_actuals {
            let order = ensure_acyclic(&updated.nodes)?;
            outcome.propagation = engine::propagate_from(&mut updated, activity, &order, true);
            if !outcome.propagation.shifted.is_empty() {
                debug!(
                    project,
                    activity,
                    shifted = outcome.propagation.shifted.len(),
                    "status change pushed successors"
                );
            }
        }

        self.store.save(updated, current.version)?;
        Ok(outcome)
    }

    /// Record an external approval or rejection on an allowed dependency.
    pub fn decide_dependency(
        &self,
        project: &str,
        activity: &str,
        dependency: &str,
        decision: DependencyDecision,
    ) -> Result<DependencyStatus> {
        let current = self.store.load(project)?;
        let mut updated = current.value.clone();
        let status = gating::decide_dependency(
            &mut updated,
            activity,
            dependency,
            decision,
            self.clock.as_ref(),
        )?;
        self.store.save(updated, current.version)?;
        Ok(status)
    }

    /// Deliver task requests produced by a committed transition.
    pub async fn dispatch<S>(&self, tasks: &mut S, requests: Vec<TaskRequest>) -> DispatchReport
    where
        S: TaskService + ?Sized,
    {
        gating::dispatch_all(tasks, requests).await
    }

    /// [`transition_status`](Self::transition_status) followed by dispatch.
    pub async fn transition_and_dispatch<S>(
        &self,
        project: &str,
        activity: &str,
        to: ActivityStatus,
        tasks: &mut S,
    ) -> Result<(TransitionOutcome, DispatchReport)>
    where
        S: TaskService + ?Sized,
    {
        let outcome = self.transition_status(project, activity, to)?;
        let report = gating::dispatch_all(tasks, outcome.emitted.clone()).await;
        Ok((outcome, report))
    }

    /// Daily resource demand for one project or the whole portfolio.
    pub fn get_resource_series(
        &self,
        scope: &ResourceScope,
        window: WindowSize,
    ) -> Result<ResourceSeries> {
        let projects: Vec<ProjectSchedule> = match scope {
            ResourceScope::Project(id) => vec![self.store.load(id.as_str())?.value],
            ResourceScope::All => {
                let mut all = Vec::new();
                for id in self.store.project_ids()? {
                    all.push(self.store.load(id.as_str())?.value);
                }
                all
            }
        };

        let today = self.clock.today();
        debug!(projects = projects.len(), window = window.days(), %today, "computing resource series");

        Ok(aggregate_demand(
            projects.iter().flat_map(|p| p.nodes()),
            window,
            today,
            &self.known_roles,
        ))
    }

    /// Ordered activity list with computed flags.
    pub fn get_schedule(&self, project: &str) -> Result<ScheduleView> {
        let current = self.store.load(project)?;
        let schedule = &current.value;
        let today = self.clock.today();

        let rows = schedule
            .ordered()
            .into_iter()
            .map(|node| ScheduleRow {
                overdue: !node.is_completed()
                    && node.planned_finish.is_some_and(|finish| finish < today),
                ready: node.predecessors.iter().all(|link| {
                    schedule
                        .node(link.activity_id.as_str())
                        .is_some_and(|pred| pred.is_completed())
                }),
                activity: node.clone(),
            })
            .collect();

        debug!(project = %schedule.project_id, version = current.version, "schedule read");

        Ok(ScheduleView {
            project_id: schedule.project_id.clone(),
            name: schedule.name.clone(),
            status: schedule.status,
            version: current.version,
            rows,
        })
    }

    pub fn project_ids(&self) -> Result<Vec<ProjectId>> {
        self.store.project_ids()
    }

    pub fn load(&self, project: &str) -> Result<ProjectSchedule> {
        Ok(self.store.load(project)?.value)
    }
}
