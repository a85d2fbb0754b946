#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use plandag::catalog::{CatalogEntry, InMemoryCatalog};
use plandag::clock::FixedClock;
use plandag::dag::resync;
use plandag::model::dates::finish_from_start;
use plandag::model::{
    ActivityNode, ExternalDependency, PredecessorLink, ProjectSchedule, ResourceRequirement,
};
use plandag::service::PlanningService;
use plandag::store::{InMemoryStore, ScheduleStore};
use plandag::types::{ActivityStatus, DependencyStatus, LinkType};

/// Fixed epoch used by tests: `day(0)` is 2024-01-01.
pub fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .expect("valid base date")
        .checked_add_signed(chrono::TimeDelta::days(n))
        .expect("date in range")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Builder for `ActivityNode`.
///
/// When a start is set without a finish, the finish is derived from the
/// duration so the node is consistent.
pub struct ActivityBuilder {
    node: ActivityNode,
}

impl ActivityBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            node: ActivityNode::new(id),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.node.name = name.to_string();
        self
    }

    pub fn order(mut self, order: u32) -> Self {
        self.node.order = order;
        self
    }

    pub fn start(mut self, start: NaiveDate) -> Self {
        self.node.planned_start = Some(start);
        self
    }

    pub fn finish(mut self, finish: NaiveDate) -> Self {
        self.node.planned_finish = Some(finish);
        self
    }

    pub fn duration(mut self, duration: u32) -> Self {
        self.node.duration = duration;
        self
    }

    pub fn after(mut self, pred: &str, link: LinkType, lag: i32) -> Self {
        self.node
            .predecessors
            .push(PredecessorLink::new(pred, link, lag));
        self
    }

    /// Finish-to-start predecessor with no lag.
    pub fn fs(self, pred: &str) -> Self {
        self.after(pred, LinkType::FinishToStart, 0)
    }

    pub fn resource(mut self, role: &str, number: u32) -> Self {
        self.node.resources.push(ResourceRequirement::new(role, number));
        self
    }

    pub fn dependency(mut self, id: &str, model: &str, external_id: &str) -> Self {
        self.node
            .dependencies
            .push(ExternalDependency::new(id, model, external_id, external_id));
        self
    }

    pub fn assigned_dependency(mut self, id: &str, external_id: &str, assignee: &str) -> Self {
        let mut dep = ExternalDependency::new(id, "purchase_order", external_id, external_id);
        dep.assignee = Some(assignee.to_string());
        self.node.dependencies.push(dep);
        self
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.node.current_status = status;
        if status == ActivityStatus::Completed {
            self.node.percent_complete = 100;
            for dep in self.node.dependencies.iter_mut() {
                dep.status = DependencyStatus::Allowed;
            }
        }
        self
    }

    pub fn actual_start(mut self, date: NaiveDate) -> Self {
        self.node.actual_start = Some(date);
        self
    }

    pub fn actual_finish(mut self, date: NaiveDate) -> Self {
        self.node.actual_finish = Some(date);
        self
    }

    pub fn build(mut self) -> ActivityNode {
        if let (Some(start), None) = (self.node.planned_start, self.node.planned_finish) {
            self.node.planned_finish = Some(finish_from_start(start, self.node.duration));
        }
        self.node
    }
}

/// Builder for `ProjectSchedule`.
///
/// Nodes without an explicit order are numbered in insertion order, and
/// successor lists are rebuilt on `build()`.
pub struct ScheduleBuilder {
    schedule: ProjectSchedule,
}

impl ScheduleBuilder {
    pub fn new(project: &str) -> Self {
        Self {
            schedule: ProjectSchedule::new(project, project),
        }
    }

    pub fn activity(mut self, mut node: ActivityNode) -> Self {
        if node.order == 0 {
            node.order = self.schedule.next_order();
        }
        self.schedule.insert(node);
        self
    }

    pub fn build(mut self) -> ProjectSchedule {
        resync(&mut self.schedule);
        self.schedule
    }
}

/// A service over an in-memory store seeded with `schedules`, with "today"
/// pinned to `today`.
pub fn service_with(
    schedules: Vec<ProjectSchedule>,
    catalog: Vec<CatalogEntry>,
    today: NaiveDate,
) -> PlanningService {
    let store = InMemoryStore::new();
    for schedule in schedules {
        store.create(schedule).expect("fresh project id");
    }
    let catalog: InMemoryCatalog = catalog.into_iter().collect();
    PlanningService::new(
        Arc::new(store),
        Arc::new(catalog),
        Arc::new(FixedClock::new(today)),
    )
}
