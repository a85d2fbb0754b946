// src/store.rs

//! Persistence seam for schedule aggregates.
//!
//! Every mutation follows "read full graph -> validate -> write full graph".
//! Writes carry the version that was read; if another writer committed in
//! between, the write is rejected with `VersionConflict` and the caller
//! retries from a fresh read.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use tracing::debug;

use crate::errors::{EntityKind, PlandagError, Result};
use crate::model::{ProjectId, ProjectSchedule};

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Abstract schedule storage.
pub trait ScheduleStore: Send + Sync + Debug {
    fn load(&self, project: &str) -> Result<Versioned<ProjectSchedule>>;

    /// Store a new project at version 1. Fails if the project exists.
    fn create(&self, schedule: ProjectSchedule) -> Result<u64>;

    /// Replace a project if it is still at `expected_version`; returns the
    /// new version.
    fn save(&self, schedule: ProjectSchedule, expected_version: u64) -> Result<u64>;

    fn project_ids(&self) -> Result<Vec<ProjectId>>;
}

/// Process-local store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    projects: Arc<Mutex<BTreeMap<ProjectId, Versioned<ProjectSchedule>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<ProjectId, Versioned<ProjectSchedule>>>> {
        self.projects
            .lock()
            .map_err(|_| PlandagError::Other(anyhow!("schedule store lock poisoned")))
    }
}

impl ScheduleStore for InMemoryStore {
    fn load(&self, project: &str) -> Result<Versioned<ProjectSchedule>> {
        self.lock()?
            .get(project)
            .cloned()
            .ok_or_else(|| PlandagError::not_found(EntityKind::Project, project))
    }

    fn create(&self, schedule: ProjectSchedule) -> Result<u64> {
        let mut projects = self.lock()?;
        if let Some(existing) = projects.get(&schedule.project_id) {
            return Err(PlandagError::VersionConflict {
                project: schedule.project_id.to_string(),
                expected: 0,
                actual: existing.version,
            });
        }
        debug!(project = %schedule.project_id, "project created");
        projects.insert(
            schedule.project_id.clone(),
            Versioned {
                version: 1,
                value: schedule,
            },
        );
        Ok(1)
    }

    fn save(&self, schedule: ProjectSchedule, expected_version: u64) -> Result<u64> {
        let mut projects = self.lock()?;
        let slot = projects
            .get_mut(&schedule.project_id)
            .ok_or_else(|| PlandagError::not_found(EntityKind::Project, &schedule.project_id))?;

        if slot.version != expected_version {
            return Err(PlandagError::VersionConflict {
                project: schedule.project_id.to_string(),
                expected: expected_version,
                actual: slot.version,
            });
        }

        slot.version += 1;
        slot.value = schedule;
        debug!(project = %slot.value.project_id, version = slot.version, "project saved");
        Ok(slot.version)
    }

    fn project_ids(&self) -> Result<Vec<ProjectId>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
