// src/config/model.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::catalog::CatalogEntry;
use crate::dag::GraphWarning;
use crate::model::{ProjectSchedule, ResourceRole};
use crate::types::{ActivityKind, ActivityStatus, LinkType, WindowSize};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// use_actuals = true
/// default_window = "14"
///
/// [catalog.survey]
/// name = "Site survey"
/// predecessors = [{ activity = "permit", link = "FS" }]
///
/// [project.alpha.activity.survey]
/// catalog = "survey"
/// planned_start = "2024-03-01"
/// duration = 5
/// resources = [{ type = "surveyor", number = 2 }]
/// ```
///
/// Dates are written as quoted `YYYY-MM-DD` strings. All sections are
/// optional at the TOML level; validation requires at least one project.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Engine behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Reusable activity definitions from `[catalog.<id>]`.
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogConfig>,

    /// Projects from `[project.<id>]`.
    #[serde(default)]
    pub project: BTreeMap<String, ProjectConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see
/// [`validate`](crate::config::validate)), so every schedule in here is
/// acyclic and satisfies its predecessor constraints.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub catalog: Vec<CatalogEntry>,
    pub projects: Vec<ProjectSchedule>,
    /// Dangling references dropped while building the schedules.
    pub warnings: Vec<GraphWarning>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        catalog: Vec<CatalogEntry>,
        projects: Vec<ProjectSchedule>,
        warnings: Vec<GraphWarning>,
    ) -> Self {
        Self {
            config,
            catalog,
            projects,
            warnings,
        }
    }

    pub fn project(&self, id: &str) -> Option<&ProjectSchedule> {
        self.projects.iter().find(|p| p.project_id.as_str() == id)
    }

    /// Roles from `resource_types`, used to zero-fill resource series.
    pub fn known_roles(&self) -> Vec<ResourceRole> {
        self.config
            .resource_types
            .iter()
            .map(|r| ResourceRole::new(r.as_str()))
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Prefer predecessors' actual dates when computing constraints.
    #[serde(default = "default_use_actuals")]
    pub use_actuals: bool,

    /// Lookahead window used when none is requested explicitly.
    #[serde(default)]
    pub default_window: WindowSize,

    /// Allow-list of resource types; empty means any type is accepted.
    #[serde(default)]
    pub resource_types: Vec<String>,

    /// Assignee for task requests whose dependency names none.
    #[serde(default)]
    pub default_assignee: Option<String>,
}

fn default_use_actuals() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            use_actuals: default_use_actuals(),
            default_window: WindowSize::default(),
            resource_types: Vec::new(),
            default_assignee: None,
        }
    }
}

/// Precedence link as written in TOML: `{ activity = "A", link = "FS", lag = 2 }`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub activity: String,
    #[serde(default)]
    pub link: LinkType,
    #[serde(default)]
    pub lag: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub role: String,
    pub number: u32,
}

/// External dependency: `{ id = "po", model = "purchase_order", external_id = "po-1" }`.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyConfig {
    pub id: String,
    pub model: String,
    pub external_id: String,
    /// Display name; defaults to `external_id`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// `[catalog.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub duration: Option<u32>,
    /// Default predecessors, by *catalog* id.
    #[serde(default)]
    pub predecessors: Vec<LinkConfig>,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// `[project.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Activities keyed by activity id.
    #[serde(default)]
    pub activity: BTreeMap<String, ActivityConfig>,
}

/// `[project.<id>.activity.<id>]` section.
///
/// Fields left out fall back to the referenced catalog entry (if any).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityConfig {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_finish: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_finish: Option<NaiveDate>,
    #[serde(default)]
    pub percent_complete: u8,
    #[serde(default)]
    pub status: ActivityStatus,
    /// Predecessors by activity id within the same project. When absent,
    /// the catalog's defaults are resolved against the project.
    #[serde(default)]
    pub predecessors: Option<Vec<LinkConfig>>,
    #[serde(default)]
    pub resources: Option<Vec<ResourceConfig>>,
    #[serde(default)]
    pub dependencies: Option<Vec<DependencyConfig>>,
}
