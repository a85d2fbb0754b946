// src/catalog.rs

//! Read-only access to reusable activity definitions.
//!
//! The engine only consults the catalog when attaching a new activity to a
//! project and never writes to it.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::model::{
    CatalogActivityId, DependencyId, ExternalDependency, ResourceRequirement,
};
use crate::types::{ActivityKind, LinkType};

/// Default precedence link expressed in catalog ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPredecessor {
    pub catalog_activity_id: CatalogActivityId,
    #[serde(default)]
    pub link_type: LinkType,
    #[serde(default)]
    pub lag: i32,
}

/// Template for an external dependency created with each attached activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTemplate {
    pub id: DependencyId,
    pub external_model: String,
    pub external_id: String,
    pub display_name: String,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl DependencyTemplate {
    /// Fresh dependency in the `not_allowed` state.
    pub fn instantiate(&self) -> ExternalDependency {
        let mut dep = ExternalDependency::new(
            self.id.clone(),
            self.external_model.clone(),
            self.external_id.clone(),
            self.display_name.clone(),
        );
        dep.assignee = self.assignee.clone();
        dep
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogActivityId,
    pub name: String,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub predecessors: Vec<CatalogPredecessor>,
    #[serde(default)]
    pub dependencies: Vec<DependencyTemplate>,
    #[serde(default)]
    pub resources: Vec<ResourceRequirement>,
}

fn default_duration() -> u32 {
    1
}

/// Source of catalog entries.
pub trait ActivityCatalog: Send + Sync + Debug {
    fn lookup(&self, id: &str) -> Option<CatalogEntry>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: BTreeMap<CatalogActivityId, CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for InMemoryCatalog {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

impl ActivityCatalog for InMemoryCatalog {
    fn lookup(&self, id: &str) -> Option<CatalogEntry> {
        self.entries.get(id).cloned()
    }
}
