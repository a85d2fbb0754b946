// src/model/mod.rs

//! Schedule data model.
//!
//! - [`ids`] holds the opaque identifier newtypes.
//! - [`activity`] describes a single activity node and its edges.
//! - [`schedule`] is the per-project aggregate root.
//! - [`dates`] implements the day-based arithmetic shared by the engine.

pub mod activity;
pub mod dates;
pub mod ids;
pub mod schedule;

pub use activity::{
    ActivityNode, ExternalDependency, PredecessorLink, ResourceRequirement, StatusEntry,
    SuccessorLink,
};
pub use ids::{ActivityId, CatalogActivityId, DependencyId, ProjectId, ResourceRole};
pub use schedule::ProjectSchedule;
