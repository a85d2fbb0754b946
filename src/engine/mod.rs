// src/engine/mod.rs

//! Date constraint engine.
//!
//! - [`constraint`] computes the minimum start/finish of an activity from
//!   its predecessor links and reconciles dates with durations.
//! - [`propagate`] pushes committed date changes forward to downstream
//!   activities.
//! - [`apply`] is the edit pipeline tying graph rebuild, cycle detection,
//!   constraint checks and propagation together.

pub mod apply;
pub mod constraint;
pub mod propagate;

pub use apply::{
    ActivityPatch, ApplyOutcome, attach_activity, node_from_catalog, remove_activity, reorder,
    validate_and_apply,
};
pub use constraint::{
    BoundTarget, ConstraintBounds, ConstraintReason, ConstraintViolation, DateInput,
    ReconciledDates, compute_min_constraints, reconcile_dates,
};
pub use propagate::{PropagationReport, Shift, propagate_from};

/// Engine-wide knobs, usually taken from the `[config]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Prefer a predecessor's actual dates over its planned ones.
    pub use_actuals: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { use_actuals: true }
    }
}
