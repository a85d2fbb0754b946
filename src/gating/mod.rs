// src/gating/mod.rs

//! Status-driven gating of external approvals.
//!
//! - [`machine`] holds the activity lifecycle state machine and the
//!   dependency fan-out performed on each transition.
//! - [`dispatch`] defines the task requests emitted on completion and the
//!   [`TaskService`] seam used to deliver them.

pub mod dispatch;
pub mod machine;

pub use dispatch::{
    ChannelTaskService, DispatchReport, IdempotencyKey, TaskRequest, TaskService, dispatch_all,
    spawn_task_forwarder,
};
pub use machine::{GatingPolicy, TransitionOutcome, can_transition, decide_dependency, transition};
