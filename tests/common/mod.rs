#![allow(dead_code)]

use plandag::engine::EngineOptions;
use plandag::model::ProjectSchedule;

pub use plandag_test_utils::builders::{
    ActivityBuilder, ScheduleBuilder, date, day, service_with,
};
pub use plandag_test_utils::init_tracing;
pub use plandag_test_utils::task_services::{FailingTaskService, RecordingTaskService};

pub fn options() -> EngineOptions {
    EngineOptions::default()
}

/// `A -> B -> C` finish-to-start chain, each five days long, A starting on
/// day 1.
pub fn chain_schedule() -> ProjectSchedule {
    ScheduleBuilder::new("chain")
        .activity(ActivityBuilder::new("A").start(day(1)).duration(5).build())
        .activity(
            ActivityBuilder::new("B")
                .fs("A")
                .start(day(6))
                .duration(5)
                .build(),
        )
        .activity(
            ActivityBuilder::new("C")
                .fs("B")
                .start(day(11))
                .duration(5)
                .build(),
        )
        .build()
}

/// Planned start of `id` in `schedule`.
pub fn start_of(schedule: &ProjectSchedule, id: &str) -> chrono::NaiveDate {
    schedule
        .node(id)
        .and_then(|n| n.planned_start)
        .unwrap_or_else(|| panic!("activity {id} has no planned start"))
}

pub fn finish_of(schedule: &ProjectSchedule, id: &str) -> chrono::NaiveDate {
    schedule
        .node(id)
        .and_then(|n| n.planned_finish)
        .unwrap_or_else(|| panic!("activity {id} has no planned finish"))
}
