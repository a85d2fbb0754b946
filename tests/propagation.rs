mod common;

use common::*;
use plandag::dag::topo_sort;
use plandag::engine::{ActivityPatch, propagate_from, validate_and_apply};
use plandag::types::LinkType;

#[test]
fn delay_cascades_down_the_chain_preserving_durations() {
    init_tracing();

    let schedule = chain_schedule();
    let patch = ActivityPatch::default().with_start(day(3));

    let (updated, outcome) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    assert_eq!(finish_of(&updated, "A"), day(7));
    assert_eq!(start_of(&updated, "B"), day(8));
    assert_eq!(finish_of(&updated, "B"), day(12));
    assert_eq!(start_of(&updated, "C"), day(13));
    assert_eq!(finish_of(&updated, "C"), day(17));

    let shifted: Vec<(&str, i64)> = outcome
        .propagation
        .shifted
        .iter()
        .map(|s| (s.activity.as_str(), s.days))
        .collect();
    assert_eq!(shifted, vec![("B", 2), ("C", 2)]);
}

#[test]
fn slack_absorbs_the_shift() {
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").start(day(1)).duration(5).build())
        .activity(ActivityBuilder::new("B").fs("A").start(day(6)).duration(2).build())
        .activity(ActivityBuilder::new("C").fs("B").start(day(20)).duration(2).build())
        .build();

    let patch = ActivityPatch::default().with_start(day(2));
    let (updated, outcome) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    assert_eq!(start_of(&updated, "B"), day(7));
    assert_eq!(start_of(&updated, "C"), day(20));
    assert_eq!(outcome.propagation.shifted.len(), 1);
}

#[test]
fn moving_a_predecessor_earlier_never_pulls_successors_back() {
    let schedule = chain_schedule();
    let patch = ActivityPatch::default().with_start(day(-5));

    let (updated, outcome) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    assert_eq!(start_of(&updated, "B"), day(6));
    assert_eq!(start_of(&updated, "C"), day(11));
    assert!(outcome.propagation.shifted.is_empty());
}

#[test]
fn finish_bound_links_shift_by_the_minimal_amount() {
    // B must finish no earlier than A finishes (FF); it is 2 days long.
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").start(day(1)).duration(5).build())
        .activity(
            ActivityBuilder::new("B")
                .after("A", LinkType::FinishToFinish, 0)
                .start(day(4))
                .duration(2)
                .build(),
        )
        .build();

    let patch = ActivityPatch::default().with_duration(8);
    let (updated, _) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    assert_eq!(finish_of(&updated, "A"), day(8));
    assert_eq!(start_of(&updated, "B"), day(7));
    assert_eq!(finish_of(&updated, "B"), day(8));
}

#[test]
fn undated_successors_and_actuals_are_left_alone() {
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").start(day(1)).duration(5).build())
        .activity(ActivityBuilder::new("B").fs("A").build())
        .activity(
            ActivityBuilder::new("C")
                .fs("A")
                .start(day(6))
                .duration(3)
                .actual_start(day(6))
                .build(),
        )
        .build();

    let patch = ActivityPatch::default().with_start(day(4));
    let (updated, _) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    let b = updated.node("B").unwrap();
    assert_eq!(b.planned_start, None);
    assert_eq!(b.planned_finish, None);

    let c = updated.node("C").unwrap();
    assert_eq!(c.planned_start, Some(day(9)));
    assert_eq!(c.actual_start, Some(day(6)));
}

#[test]
fn rerunning_propagation_changes_nothing() {
    let schedule = chain_schedule();
    let patch = ActivityPatch::default().with_start(day(4));
    let (once, _) = validate_and_apply(&schedule, "A", &patch, &options()).unwrap();

    let order = topo_sort(&once.nodes).unwrap();
    let mut twice = once.clone();
    let report = propagate_from(&mut twice, "A", &order, true);

    assert!(report.shifted.is_empty());
    assert_eq!(report.visited, 2);
    assert_eq!(twice, once);
}
