mod common;

use common::*;
use plandag::dag::{GraphWarning, ensure_acyclic, rebuild_successors, resync, topo_sort};
use plandag::engine::{ActivityPatch, validate_and_apply};
use plandag::errors::{ErrorKind, PlandagError};
use plandag::model::{ActivityId, PredecessorLink, SuccessorLink};
use plandag::types::LinkType;

#[test]
fn successors_are_the_transpose_of_predecessors() {
    init_tracing();

    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").build())
        .activity(ActivityBuilder::new("B").after("A", LinkType::StartToStart, 2).build())
        .activity(
            ActivityBuilder::new("C")
                .fs("A")
                .after("B", LinkType::FinishToFinish, -1)
                .build(),
        )
        .build();

    let a = schedule.node("A").unwrap();
    assert_eq!(
        a.successors,
        vec![
            SuccessorLink {
                activity_id: ActivityId::new("B"),
                link_type: LinkType::StartToStart,
                lag: 2,
            },
            SuccessorLink {
                activity_id: ActivityId::new("C"),
                link_type: LinkType::FinishToStart,
                lag: 0,
            },
        ]
    );

    let b = schedule.node("B").unwrap();
    assert_eq!(b.successors.len(), 1);
    assert_eq!(b.successors[0].lag, -1);
    assert!(schedule.node("C").unwrap().successors.is_empty());
}

#[test]
fn rebuild_does_not_touch_its_input() {
    let mut schedule = chain_schedule();
    // Stale successor on C pointing at A.
    schedule.node_mut("C").unwrap().successors.push(SuccessorLink {
        activity_id: ActivityId::new("A"),
        link_type: LinkType::FinishToStart,
        lag: 0,
    });
    let before = schedule.clone();

    let rebuild = rebuild_successors(&schedule.nodes);

    assert_eq!(schedule, before);
    assert!(rebuild.adjacency["C"].is_empty());
    assert_eq!(rebuild.adjacency["A"].len(), 1);
}

#[test]
fn dangling_predecessor_is_dropped_with_a_warning() {
    init_tracing();

    let mut schedule = chain_schedule();
    schedule
        .node_mut("B")
        .unwrap()
        .predecessors
        .push(PredecessorLink::fs("ghost", 0));

    let warnings = resync(&mut schedule);

    assert_eq!(
        warnings,
        vec![GraphWarning::DanglingPredecessor {
            activity: ActivityId::new("B"),
            missing: ActivityId::new("ghost"),
        }]
    );
    let b = schedule.node("B").unwrap();
    assert_eq!(b.predecessors.len(), 1);
    assert_eq!(b.predecessors[0].activity_id.as_str(), "A");
}

#[test]
fn stale_successor_to_missing_activity_is_warned() {
    let mut schedule = chain_schedule();
    schedule.node_mut("A").unwrap().successors.push(SuccessorLink {
        activity_id: ActivityId::new("ghost"),
        link_type: LinkType::FinishToStart,
        lag: 0,
    });

    let warnings = resync(&mut schedule);

    assert_eq!(
        warnings,
        vec![GraphWarning::DanglingSuccessor {
            activity: ActivityId::new("A"),
            missing: ActivityId::new("ghost"),
        }]
    );
    let a = schedule.node("A").unwrap();
    assert_eq!(a.successors.len(), 1);
    assert_eq!(a.successors[0].activity_id.as_str(), "B");
}

#[test]
fn topo_order_breaks_ties_by_order_then_id() {
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("z").order(1).build())
        .activity(ActivityBuilder::new("b").order(2).build())
        .activity(ActivityBuilder::new("a").order(2).build())
        .activity(ActivityBuilder::new("end").order(0).fs("z").fs("a").build())
        .build();

    let order = topo_sort(&schedule.nodes).unwrap();
    let ids: Vec<&str> = order.iter().map(|id| id.as_str()).collect();

    // `end` got order 3 from the builder, so it comes after the roots.
    assert_eq!(ids, vec!["z", "a", "b", "end"]);
}

#[test]
fn cycle_is_reported_with_its_members() {
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").fs("C").build())
        .activity(ActivityBuilder::new("B").fs("A").build())
        .activity(ActivityBuilder::new("C").fs("B").build())
        .activity(ActivityBuilder::new("D").fs("C").build())
        .activity(ActivityBuilder::new("E").build())
        .build();

    let report = topo_sort(&schedule.nodes).unwrap_err();
    let cycle: Vec<&str> = report.cycle_nodes.iter().map(|id| id.as_str()).collect();
    let blocked: Vec<&str> = report.blocked.iter().map(|id| id.as_str()).collect();

    assert_eq!(cycle, vec!["A", "B", "C"]);
    assert_eq!(blocked, vec!["A", "B", "C", "D"]);

    let err = ensure_acyclic(&schedule.nodes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyCycle);
}

#[test]
fn self_loop_counts_as_a_cycle() {
    let schedule = ScheduleBuilder::new("p")
        .activity(ActivityBuilder::new("A").fs("A").build())
        .build();

    let report = topo_sort(&schedule.nodes).unwrap_err();
    assert_eq!(report.cycle_nodes, vec![ActivityId::new("A")]);
}

#[test]
fn cyclic_edit_is_rejected_and_leaves_the_graph_unchanged() {
    init_tracing();

    let schedule = chain_schedule();
    let before = schedule.clone();

    let patch = ActivityPatch::default().with_predecessors(vec![PredecessorLink::fs("C", 0)]);
    let err = validate_and_apply(&schedule, "A", &patch, &options()).unwrap_err();

    match err {
        PlandagError::DependencyCycle { cycle_nodes } => {
            assert_eq!(cycle_nodes, vec!["A", "B", "C"]);
        }
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
    assert_eq!(schedule, before);
}
