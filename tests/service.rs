mod common;

use std::sync::Arc;

use common::*;
use plandag::catalog::{CatalogEntry, CatalogPredecessor, DependencyTemplate, InMemoryCatalog};
use plandag::clock::FixedClock;
use plandag::dag::GraphWarning;
use plandag::engine::{ActivityPatch, EngineOptions};
use plandag::errors::{ErrorKind, PlandagError};
use plandag::model::{ActivityId, CatalogActivityId, ProjectSchedule};
use plandag::service::{AttachOptions, PlanningService};
use plandag::store::{InMemoryStore, ScheduleStore};
use plandag::types::{ActivityKind, ActivityStatus, DependencyStatus, LinkType};

fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            id: CatalogActivityId::new("permit"),
            name: "Permit".into(),
            kind: ActivityKind::BackendOnly,
            duration: 3,
            predecessors: Vec::new(),
            dependencies: Vec::new(),
            resources: Vec::new(),
        },
        CatalogEntry {
            id: CatalogActivityId::new("survey"),
            name: "Site survey".into(),
            kind: ActivityKind::FrontendFacing,
            duration: 4,
            predecessors: vec![
                CatalogPredecessor {
                    catalog_activity_id: CatalogActivityId::new("permit"),
                    link_type: LinkType::FinishToStart,
                    lag: 1,
                },
                CatalogPredecessor {
                    catalog_activity_id: CatalogActivityId::new("design"),
                    link_type: LinkType::FinishToStart,
                    lag: 0,
                },
            ],
            dependencies: vec![DependencyTemplate {
                id: "po".into(),
                external_model: "purchase_order".into(),
                external_id: "PO-7".into(),
                display_name: "PO 7".into(),
                assignee: None,
            }],
            resources: Vec::new(),
        },
    ]
}

fn project_with_permit() -> ProjectSchedule {
    let mut permit = ActivityBuilder::new("permit-1").start(day(1)).duration(3).build();
    permit.catalog_activity_id = Some(CatalogActivityId::new("permit"));
    ScheduleBuilder::new("p").activity(permit).build()
}

#[test]
fn stale_write_is_rejected_with_version_conflict() {
    init_tracing();

    let store = InMemoryStore::new();
    store.create(common::chain_schedule()).unwrap();
    let service = PlanningService::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(FixedClock::new(day(1))),
    );

    let stale = store.load("chain").unwrap();
    service
        .validate_and_apply("chain", "A", &ActivityPatch::default().with_start(day(2)))
        .unwrap();

    let err = store.save(stale.value, stale.version).unwrap_err();
    match err {
        PlandagError::VersionConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }

    // The committed edit is what stays.
    assert_eq!(start_of(&service.load("chain").unwrap(), "B"), day(7));
}

#[test]
fn rejected_edit_leaves_store_untouched() {
    let service = service_with(vec![common::chain_schedule()], Vec::new(), day(1));

    let err = service
        .validate_and_apply("chain", "C", &ActivityPatch::default().with_start(day(2)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let view = service.get_schedule("chain").unwrap();
    assert_eq!(view.version, 1);
}

#[test]
fn reorder_assigns_dense_orders_and_appends_omitted_ids() {
    let service = service_with(vec![common::chain_schedule()], Vec::new(), day(1));

    let outcome = service
        .reorder(
            "chain",
            &[ActivityId::new("C"), ActivityId::new("ghost"), ActivityId::new("A")],
        )
        .unwrap();

    let order: Vec<&str> = outcome.order.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["C", "A", "B"]);
    assert_eq!(outcome.ignored, vec![ActivityId::new("ghost")]);

    let schedule = service.load("chain").unwrap();
    let orders: Vec<(&str, u32)> = schedule
        .ordered()
        .into_iter()
        .map(|n| (n.id.as_str(), n.order))
        .collect();
    assert_eq!(orders, vec![("C", 1), ("A", 2), ("B", 3)]);
}

#[test]
fn attach_from_catalog_resolves_default_predecessors() {
    init_tracing();

    let service = service_with(vec![project_with_permit()], catalog(), day(1));

    let outcome = service
        .attach_from_catalog(
            "p",
            "survey",
            AttachOptions {
                id: Some(ActivityId::new("survey-1")),
                planned_start: Some(day(5)),
                duration: None,
            },
        )
        .unwrap();

    let node = &outcome.activity;
    assert_eq!(node.name, "Site survey");
    assert_eq!(node.kind, ActivityKind::FrontendFacing);
    assert_eq!(node.order, 2);
    assert_eq!(node.planned_finish, Some(day(8)));
    assert_eq!(node.predecessors.len(), 1);
    assert_eq!(node.predecessors[0].activity_id.as_str(), "permit-1");
    assert_eq!(node.predecessors[0].lag, 1);
    assert_eq!(node.dependencies[0].status, DependencyStatus::NotAllowed);

    assert_eq!(
        outcome.warnings,
        vec![GraphWarning::UnresolvedCatalogPredecessor {
            activity: ActivityId::new("survey-1"),
            catalog_activity: CatalogActivityId::new("design"),
        }]
    );

    let schedule = service.load("p").unwrap();
    assert_eq!(schedule.node("permit-1").unwrap().successors.len(), 1);
}

#[test]
fn attach_is_checked_against_predecessors() {
    let service = service_with(vec![project_with_permit()], catalog(), day(1));

    // permit-1 finishes on day 3; FS lag 1 means day 5 at the earliest.
    let err = service
        .attach_from_catalog(
            "p",
            "survey",
            AttachOptions {
                id: Some(ActivityId::new("survey-1")),
                planned_start: Some(day(4)),
                duration: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let err = service
        .attach_from_catalog("p", "unknown", AttachOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn attached_ad_hoc_activity_gets_a_generated_id_and_tail_order() {
    let service = service_with(vec![common::chain_schedule()], Vec::new(), day(1));

    let node = ActivityBuilder::new(ActivityId::generate().as_str())
        .fs("C")
        .start(day(16))
        .duration(2)
        .build();
    let id = node.id.clone();

    let outcome = service.attach_activity("chain", node.clone()).unwrap();
    assert_eq!(outcome.activity.order, 4);

    let err = service.attach_activity("chain", node).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPatch);
    assert!(service.load("chain").unwrap().contains(id.as_str()));
}

#[test]
fn attach_rejects_zero_resource_counts() {
    let service = service_with(vec![common::chain_schedule()], Vec::new(), day(1));

    let node = ActivityBuilder::new("D")
        .fs("C")
        .start(day(16))
        .duration(2)
        .resource("crew", 0)
        .build();

    let err = service.attach_activity("chain", node).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPatch);
    assert!(!service.load("chain").unwrap().contains("D"));
}

#[test]
fn removing_an_activity_strips_its_edges() {
    let service = service_with(vec![common::chain_schedule()], Vec::new(), day(1));

    service.remove_activity("chain", "B").unwrap();

    let schedule = service.load("chain").unwrap();
    assert!(!schedule.contains("B"));
    assert!(schedule.node("C").unwrap().predecessors.is_empty());
    assert!(schedule.node("A").unwrap().successors.is_empty());

    let err = service.remove_activity("chain", "B").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn schedule_rows_carry_overdue_and_ready_flags() {
    let schedule = ScheduleBuilder::new("p")
        .activity(
            ActivityBuilder::new("A")
                .start(day(1))
                .duration(3)
                .status(ActivityStatus::Completed)
                .actual_start(day(1))
                .actual_finish(day(3))
                .build(),
        )
        .activity(ActivityBuilder::new("B").fs("A").start(day(4)).duration(3).build())
        .activity(ActivityBuilder::new("C").fs("B").start(day(7)).duration(30).build())
        .build();
    let service = service_with(vec![schedule], Vec::new(), day(10));

    let view = service.get_schedule("p").unwrap();
    let flags: Vec<(&str, bool, bool)> = view
        .rows
        .iter()
        .map(|r| (r.activity.id.as_str(), r.overdue, r.ready))
        .collect();

    assert_eq!(
        flags,
        vec![("A", false, true), ("B", true, true), ("C", false, false)]
    );
}

#[tokio::test]
async fn status_change_is_committed_before_dispatch() {
    init_tracing();

    let schedule = ScheduleBuilder::new("p")
        .activity(
            ActivityBuilder::new("A")
                .start(day(1))
                .duration(2)
                .dependency("po", "purchase_order", "PO-1")
                .status(ActivityStatus::InProgress)
                .build(),
        )
        .build();
    let service = service_with(vec![schedule], Vec::new(), day(3));

    let mut failing = FailingTaskService::always();
    let (outcome, report) = service
        .transition_and_dispatch("p", "A", ActivityStatus::Completed, &mut failing)
        .await
        .unwrap();

    assert_eq!(outcome.emitted.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(service.load("p").unwrap().node("A").unwrap().is_completed());

    // Retrying goes through `dispatch`, not through another transition.
    let mut tasks = RecordingTaskService::new();
    let retry = service.dispatch(&mut tasks, report.retryable()).await;
    assert!(retry.is_complete());
    assert_eq!(tasks.snapshot().len(), 1);

    let again = service
        .transition_and_dispatch("p", "A", ActivityStatus::Completed, &mut tasks)
        .await
        .unwrap();
    assert!(!again.0.changed);
    assert_eq!(tasks.snapshot().len(), 1);
}

#[test]
fn dependency_decision_is_persisted() {
    let schedule = ScheduleBuilder::new("p")
        .activity(
            ActivityBuilder::new("A")
                .dependency("po", "purchase_order", "PO-1")
                .status(ActivityStatus::Completed)
                .build(),
        )
        .build();
    let service = service_with(vec![schedule], Vec::new(), day(3));

    let status = service
        .decide_dependency("p", "A", "po", plandag::types::DependencyDecision::Approved)
        .unwrap();
    assert_eq!(status, DependencyStatus::Approved);

    let stored = service.load("p").unwrap();
    assert_eq!(
        stored.node("A").unwrap().dependencies[0].status,
        DependencyStatus::Approved
    );
}

#[test]
fn late_completion_pushes_successors_past_the_actual_finish() {
    init_tracing();

    let schedule = ScheduleBuilder::new("chain")
        .activity(
            ActivityBuilder::new("A")
                .start(day(1))
                .duration(5)
                .status(ActivityStatus::InProgress)
                .actual_start(day(1))
                .build(),
        )
        .activity(ActivityBuilder::new("B").fs("A").start(day(6)).duration(5).build())
        .activity(ActivityBuilder::new("C").fs("B").start(day(11)).duration(5).build())
        .build();
    let service = service_with(vec![schedule], Vec::new(), day(8));

    let outcome = service
        .transition_status("chain", "A", ActivityStatus::Completed)
        .unwrap();

    // A finished on day 8 instead of day 5.
    let shifted: Vec<(&str, i64)> = outcome
        .propagation
        .shifted
        .iter()
        .map(|s| (s.activity.as_str(), s.days))
        .collect();
    assert_eq!(shifted, vec![("B", 3), ("C", 3)]);

    let stored = service.load("chain").unwrap();
    assert_eq!(start_of(&stored, "B"), day(9));
    assert_eq!(finish_of(&stored, "B"), day(13));
    assert_eq!(start_of(&stored, "C"), day(14));
}

#[test]
fn planned_dates_ignore_late_completion_without_actuals() {
    let schedule = ScheduleBuilder::new("chain")
        .activity(
            ActivityBuilder::new("A")
                .start(day(1))
                .duration(5)
                .status(ActivityStatus::InProgress)
                .build(),
        )
        .activity(ActivityBuilder::new("B").fs("A").start(day(6)).duration(5).build())
        .build();
    let service = service_with(vec![schedule], Vec::new(), day(8))
        .with_options(EngineOptions { use_actuals: false });

    let outcome = service
        .transition_status("chain", "A", ActivityStatus::Completed)
        .unwrap();

    assert!(outcome.propagation.shifted.is_empty());
    assert_eq!(start_of(&service.load("chain").unwrap(), "B"), day(6));
}
