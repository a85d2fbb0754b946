mod common;

use std::io::Write;
use std::sync::Arc;

use common::*;
use plandag::build_service;
use plandag::clock::FixedClock;
use plandag::config::{load_and_validate, load_from_str};
use plandag::dag::GraphWarning;
use plandag::errors::{ErrorKind, PlandagError};
use plandag::types::{ActivityStatus, DependencyStatus, LinkType, PlanStatus, WindowSize};
use tempfile::NamedTempFile;

const PLAN: &str = r#"
[config]
use_actuals = true
default_window = "7"
resource_types = ["surveyor", "engineer"]
default_assignee = "coordinator"

[catalog.permit]
name = "Permit"
duration = 3

[catalog.survey]
name = "Site survey"
kind = "frontend_facing"
duration = 4
predecessors = [{ activity = "permit", link = "FS", lag = 1 }]
dependencies = [{ id = "po", model = "purchase_order", external_id = "PO-1", name = "PO 1" }]
resources = [{ type = "surveyor", number = 2 }]

[project.alpha]
name = "Alpha tower"

[project.alpha.activity.permit]
catalog = "permit"
planned_start = "2024-01-01"
status = "completed"
actual_start = "2024-01-01"
actual_finish = "2024-01-03"

[project.alpha.activity.survey]
catalog = "survey"
planned_start = "2024-01-05"

[project.alpha.activity.report]
name = "Report"
planned_start = "2024-01-09"
planned_finish = "2024-01-10"
predecessors = [{ activity = "survey", link = "FS" }, { activity = "ghost" }]
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_builds_consistent_schedules() {
    init_tracing();

    let file = write_config(PLAN);
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.default_window, WindowSize::Days7);
    assert_eq!(cfg.catalog.len(), 2);

    let alpha = cfg.project("alpha").unwrap();
    assert_eq!(alpha.name, "Alpha tower");
    assert_eq!(alpha.status, PlanStatus::InProgress);

    let permit = alpha.node("permit").unwrap();
    assert_eq!(permit.current_status, ActivityStatus::Completed);
    assert_eq!(permit.planned_finish, Some(date(2024, 1, 3)));

    let survey = alpha.node("survey").unwrap();
    assert_eq!(survey.name, "Site survey");
    assert_eq!(survey.duration, 4);
    assert_eq!(survey.planned_finish, Some(date(2024, 1, 8)));
    assert_eq!(survey.predecessors[0].activity_id.as_str(), "permit");
    assert_eq!(survey.predecessors[0].link_type, LinkType::FinishToStart);
    assert_eq!(survey.resources[0].number, 2);
    assert_eq!(survey.dependencies[0].status, DependencyStatus::NotAllowed);

    let report = alpha.node("report").unwrap();
    assert_eq!(report.duration, 2);
    assert_eq!(report.predecessors.len(), 1);
    assert_eq!(
        cfg.warnings,
        vec![GraphWarning::DanglingPredecessor {
            activity: "report".into(),
            missing: "ghost".into(),
        }]
    );

    // Explicit orders are absent, so ids are numbered in key order.
    let ids: Vec<&str> = alpha.ordered().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["permit", "report", "survey"]);
}

#[test]
fn service_built_from_config_uses_its_settings() {
    let cfg = load_from_str(PLAN)
        .and_then(plandag::config::ConfigFile::try_from)
        .unwrap();
    let service = build_service(&cfg, Arc::new(FixedClock::new(date(2024, 1, 5)))).unwrap();

    let series = service
        .get_resource_series(
            &plandag::resources::ResourceScope::All,
            cfg.config.default_window,
        )
        .unwrap();
    assert_eq!(series.get("surveyor"), Some(&[2, 2, 2, 2, 0, 0, 0][..]));
    assert_eq!(series.get("engineer"), Some(&[0; 7][..]));
}

#[test]
fn completed_activities_do_not_re_emit_after_loading() {
    let cfg = load_from_str(PLAN)
        .and_then(plandag::config::ConfigFile::try_from)
        .unwrap();
    let alpha = cfg.project("alpha").unwrap();
    assert!(alpha.emitted_task_keys.is_empty());

    let service = build_service(&cfg, Arc::new(FixedClock::new(date(2024, 1, 9)))).unwrap();
    service
        .transition_status("alpha", "survey", ActivityStatus::InProgress)
        .unwrap();
    let outcome = service
        .transition_status("alpha", "survey", ActivityStatus::Completed)
        .unwrap();
    assert_eq!(outcome.emitted.len(), 1);
    assert_eq!(outcome.emitted[0].assignee.as_deref(), Some("coordinator"));
}

#[test]
fn dag_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[project.p.activity.A]
predecessors = [{ activity = "B" }]

[project.p.activity.B]
predecessors = [{ activity = "A" }]
"#,
    );

    match load_and_validate(file.path()) {
        Err(PlandagError::DependencyCycle { cycle_nodes }) => {
            assert_eq!(cycle_nodes, vec!["A", "B"]);
        }
        Err(e) => panic!("Expected DependencyCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn initial_dates_must_satisfy_constraints() {
    let file = write_config(
        r#"
[project.p.activity.A]
planned_start = "2024-01-01"
duration = 5

[project.p.activity.B]
planned_start = "2024-01-03"
predecessors = [{ activity = "A", link = "FS" }]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(err.computed_minimum(), Some((Some(date(2024, 1, 6)), None)));
}

#[test]
fn field_level_errors_are_config_errors() {
    let cases = [
        ("", "at least one [project"),
        (
            "[project.p.activity.A]\nduration = 0\n",
            "duration must be >= 1",
        ),
        (
            "[project.p.activity.A]\npercent_complete = 120\n",
            "percent_complete",
        ),
        (
            "[project.p.activity.A]\ncatalog = \"nope\"\n",
            "unknown catalog entry",
        ),
        (
            "[config]\nresource_types = [\"surveyor\"]\n[project.p.activity.A]\nresources = [{ type = \"crane\", number = 1 }]\n",
            "not listed",
        ),
        (
            "[project.p.activity.A]\nactual_finish = \"2024-01-02\"\n",
            "only allowed on completed",
        ),
        (
            "[project.p.activity.A]\nplanned_start = \"2024-01-05\"\nplanned_finish = \"2024-01-09\"\nduration = 3\n",
            "does not match",
        ),
    ];

    for (toml, needle) in cases {
        let result = load_from_str(toml).and_then(plandag::config::ConfigFile::try_from);
        match result {
            Err(PlandagError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle:?}");
            }
            Err(e) => panic!("Expected ConfigError for {toml:?}, got: {e:?}"),
            Ok(_) => panic!("Expected error for {toml:?}, got Ok"),
        }
    }
}

#[test]
fn bad_window_is_a_toml_error() {
    let err = load_from_str("[config]\ndefault_window = \"10\"\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(matches!(err, PlandagError::TomlError(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Plandag.toml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
