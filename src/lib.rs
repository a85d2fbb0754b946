// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod gating;
pub mod logging;
pub mod model;
pub mod resources;
pub mod service;
pub mod store;
pub mod types;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::catalog::InMemoryCatalog;
use crate::cli::{CliArgs, Command};
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::engine::{ActivityPatch, EngineOptions};
use crate::gating::{GatingPolicy, TaskRequest, spawn_task_forwarder};
use crate::model::ProjectId;
use crate::resources::ResourceScope;
use crate::service::{PlanningService, ScheduleView};
use crate::store::{InMemoryStore, ScheduleStore};

/// Build a service backed by in-memory storage seeded from `cfg`.
pub fn build_service(cfg: &ConfigFile, clock: Arc<dyn Clock>) -> Result<PlanningService> {
    let store = InMemoryStore::new();
    for project in cfg.projects.iter().cloned() {
        store.create(project)?;
    }
    let catalog: InMemoryCatalog = cfg.catalog.iter().cloned().collect();

    Ok(PlanningService::new(Arc::new(store), Arc::new(catalog), clock)
        .with_options(EngineOptions {
            use_actuals: cfg.config.use_actuals,
        })
        .with_policy(GatingPolicy {
            default_assignee: cfg.config.default_assignee.clone(),
        })
        .with_known_roles(cfg.known_roles()))
}

/// High-level entry point used by `main.rs`.
///
/// Every command works on the schedules loaded from the config file; edits
/// are validated and printed but not written back to disk.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    for warning in &cfg.warnings {
        warn!(?warning, "config reference dropped");
    }

    let clock: Arc<dyn Clock> = match args.today {
        Some(today) => Arc::new(FixedClock::new(today)),
        None => Arc::new(SystemClock),
    };
    let service = build_service(&cfg, clock)?;

    match args.command {
        Command::Check => {
            print_check(&cfg, args.json)?;
        }
        Command::Schedule { project } => {
            let view = service.get_schedule(&project)?;
            emit(args.json, &view, || print_schedule(&view))?;
        }
        Command::Resources { project, window } => {
            let scope = match project {
                Some(id) => ResourceScope::Project(ProjectId::new(id)),
                None => ResourceScope::All,
            };
            let window = window.unwrap_or(cfg.config.default_window);
            let series = service.get_resource_series(&scope, window)?;
            emit(args.json, &series, || {
                println!("resource demand from {} ({} days)", series.start, window);
                for (role, values) in series.series.iter() {
                    let days: Vec<String> = values.iter().map(u64::to_string).collect();
                    println!(
                        "  {role:<16} total {:>5}  peak {:>3}  [{}]",
                        series.total(role.as_str()),
                        series.peak(role.as_str()),
                        days.join(" ")
                    );
                }
            })?;
        }
        Command::Apply {
            project,
            activity,
            start,
            finish,
            duration,
            percent,
        } => {
            let patch = ActivityPatch {
                planned_start: start,
                planned_finish: finish,
                duration,
                percent_complete: percent,
                ..ActivityPatch::default()
            };
            let outcome = service.validate_and_apply(&project, &activity, &patch)?;
            emit(args.json, &outcome, || {
                let node = &outcome.activity;
                println!(
                    "{}: {} .. {} ({} days)",
                    node.id,
                    fmt_date(node.planned_start),
                    fmt_date(node.planned_finish),
                    node.duration
                );
                for shift in &outcome.propagation.shifted {
                    println!(
                        "  shifted {}: {} -> {} (+{}d)",
                        shift.activity, shift.from_start, shift.to_start, shift.days
                    );
                }
                for warning in &outcome.warnings {
                    println!("  warning: {warning:?}");
                }
            })?;
        }
        Command::Status {
            project,
            activity,
            to,
        } => {
            let delivered: Arc<Mutex<Vec<TaskRequest>>> = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&delivered);
            let (mut tasks, forwarder) = spawn_task_forwarder(64, move |request| {
                if let Ok(mut guard) = sink.lock() {
                    guard.push(request.clone());
                }
            });

            let (outcome, report) = service
                .transition_and_dispatch(&project, &activity, to, &mut tasks)
                .await?;

            // Closing the only sender lets the forwarder drain and exit.
            drop(tasks);
            let forwarded = forwarder.await.context("task forwarder panicked")?;
            debug!(forwarded, "task forwarder finished");

            let tasks: Vec<TaskRequest> = delivered
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default();
            let failed: Vec<_> = report.failed.iter().map(|(req, err)| json!({
                "idempotency_key": req.idempotency_key,
                "error": err,
            })).collect();

            let summary = json!({
                "transition": outcome,
                "tasks": tasks,
                "failed": failed,
            });
            emit(args.json, &summary, || {
                if outcome.changed {
                    println!("{}: {} -> {}", outcome.activity, outcome.from, outcome.to);
                } else {
                    println!("{}: already {}", outcome.activity, outcome.to);
                }
                for shift in &outcome.propagation.shifted {
                    println!(
                        "  shifted {}: {} -> {} (+{}d)",
                        shift.activity, shift.from_start, shift.to_start, shift.days
                    );
                }
                for task in &tasks {
                    println!(
                        "  task {} [{}] assignee={}",
                        task.title,
                        task.idempotency_key,
                        task.assignee.as_deref().unwrap_or("-")
                    );
                }
            })?;

            if !report.is_complete() {
                anyhow::bail!("{} task request(s) could not be delivered", report.failed.len());
            }
        }
        Command::Reorder { project, ids } => {
            let outcome = service.reorder(&project, &ids)?;
            emit(args.json, &outcome, || {
                for (idx, id) in outcome.order.iter().enumerate() {
                    println!("{:>3}. {id}", idx + 1);
                }
                if !outcome.ignored.is_empty() {
                    println!("ignored: {:?}", outcome.ignored);
                }
            })?;
        }
    }

    info!("done");
    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

fn fmt_date(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

fn print_schedule(view: &ScheduleView) {
    println!("{} ({}) [{}] v{}", view.name, view.project_id, view.status, view.version);
    for row in &view.rows {
        let node = &row.activity;
        let mut flags = Vec::new();
        if row.overdue {
            flags.push("overdue");
        }
        if row.ready {
            flags.push("ready");
        }
        println!(
            "  {:>3} {:<20} {} .. {} {:>3}d {:<11} {:>3}% {}",
            node.order,
            node.id.as_str(),
            fmt_date(node.planned_start),
            fmt_date(node.planned_finish),
            node.duration,
            node.current_status.to_string(),
            node.percent_complete,
            flags.join(",")
        );
    }
}

/// Config summary: the validated settings, projects and activity counts.
fn print_check(cfg: &ConfigFile, as_json: bool) -> Result<()> {
    if as_json {
        let projects: Vec<_> = cfg
            .projects
            .iter()
            .map(|p| {
                json!({
                    "project_id": p.project_id,
                    "name": p.name,
                    "status": p.status,
                    "activities": p.len(),
                })
            })
            .collect();
        let summary = json!({
            "use_actuals": cfg.config.use_actuals,
            "default_window": cfg.config.default_window,
            "resource_types": cfg.config.resource_types,
            "catalog": cfg.catalog.len(),
            "projects": projects,
            "warnings": cfg.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("plandag check");
    println!("  config.use_actuals = {}", cfg.config.use_actuals);
    println!("  config.default_window = {}", cfg.config.default_window);
    if !cfg.config.resource_types.is_empty() {
        println!("  config.resource_types = {:?}", cfg.config.resource_types);
    }
    println!("  catalog entries = {}", cfg.catalog.len());
    println!();

    println!("projects ({}):", cfg.projects.len());
    for project in &cfg.projects {
        println!(
            "  - {} \"{}\" [{}], {} activities",
            project.project_id,
            project.name,
            project.status,
            project.len()
        );
        for node in project.ordered() {
            let preds: Vec<String> = node
                .predecessors
                .iter()
                .map(|p| format!("{}:{}{:+}", p.activity_id, p.link_type, p.lag))
                .collect();
            if preds.is_empty() {
                println!("      {}", node.id);
            } else {
                println!("      {} after {}", node.id, preds.join(", "));
            }
        }
    }
    for warning in &cfg.warnings {
        println!("warning: {warning:?}");
    }

    debug!("check complete");
    Ok(())
}
