// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::catalog::{CatalogEntry, CatalogPredecessor, DependencyTemplate};
use crate::config::model::{
    ActivityConfig, CatalogConfig, ConfigFile, DependencyConfig, LinkConfig, ProjectConfig,
    RawConfigFile, ResourceConfig,
};
use crate::dag::{GraphWarning, ensure_acyclic, resync};
use crate::engine::{DateInput, compute_min_constraints, reconcile_dates};
use crate::errors::{PlandagError, Result};
use crate::gating::IdempotencyKey;
use crate::model::{
    ActivityId, ActivityNode, CatalogActivityId, ExternalDependency, PredecessorLink,
    ProjectSchedule, ResourceRequirement, StatusEntry,
};
use crate::types::{ActivityStatus, DependencyStatus};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PlandagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let catalog: BTreeMap<String, CatalogEntry> = raw
            .catalog
            .iter()
            .map(|(id, cfg)| (id.clone(), catalog_entry(id, cfg)))
            .collect();

        let mut projects = Vec::with_capacity(raw.project.len());
        let mut warnings = Vec::new();
        for (id, project) in raw.project.iter() {
            let (schedule, mut project_warnings) =
                build_project(id, project, &catalog, raw.config.use_actuals)?;
            projects.push(schedule);
            warnings.append(&mut project_warnings);
        }

        if !warnings.is_empty() {
            warn!(count = warnings.len(), "config references dropped while building schedules");
        }

        Ok(ConfigFile::new_unchecked(
            raw.config,
            catalog.into_values().collect(),
            projects,
            warnings,
        ))
    }
}

/// Field-level checks that do not need the built graph.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_projects(cfg)?;
    validate_catalog(cfg)?;
    validate_activities(cfg)?;
    Ok(())
}

fn ensure_has_projects(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.is_empty() {
        return Err(PlandagError::ConfigError(
            "config must contain at least one [project.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_catalog(cfg: &RawConfigFile) -> Result<()> {
    for (id, entry) in cfg.catalog.iter() {
        let context = format!("catalog '{id}'");
        if entry.duration == Some(0) {
            return Err(PlandagError::ConfigError(format!(
                "{context}: duration must be >= 1 (got 0)"
            )));
        }
        for pred in entry.predecessors.iter() {
            if !cfg.catalog.contains_key(&pred.activity) {
                return Err(PlandagError::ConfigError(format!(
                    "{context} has unknown predecessor '{}'",
                    pred.activity
                )));
            }
            if &pred.activity == id {
                return Err(PlandagError::ConfigError(format!(
                    "{context} cannot precede itself"
                )));
            }
        }
        validate_resources(cfg, &context, &entry.resources)?;
        validate_dependencies(&context, &entry.dependencies)?;
    }
    Ok(())
}

fn validate_activities(cfg: &RawConfigFile) -> Result<()> {
    for (project_id, project) in cfg.project.iter() {
        for (id, activity) in project.activity.iter() {
            let context = format!("activity '{project_id}/{id}'");

            if let Some(catalog) = &activity.catalog {
                if !cfg.catalog.contains_key(catalog) {
                    return Err(PlandagError::ConfigError(format!(
                        "{context} references unknown catalog entry '{catalog}'"
                    )));
                }
            }
            if activity.duration == Some(0) {
                return Err(PlandagError::ConfigError(format!(
                    "{context}: duration must be >= 1 (got 0)"
                )));
            }
            if activity.percent_complete > 100 {
                return Err(PlandagError::ConfigError(format!(
                    "{context}: percent_complete must be 0..=100 (got {})",
                    activity.percent_complete
                )));
            }
            if let (Some(start), Some(finish)) = (activity.actual_start, activity.actual_finish) {
                if finish < start {
                    return Err(PlandagError::ConfigError(format!(
                        "{context}: actual_finish {finish} is before actual_start {start}"
                    )));
                }
            }
            if activity.actual_finish.is_some() && activity.status != ActivityStatus::Completed {
                return Err(PlandagError::ConfigError(format!(
                    "{context}: actual_finish is only allowed on completed activities"
                )));
            }
            if activity.actual_start.is_some() && activity.status == ActivityStatus::NotStarted {
                return Err(PlandagError::ConfigError(format!(
                    "{context}: actual_start is not allowed on a not_started activity"
                )));
            }
            for pred in activity.predecessors.iter().flatten() {
                if &pred.activity == id {
                    return Err(PlandagError::ConfigError(format!(
                        "{context} cannot precede itself"
                    )));
                }
            }
            if let Some(resources) = &activity.resources {
                validate_resources(cfg, &context, resources)?;
            }
            if let Some(dependencies) = &activity.dependencies {
                validate_dependencies(&context, dependencies)?;
            }
        }
    }
    Ok(())
}

fn validate_resources(cfg: &RawConfigFile, context: &str, resources: &[ResourceConfig]) -> Result<()> {
    let allowed = &cfg.config.resource_types;
    for res in resources {
        if res.number == 0 {
            return Err(PlandagError::ConfigError(format!(
                "{context}: resource '{}' must request at least 1 unit",
                res.role
            )));
        }
        if !allowed.is_empty() && !allowed.contains(&res.role) {
            return Err(PlandagError::ConfigError(format!(
                "{context}: resource type '{}' is not listed in [config].resource_types",
                res.role
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(context: &str, dependencies: &[DependencyConfig]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for dep in dependencies {
        if !seen.insert(dep.id.as_str()) {
            return Err(PlandagError::ConfigError(format!(
                "{context}: duplicate dependency id '{}'",
                dep.id
            )));
        }
    }
    Ok(())
}

fn catalog_entry(id: &str, cfg: &CatalogConfig) -> CatalogEntry {
    CatalogEntry {
        id: CatalogActivityId::new(id),
        name: cfg.name.clone().unwrap_or_else(|| id.to_string()),
        kind: cfg.kind,
        duration: cfg.duration.unwrap_or(1),
        predecessors: cfg
            .predecessors
            .iter()
            .map(|p| CatalogPredecessor {
                catalog_activity_id: CatalogActivityId::new(p.activity.as_str()),
                link_type: p.link,
                lag: p.lag,
            })
            .collect(),
        dependencies: cfg.dependencies.iter().map(dependency_template).collect(),
        resources: cfg.resources.iter().map(resource_requirement).collect(),
    }
}

fn dependency_template(cfg: &DependencyConfig) -> DependencyTemplate {
    DependencyTemplate {
        id: cfg.id.as_str().into(),
        external_model: cfg.model.clone(),
        external_id: cfg.external_id.clone(),
        display_name: cfg.name.clone().unwrap_or_else(|| cfg.external_id.clone()),
        assignee: cfg.assignee.clone(),
    }
}

fn resource_requirement(cfg: &ResourceConfig) -> ResourceRequirement {
    ResourceRequirement::new(cfg.role.as_str(), cfg.number)
}

fn predecessor_link(cfg: &LinkConfig) -> PredecessorLink {
    PredecessorLink::new(cfg.activity.as_str(), cfg.link, cfg.lag)
}

/// Build one project's schedule and check it the same way an edit would be.
fn build_project(
    project_id: &str,
    cfg: &ProjectConfig,
    catalog: &BTreeMap<String, CatalogEntry>,
    use_actuals: bool,
) -> Result<(ProjectSchedule, Vec<GraphWarning>)> {
    let mut schedule = ProjectSchedule::new(
        project_id,
        cfg.name.clone().unwrap_or_else(|| project_id.to_string()),
    );
    let mut warnings = Vec::new();

    // Explicit orders first; the rest follow in id order.
    let mut next_order = cfg
        .activity
        .values()
        .filter_map(|a| a.order)
        .max()
        .unwrap_or(0);

    for (id, activity) in cfg.activity.iter() {
        let entry = activity.catalog.as_ref().and_then(|c| catalog.get(c));
        let mut node = build_node(project_id, id, activity, entry)?;
        node.order = match activity.order {
            Some(order) => order,
            None => {
                next_order += 1;
                next_order
            }
        };
        schedule.insert(node);
    }

    // Catalog default predecessors can only be resolved once every node of
    // the project exists.
    for (id, activity) in cfg.activity.iter() {
        if activity.predecessors.is_some() {
            continue;
        }
        let Some(entry) = activity.catalog.as_ref().and_then(|c| catalog.get(c)) else {
            continue;
        };
        let links = resolve_catalog_predecessors(&schedule, id, entry, &mut warnings);
        schedule.get_mut(id)?.predecessors = links;
    }

    warnings.extend(resync(&mut schedule));
    ensure_acyclic(&schedule.nodes)?;

    for node in schedule.nodes() {
        let bounds = compute_min_constraints(node, &schedule.nodes, use_actuals);
        bounds.check(&node.id, node.planned_start, node.planned_finish)?;
    }

    seed_emitted_keys(&mut schedule);
    schedule.refresh_plan_status(load_instant());

    debug!(
        project = %project_id,
        activities = schedule.len(),
        status = %schedule.status,
        "project loaded from config"
    );

    Ok((schedule, warnings))
}

fn build_node(
    project_id: &str,
    id: &str,
    cfg: &ActivityConfig,
    entry: Option<&CatalogEntry>,
) -> Result<ActivityNode> {
    let mut node = ActivityNode::new(id);

    if let Some(entry) = entry {
        node.catalog_activity_id = Some(entry.id.clone());
        node.name = entry.name.clone();
        node.kind = entry.kind;
        node.duration = entry.duration.max(1);
        node.resources = entry.resources.clone();
        node.dependencies = entry.dependencies.iter().map(|t| t.instantiate()).collect();
    }

    if let Some(name) = &cfg.name {
        node.name = name.clone();
    }
    if let Some(kind) = cfg.kind {
        node.kind = kind;
    }
    if let Some(resources) = &cfg.resources {
        node.resources = resources.iter().map(resource_requirement).collect();
    }
    if let Some(dependencies) = &cfg.dependencies {
        node.dependencies = dependencies
            .iter()
            .map(|d| dependency_template(d).instantiate())
            .collect();
    }
    if let Some(predecessors) = &cfg.predecessors {
        node.predecessors = predecessors.iter().map(predecessor_link).collect();
    }

    let dates = reconcile_dates(
        DateInput {
            start: cfg.planned_start,
            finish: cfg.planned_finish,
            duration: cfg.duration,
        },
        &node,
    )
    .map_err(|err| PlandagError::ConfigError(format!("activity '{project_id}/{id}': {err}")))?;
    node.planned_start = dates.start;
    node.planned_finish = dates.finish;
    node.duration = dates.duration;

    node.actual_start = cfg.actual_start;
    node.actual_finish = cfg.actual_finish;
    node.current_status = cfg.status;
    node.percent_complete = match cfg.status {
        ActivityStatus::Completed => 100,
        _ => cfg.percent_complete,
    };

    let at = load_instant();
    node.status_history.push(StatusEntry {
        status: cfg.status,
        at,
    });

    let gate = match cfg.status {
        ActivityStatus::Completed => DependencyStatus::Allowed,
        _ => DependencyStatus::NotAllowed,
    };
    for dep in node.dependencies.iter_mut() {
        dep.set_status(gate, at);
    }

    Ok(node)
}

fn resolve_catalog_predecessors(
    schedule: &ProjectSchedule,
    activity: &str,
    entry: &CatalogEntry,
    warnings: &mut Vec<GraphWarning>,
) -> Vec<PredecessorLink> {
    let mut links = Vec::new();
    for pred in entry.predecessors.iter() {
        let matches: Vec<&ActivityId> = schedule
            .nodes()
            .filter(|n| n.catalog_activity_id.as_ref() == Some(&pred.catalog_activity_id))
            .map(|n| &n.id)
            .collect();

        if matches.is_empty() {
            warnings.push(GraphWarning::UnresolvedCatalogPredecessor {
                activity: ActivityId::new(activity),
                catalog_activity: pred.catalog_activity_id.clone(),
            });
            continue;
        }
        for id in matches {
            links.push(PredecessorLink::new(id.clone(), pred.link_type, pred.lag));
        }
    }
    links
}

/// Activities that are already completed in the file have had their tasks
/// handed out before; record them so a later regression and re-completion
/// does not send them again.
fn seed_emitted_keys(schedule: &mut ProjectSchedule) {
    let keys: Vec<IdempotencyKey> = schedule
        .nodes()
        .filter(|n| n.is_completed())
        .flat_map(|n| n.dependencies.iter().map(move |d| emitted_key(&n.id, d)))
        .collect();
    schedule.emitted_task_keys.extend(keys);
}

fn emitted_key(activity: &ActivityId, dep: &ExternalDependency) -> IdempotencyKey {
    IdempotencyKey::new(activity.clone(), dep.id.clone(), dep.external_id.as_str())
}

/// History entries for state read from a file carry the Unix epoch; the
/// real transition time is not known.
fn load_instant() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}
