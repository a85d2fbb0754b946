// src/resources.rs

//! Day-by-day resource demand aggregation.
//!
//! Every activity whose planned interval intersects the lookahead window is
//! clipped to the window and its resource counts are added to each day of
//! the clipped interval. The result is dense: every resource type gets one
//! zero-filled value per day of the window.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::model::dates::shift_days;
use crate::model::{ActivityNode, ProjectId, ResourceRole};
use crate::types::WindowSize;

/// Which schedules feed the aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    Project(ProjectId),
    All,
}

/// Per-resource-type daily demand over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSeries {
    /// First day of the window.
    pub start: NaiveDate,
    /// Every day of the window, in order.
    pub days: Vec<NaiveDate>,
    /// One value per entry of `days` for each resource type.
    pub series: BTreeMap<ResourceRole, Vec<u64>>,
}

impl ResourceSeries {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, role: &str) -> Option<&[u64]> {
        self.series.get(role).map(|v| v.as_slice())
    }

    /// Sum of one resource type over the whole window.
    pub fn total(&self, role: &str) -> u64 {
        self.get(role).map_or(0, |v| v.iter().sum())
    }

    /// Highest single-day demand of one resource type.
    pub fn peak(&self, role: &str) -> u64 {
        self.get(role)
            .and_then(|v| v.iter().copied().max())
            .unwrap_or(0)
    }
}

/// Aggregate demand of `activities` over `window` days starting at `today`.
///
/// `known_roles` always get a (possibly all-zero) series, even if no
/// activity in the window needs them.
pub fn aggregate_demand<'a, I>(
    activities: I,
    window: WindowSize,
    today: NaiveDate,
    known_roles: &[ResourceRole],
) -> ResourceSeries
where
    I: IntoIterator<Item = &'a ActivityNode>,
{
    let len = window.days() as usize;
    let window_end = shift_days(today, i64::from(window.days()) - 1);

    let days: Vec<NaiveDate> = (0..len).map(|i| shift_days(today, i as i64)).collect();
    let mut series: BTreeMap<ResourceRole, Vec<u64>> = known_roles
        .iter()
        .map(|role| (role.clone(), vec![0; len]))
        .collect();

    let mut contributing = 0usize;

    for activity in activities {
        let Some((start, finish)) = activity.planned_span() else {
            continue;
        };
        if finish < today || start > window_end || finish < start {
            continue;
        }

        let from = (start.max(today) - today).num_days() as usize;
        let to = (finish.min(window_end) - today).num_days() as usize;
        contributing += 1;

        for req in &activity.resources {
            let buckets = series
                .entry(req.role.clone())
                .or_insert_with(|| vec![0; len]);
            for bucket in &mut buckets[from..=to] {
                *bucket += u64::from(req.number);
            }
        }
    }

    debug!(
        window = window.days(),
        %today,
        contributing,
        roles = series.len(),
        "aggregated resource demand"
    );

    ResourceSeries {
        start: today,
        days,
        series,
    }
}
