// src/engine/constraint.rs

//! Minimum start/finish computation from predecessor links, and duration
//! reconciliation for date edits.
//!
//! | Link | Bounds       | Formula                    |
//! |------|--------------|----------------------------|
//! | FS   | child.start  | pred.finish + lag + 1 day  |
//! | SS   | child.start  | pred.start + lag           |
//! | FF   | child.finish | pred.finish + lag          |
//! | SF   | child.finish | pred.start + lag           |
//!
//! The effective minimum is the latest bound of each kind.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{PlandagError, Result};
use crate::model::dates::{
    duration_from_span, finish_from_start, inclusive_span, shift_days, start_from_finish,
};
use crate::model::{ActivityId, ActivityNode, PredecessorLink};
use crate::types::LinkType;

/// Which date of the child a rule bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundTarget {
    Start,
    Finish,
}

/// One predecessor rule and the bound it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintReason {
    pub predecessor: ActivityId,
    pub link_type: LinkType,
    pub lag: i32,
    pub target: BoundTarget,
    pub bound: NaiveDate,
}

impl fmt::Display for ConstraintReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            BoundTarget::Start => "start",
            BoundTarget::Finish => "finish",
        };
        write!(
            f,
            "{} from '{}' (lag {}) requires {} >= {}",
            self.link_type, self.predecessor, self.lag, target, self.bound
        )
    }
}

/// Minimum dates allowed for an activity given its predecessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintBounds {
    pub min_start: Option<NaiveDate>,
    pub min_finish: Option<NaiveDate>,
    pub reasons: Vec<ConstraintReason>,
}

impl ConstraintBounds {
    /// Rules broken by the given dates. Empty when the dates are allowed.
    pub fn violated_by(
        &self,
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
    ) -> Vec<ConstraintReason> {
        self.reasons
            .iter()
            .filter(|r| {
                let date = match r.target {
                    BoundTarget::Start => start,
                    BoundTarget::Finish => finish,
                };
                date.is_some_and(|d| d < r.bound)
            })
            .cloned()
            .collect()
    }

    /// Reject `start`/`finish` for `activity` if they precede the minimum.
    pub fn check(
        &self,
        activity: &ActivityId,
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
    ) -> std::result::Result<(), ConstraintViolation> {
        let violated = self.violated_by(start, finish);
        if violated.is_empty() {
            return Ok(());
        }
        Err(ConstraintViolation {
            activity: activity.clone(),
            planned_start: start,
            planned_finish: finish,
            min_start: self.min_start,
            min_finish: self.min_finish,
            violated,
        })
    }
}

/// Details carried by a rejected edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub activity: ActivityId,
    pub planned_start: Option<NaiveDate>,
    pub planned_finish: Option<NaiveDate>,
    pub min_start: Option<NaiveDate>,
    pub min_finish: Option<NaiveDate>,
    pub violated: Vec<ConstraintReason>,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint violation on activity '{}'", self.activity)?;
        if let Some(min) = self.min_start {
            write!(f, "; minimum start {min}")?;
        }
        if let Some(min) = self.min_finish {
            write!(f, "; minimum finish {min}")?;
        }
        for reason in &self.violated {
            write!(f, "; {reason}")?;
        }
        Ok(())
    }
}

/// Bound a single predecessor link puts on the child, if the predecessor
/// has the date the rule needs.
pub fn link_bound(
    link: &PredecessorLink,
    pred: &ActivityNode,
    use_actuals: bool,
) -> Option<ConstraintReason> {
    let lag = i64::from(link.lag);
    let (target, bound) = match link.link_type {
        LinkType::FinishToStart => (
            BoundTarget::Start,
            shift_days(pred.effective_finish(use_actuals)?, lag + 1),
        ),
        LinkType::StartToStart => (
            BoundTarget::Start,
            shift_days(pred.effective_start(use_actuals)?, lag),
        ),
        LinkType::FinishToFinish => (
            BoundTarget::Finish,
            shift_days(pred.effective_finish(use_actuals)?, lag),
        ),
        LinkType::StartToFinish => (
            BoundTarget::Finish,
            shift_days(pred.effective_start(use_actuals)?, lag),
        ),
    };

    Some(ConstraintReason {
        predecessor: link.activity_id.clone(),
        link_type: link.link_type,
        lag: link.lag,
        target,
        bound,
    })
}

/// Compute the minimum start/finish of `activity` from its predecessors.
///
/// With `use_actuals` a predecessor's actual dates are preferred over its
/// planned ones. Links to unknown ids and predecessors without the needed
/// date contribute nothing.
pub fn compute_min_constraints(
    activity: &ActivityNode,
    lookup: &BTreeMap<ActivityId, ActivityNode>,
    use_actuals: bool,
) -> ConstraintBounds {
    let mut bounds = ConstraintBounds::default();

    for link in &activity.predecessors {
        let Some(pred) = lookup.get(&link.activity_id) else {
            continue;
        };
        let Some(reason) = link_bound(link, pred, use_actuals) else {
            continue;
        };

        let slot = match reason.target {
            BoundTarget::Start => &mut bounds.min_start,
            BoundTarget::Finish => &mut bounds.min_finish,
        };
        if slot.is_none_or(|current| reason.bound > current) {
            *slot = Some(reason.bound);
        }
        bounds.reasons.push(reason);
    }

    bounds
}

/// Date fields supplied by an edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateInput {
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub duration: Option<u32>,
}

impl DateInput {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.finish.is_none() && self.duration.is_none()
    }
}

/// Planned dates and duration after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledDates {
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub duration: u32,
}

/// Merge supplied date fields into the current ones.
///
/// - both dates given: duration becomes the inclusive span;
/// - one date given: the other is derived from the duration (supplied, or
///   the current one);
/// - only a duration given: finish is re-derived from the current start
///   (or start from the current finish when there is no start).
///
/// Duration never drops below 1.
pub fn reconcile_dates(input: DateInput, current: &ActivityNode) -> Result<ReconciledDates> {
    let duration = input.duration.map(|d| d.max(1));

    match (input.start, input.finish) {
        (Some(start), Some(finish)) => {
            let span = inclusive_span(start, finish);
            if span < 1 {
                return Err(PlandagError::InvalidPatch(format!(
                    "planned_finish {finish} is before planned_start {start}"
                )));
            }
            let span_duration = duration_from_span(span);
            if let Some(d) = duration {
                if d != span_duration {
                    return Err(PlandagError::InvalidPatch(format!(
                        "duration {d} does not match the {span_duration}-day span {start}..={finish}"
                    )));
                }
            }
            Ok(ReconciledDates {
                start: Some(start),
                finish: Some(finish),
                duration: span_duration,
            })
        }
        (Some(start), None) => {
            let duration = duration.unwrap_or(current.duration).max(1);
            Ok(ReconciledDates {
                start: Some(start),
                finish: Some(finish_from_start(start, duration)),
                duration,
            })
        }
        (None, Some(finish)) => {
            let duration = duration.unwrap_or(current.duration).max(1);
            Ok(ReconciledDates {
                start: Some(start_from_finish(finish, duration)),
                finish: Some(finish),
                duration,
            })
        }
        (None, None) => {
            let duration = duration.unwrap_or(current.duration).max(1);
            let (start, finish) = match (current.planned_start, current.planned_finish) {
                (Some(start), _) => (Some(start), Some(finish_from_start(start, duration))),
                (None, Some(finish)) => (Some(start_from_finish(finish, duration)), Some(finish)),
                (None, None) => (None, None),
            };
            Ok(ReconciledDates {
                start,
                finish,
                duration,
            })
        }
    }
}
