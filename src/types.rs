use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Precedence relation between a predecessor and the activity that lists it.
///
/// - `FS`: the child may start the day after the predecessor finishes.
/// - `SS`: the child may start when the predecessor starts.
/// - `FF`: the child may finish when the predecessor finishes.
/// - `SF`: the child may finish when the predecessor starts.
///
/// Each link carries a signed lag in whole days on top of the base rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkType {
    #[serde(rename = "FS", alias = "fs")]
    FinishToStart,
    #[serde(rename = "SS", alias = "ss")]
    StartToStart,
    #[serde(rename = "FF", alias = "ff")]
    FinishToFinish,
    #[serde(rename = "SF", alias = "sf")]
    StartToFinish,
}

impl LinkType {
    pub fn code(&self) -> &'static str {
        match self {
            LinkType::FinishToStart => "FS",
            LinkType::StartToStart => "SS",
            LinkType::FinishToFinish => "FF",
            LinkType::StartToFinish => "SF",
        }
    }

    /// Whether this link bounds the child's start (as opposed to its finish).
    pub fn bounds_start(&self) -> bool {
        matches!(self, LinkType::FinishToStart | LinkType::StartToStart)
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::FinishToStart
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FS" => Ok(LinkType::FinishToStart),
            "SS" => Ok(LinkType::StartToStart),
            "FF" => Ok(LinkType::FinishToFinish),
            "SF" => Ok(LinkType::StartToFinish),
            other => Err(format!(
                "invalid link type: {other} (expected FS, SS, FF or SF)"
            )),
        }
    }
}

/// Lifecycle status of a single activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for ActivityStatus {
    fn default() -> Self {
        ActivityStatus::NotStarted
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityStatus::NotStarted => "not_started",
            ActivityStatus::InProgress => "in_progress",
            ActivityStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(ActivityStatus::NotStarted),
            "in_progress" => Ok(ActivityStatus::InProgress),
            "completed" => Ok(ActivityStatus::Completed),
            other => Err(format!(
                "invalid activity status: {other} (expected not_started, in_progress or completed)"
            )),
        }
    }
}

/// Gating status of an external entity that depends on an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    NotAllowed,
    Allowed,
    Approved,
    Rejected,
}

impl DependencyStatus {
    /// `approved` / `rejected` are set by an external actor and hold until
    /// the owning activity changes status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DependencyStatus::Approved | DependencyStatus::Rejected)
    }
}

impl Default for DependencyStatus {
    fn default() -> Self {
        DependencyStatus::NotAllowed
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyStatus::NotAllowed => "not_allowed",
            DependencyStatus::Allowed => "allowed",
            DependencyStatus::Approved => "approved",
            DependencyStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Decision an external actor can record against an allowed dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyDecision {
    Approved,
    Rejected,
}

impl From<DependencyDecision> for DependencyStatus {
    fn from(decision: DependencyDecision) -> Self {
        match decision {
            DependencyDecision::Approved => DependencyStatus::Approved,
            DependencyDecision::Rejected => DependencyStatus::Rejected,
        }
    }
}

impl FromStr for DependencyDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" | "approve" => Ok(DependencyDecision::Approved),
            "rejected" | "reject" => Ok(DependencyDecision::Rejected),
            other => Err(format!(
                "invalid dependency decision: {other} (expected approved or rejected)"
            )),
        }
    }
}

/// Whether a catalog activity is visible to the client or purely internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    FrontendFacing,
    BackendOnly,
}

impl Default for ActivityKind {
    fn default() -> Self {
        ActivityKind::BackendOnly
    }
}

/// Plan-level status derived from the statuses of every activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for PlanStatus {
    fn default() -> Self {
        PlanStatus::NotStarted
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStatus::NotStarted => "not_started",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Lookahead window for resource demand aggregation.
///
/// Only the fixed set of sizes below is accepted; free-form day counts are
/// rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowSize {
    Days7,
    Days14,
    Days21,
    Days30,
    Days90,
    Days180,
}

impl WindowSize {
    pub const ALL: [WindowSize; 6] = [
        WindowSize::Days7,
        WindowSize::Days14,
        WindowSize::Days21,
        WindowSize::Days30,
        WindowSize::Days90,
        WindowSize::Days180,
    ];

    pub fn days(&self) -> u32 {
        match self {
            WindowSize::Days7 => 7,
            WindowSize::Days14 => 14,
            WindowSize::Days21 => 21,
            WindowSize::Days30 => 30,
            WindowSize::Days90 => 90,
            WindowSize::Days180 => 180,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.days() == days)
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::Days14
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl FromStr for WindowSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let digits = trimmed
            .strip_suffix("days")
            .or_else(|| trimmed.strip_suffix('d'))
            .unwrap_or(&trimmed)
            .trim();

        digits
            .parse::<u32>()
            .ok()
            .and_then(WindowSize::from_days)
            .ok_or_else(|| {
                format!("invalid window: {s} (expected one of 7, 14, 21, 30, 90, 180)")
            })
    }
}

impl TryFrom<String> for WindowSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowSize> for String {
    fn from(value: WindowSize) -> Self {
        value.to_string()
    }
}
