// src/errors.rs

//! Crate-wide error type and helpers.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::engine::constraint::ConstraintViolation;
use crate::types::ActivityStatus;

#[derive(Error, Debug)]
pub enum PlandagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Cycle detected in precedence graph involving: {}", .cycle_nodes.join(", "))]
    DependencyCycle { cycle_nodes: Vec<String> },

    #[error("{0}")]
    ConstraintViolation(Box<ConstraintViolation>),

    #[error("Invalid status transition for activity '{activity}': {from} -> {to}")]
    InvalidTransition {
        activity: String,
        from: String,
        to: String,
    },

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Version conflict on project '{project}': expected {expected}, found {actual}")]
    VersionConflict {
        project: String,
        expected: u64,
        actual: u64,
    },

    #[error("Task dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Entity named in a [`PlandagError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Activity,
    CatalogActivity,
    Dependency,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Project => "Project",
            EntityKind::Activity => "Activity",
            EntityKind::CatalogActivity => "Catalog activity",
            EntityKind::Dependency => "Dependency",
        };
        f.write_str(s)
    }
}

/// Flat classification of [`PlandagError`] for callers that only need the
/// `error_kind` of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Config,
    Io,
    NotFound,
    DependencyCycle,
    ConstraintViolation,
    InvalidTransition,
    InvalidPatch,
    VersionConflict,
    Dispatch,
    Other,
}

impl PlandagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlandagError::ConfigError(_) | PlandagError::TomlError(_) => ErrorKind::Config,
            PlandagError::IoError(_) => ErrorKind::Io,
            PlandagError::NotFound { .. } => ErrorKind::NotFound,
            PlandagError::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            PlandagError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            PlandagError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            PlandagError::InvalidPatch(_) => ErrorKind::InvalidPatch,
            PlandagError::VersionConflict { .. } => ErrorKind::VersionConflict,
            PlandagError::Dispatch(_) => ErrorKind::Dispatch,
            PlandagError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        PlandagError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        activity: impl fmt::Display,
        from: ActivityStatus,
        to: ActivityStatus,
    ) -> Self {
        PlandagError::InvalidTransition {
            activity: activity.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Computed minimum dates carried by a constraint violation, if any.
    pub fn computed_minimum(&self) -> Option<(Option<NaiveDate>, Option<NaiveDate>)> {
        match self {
            PlandagError::ConstraintViolation(v) => Some((v.min_start, v.min_finish)),
            _ => None,
        }
    }
}

impl From<ConstraintViolation> for PlandagError {
    fn from(v: ConstraintViolation) -> Self {
        PlandagError::ConstraintViolation(Box::new(v))
    }
}

pub type Result<T> = std::result::Result<T, PlandagError>;
