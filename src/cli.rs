// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::model::ActivityId;
use crate::types::{ActivityStatus, WindowSize};

/// Command-line arguments for `plandag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "plandag",
    version,
    about = "Validate and schedule project activity graphs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `PLANDAG_CONFIG`, or `Plandag.toml` in the current working
    /// directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLANDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true, value_name = "DATE")]
    pub today: Option<NaiveDate>,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Parse + validate the config and print a summary.
    Check,

    /// Print the ordered activity list of a project.
    Schedule {
        #[arg(long, value_name = "ID")]
        project: String,
    },

    /// Print daily resource demand for a project or the whole portfolio.
    Resources {
        /// Limit to one project; all projects when omitted.
        #[arg(long, value_name = "ID")]
        project: Option<String>,

        /// Lookahead in days: 7, 14, 21, 30, 90 or 180.
        #[arg(long, value_name = "DAYS")]
        window: Option<WindowSize>,
    },

    /// Validate an edit to one activity and show the propagated result.
    Apply {
        #[arg(long, value_name = "ID")]
        project: String,

        #[arg(long, value_name = "ID")]
        activity: String,

        #[arg(long, value_name = "DATE")]
        start: Option<NaiveDate>,

        #[arg(long, value_name = "DATE")]
        finish: Option<NaiveDate>,

        #[arg(long, value_name = "DAYS")]
        duration: Option<u32>,

        #[arg(long, value_name = "PERCENT")]
        percent: Option<u8>,
    },

    /// Change an activity's status and dispatch any resulting tasks.
    Status {
        #[arg(long, value_name = "ID")]
        project: String,

        #[arg(long, value_name = "ID")]
        activity: String,

        /// not_started, in_progress or completed.
        #[arg(long, value_name = "STATUS")]
        to: ActivityStatus,
    },

    /// Assign a new display order; unlisted activities go last.
    Reorder {
        #[arg(long, value_name = "ID")]
        project: String,

        #[arg(value_name = "ACTIVITY", required = true)]
        ids: Vec<ActivityId>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
