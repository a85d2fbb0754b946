// src/config/mod.rs

//! Configuration loading and validation for plandag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Build project schedules and check them the same way the engine checks
//!   an edit: acyclic graph, satisfied constraints, consistent dates
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ActivityConfig, CatalogConfig, ConfigFile, ConfigSection, DependencyConfig, LinkConfig,
    ProjectConfig, RawConfigFile, ResourceConfig,
};
pub use validate::validate_raw_config;
