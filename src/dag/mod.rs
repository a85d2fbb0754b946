// src/dag/mod.rs

//! Precedence graph handling.
//!
//! - [`graph`] rebuilds successor lists as the transpose of predecessor
//!   lists and offers a read-only [`PrecedenceGraph`] view.
//! - [`topo`] validates acyclicity and produces a deterministic
//!   topological order.

pub mod graph;
pub mod topo;

pub use graph::{Adjacency, GraphRebuild, GraphWarning, PrecedenceGraph, rebuild_successors, resync};
pub use topo::{CycleReport, ensure_acyclic, topo_sort};
