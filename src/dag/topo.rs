// src/dag/topo.rs

//! Cycle detection and deterministic topological ordering.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use tracing::debug;

use crate::dag::graph::PrecedenceGraph;
use crate::errors::{PlandagError, Result};
use crate::model::{ActivityId, ActivityNode};

/// Failure of [`topo_sort`]: the precedence graph is not a DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Nodes that sit on at least one cycle, sorted by id.
    pub cycle_nodes: Vec<ActivityId>,
    /// Every node that never reached in-degree zero (cycle members plus
    /// anything downstream of them), sorted by id.
    pub blocked: Vec<ActivityId>,
}

impl From<CycleReport> for PlandagError {
    fn from(report: CycleReport) -> Self {
        PlandagError::DependencyCycle {
            cycle_nodes: report
                .cycle_nodes
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

/// Kahn-style in-degree elimination.
///
/// Among nodes that are ready at the same time the one with the lowest
/// `(order, id)` goes first, so the output is a deterministic total order.
pub fn topo_sort(
    nodes: &BTreeMap<ActivityId, ActivityNode>,
) -> std::result::Result<Vec<ActivityId>, CycleReport> {
    let graph = PrecedenceGraph::from_nodes(nodes);
    let inner = graph.inner();

    let mut in_degree: HashMap<&str, usize> = inner
        .nodes()
        .map(|n| (n, inner.neighbors_directed(n, Direction::Incoming).count()))
        .collect();

    let rank = |id: &str| -> u32 { nodes.get(id).map_or(u32::MAX, |n| n.order) };

    let mut ready: BinaryHeap<Reverse<(u32, &str)>> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| Reverse((rank(id), *id)))
        .collect();

    let mut sorted: Vec<ActivityId> = Vec::with_capacity(nodes.len());

    while let Some(Reverse((_, id))) = ready.pop() {
        sorted.push(ActivityId::new(id));
        for succ in inner.neighbors_directed(id, Direction::Outgoing) {
            if let Some(deg) = in_degree.get_mut(succ) {
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse((rank(succ), succ)));
                }
            }
        }
    }

    if sorted.len() == nodes.len() {
        return Ok(sorted);
    }

    let mut blocked: Vec<ActivityId> = in_degree
        .into_iter()
        .filter(|(_, deg)| *deg > 0)
        .map(|(id, _)| ActivityId::new(id))
        .collect();
    blocked.sort();

    let mut cycle_nodes: Vec<ActivityId> = tarjan_scc(inner)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|n| inner.contains_edge(*n, *n)))
        .flatten()
        .map(ActivityId::new)
        .collect();
    cycle_nodes.sort();

    debug!(?cycle_nodes, blocked = blocked.len(), "precedence graph has a cycle");

    Err(CycleReport {
        cycle_nodes,
        blocked,
    })
}

/// [`topo_sort`] mapped onto the crate error (`DependencyCycle`).
pub fn ensure_acyclic(nodes: &BTreeMap<ActivityId, ActivityNode>) -> Result<Vec<ActivityId>> {
    topo_sort(nodes).map_err(PlandagError::from)
}
