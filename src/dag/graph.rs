// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::warn;

use crate::model::{ActivityId, ActivityNode, CatalogActivityId, ProjectSchedule, SuccessorLink};
use crate::types::LinkType;

/// Successor lists keyed by the predecessor's id.
pub type Adjacency = BTreeMap<ActivityId, Vec<SuccessorLink>>;

/// Non-fatal findings from a graph rebuild.
///
/// References to activities that are not part of the project are dropped
/// rather than failing the request; the caller gets this list instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphWarning {
    DanglingPredecessor {
        activity: ActivityId,
        missing: ActivityId,
    },
    DanglingSuccessor {
        activity: ActivityId,
        missing: ActivityId,
    },
    /// A catalog default predecessor has no matching node in the project.
    UnresolvedCatalogPredecessor {
        activity: ActivityId,
        catalog_activity: CatalogActivityId,
    },
}

/// Output of [`rebuild_successors`].
#[derive(Debug, Clone, Default)]
pub struct GraphRebuild {
    pub adjacency: Adjacency,
    pub warnings: Vec<GraphWarning>,
}

/// Compute every node's successor list as the transpose of the global
/// predecessor relation.
///
/// Pure: `nodes` is only read. Predecessor edges pointing at unknown ids
/// are skipped and reported; stale successor entries pointing at unknown
/// ids are reported as well (they simply do not survive the rebuild).
pub fn rebuild_successors(nodes: &BTreeMap<ActivityId, ActivityNode>) -> GraphRebuild {
    let mut adjacency: Adjacency = nodes.keys().map(|id| (id.clone(), Vec::new())).collect();
    let mut warnings = Vec::new();

    for node in nodes.values() {
        for link in &node.predecessors {
            match adjacency.get_mut(&link.activity_id) {
                Some(successors) => successors.push(SuccessorLink {
                    activity_id: node.id.clone(),
                    link_type: link.link_type,
                    lag: link.lag,
                }),
                None => {
                    warn!(
                        activity = %node.id,
                        missing = %link.activity_id,
                        "dropping predecessor reference to unknown activity"
                    );
                    warnings.push(GraphWarning::DanglingPredecessor {
                        activity: node.id.clone(),
                        missing: link.activity_id.clone(),
                    });
                }
            }
        }

        for succ in &node.successors {
            if !nodes.contains_key(&succ.activity_id) {
                warn!(
                    activity = %node.id,
                    missing = %succ.activity_id,
                    "dropping successor reference to unknown activity"
                );
                warnings.push(GraphWarning::DanglingSuccessor {
                    activity: node.id.clone(),
                    missing: succ.activity_id.clone(),
                });
            }
        }
    }

    for successors in adjacency.values_mut() {
        successors.sort();
    }

    GraphRebuild {
        adjacency,
        warnings,
    }
}

/// Drop dangling predecessor edges and rebuild every successor list.
///
/// Operates on whatever schedule it is handed; the edit pipeline only
/// ever passes a working copy, never the committed aggregate.
pub fn resync(schedule: &mut ProjectSchedule) -> Vec<GraphWarning> {
    let GraphRebuild {
        adjacency,
        warnings,
    } = rebuild_successors(&schedule.nodes);

    let known: BTreeSet<ActivityId> = schedule.nodes.keys().cloned().collect();
    for node in schedule.nodes.values_mut() {
        node.predecessors
            .retain(|link| known.contains(&link.activity_id));
    }

    schedule.apply_adjacency(adjacency);
    warnings
}

/// Read-only precedence graph over a node set (edge direction: predecessor
/// -> successor). Dangling references are ignored.
#[derive(Debug, Clone)]
pub struct PrecedenceGraph<'a> {
    graph: DiGraphMap<&'a str, LinkType>,
    keys: BTreeSet<&'a str>,
}

impl<'a> PrecedenceGraph<'a> {
    pub fn from_nodes(nodes: &'a BTreeMap<ActivityId, ActivityNode>) -> Self {
        let mut graph: DiGraphMap<&'a str, LinkType> = DiGraphMap::new();
        let keys: BTreeSet<&'a str> = nodes.keys().map(|id| id.as_str()).collect();

        for id in &keys {
            graph.add_node(*id);
        }

        for node in nodes.values() {
            for link in &node.predecessors {
                if nodes.contains_key(&link.activity_id) {
                    graph.add_edge(link.activity_id.as_str(), node.id.as_str(), link.link_type);
                }
            }
        }

        Self { graph, keys }
    }

    pub(crate) fn inner(&self) -> &DiGraphMap<&'a str, LinkType> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The graph's own copy of `id`, if the node exists.
    pub fn key(&self, id: &str) -> Option<&'a str> {
        self.keys.get(id).copied()
    }

    /// Distinct direct successors of `id`.
    pub fn successors_of(&self, id: &str) -> Vec<&'a str> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Distinct direct predecessors of `id`.
    pub fn predecessors_of(&self, id: &str) -> Vec<&'a str> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: &str, dir: Direction) -> Vec<&'a str> {
        match self.keys.get(id) {
            Some(key) => self.graph.neighbors_directed(*key, dir).collect(),
            None => Vec::new(),
        }
    }

    /// Every node reachable from `root` by following successor edges,
    /// excluding `root` itself.
    pub fn reachable_from(&self, root: &str) -> BTreeSet<&'a str> {
        let mut seen: BTreeSet<&'a str> = BTreeSet::new();
        let mut stack: Vec<&'a str> = self.successors_of(root);

        while let Some(id) = stack.pop() {
            if id == root || !seen.insert(id) {
                continue;
            }
            stack.extend(self.successors_of(id));
        }

        seen
    }
}
