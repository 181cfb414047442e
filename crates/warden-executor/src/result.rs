// crates/warden-executor/src/result.rs
// ============================================================================
// Module: Execution Results
// Description: Per-node and per-run outcome shapes (§3, §4.G).
// Dependencies: serde, warden-core
// ============================================================================

//! ## Overview
//! [`DagResult`] is recorded once per node, in execution order; [`GraphResult`]
//! aggregates the run. Both are pure data — the executor is the only writer.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use warden_core::GraphId;
use warden_core::NodeId;
use warden_core::ParamValue;
use warden_core::Timestamp;

/// Lifecycle status of one node's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet reached in topological order.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Started but did not run to either success or failure (reserved for
    /// future partial-node semantics; the in-tree executor never emits this
    /// for a node, only the run-level `GraphStatus::Partial`).
    Partial,
    /// Skipped by a governor `Degrade` decision.
    Skipped,
}

/// Result of one node's execution within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagResult {
    /// Node this result belongs to.
    pub node_id: NodeId,
    /// Final status.
    pub status: NodeStatus,
    /// When the node began, if it started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the node finished, if it finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Wall-clock seconds spent on this node.
    pub duration_s: u64,
    /// Whether the node succeeded.
    pub success: bool,
    /// Structured output the node contributed.
    #[serde(default)]
    pub output: BTreeMap<String, ParamValue>,
    /// Artifact references the node contributed.
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Human-readable error, present iff `!success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether this node was successfully rolled back after the run failed.
    #[serde(default)]
    pub rollback_available: bool,
}

/// Final disposition of an execution graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStatus {
    /// Every node completed.
    Completed,
    /// No node completed, or a critical node failed.
    Failed,
    /// Some nodes completed, some did not.
    Partial,
}

/// Aggregate result of one execution graph run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
    /// Graph this result belongs to.
    pub graph_id: GraphId,
    /// Final status.
    pub status: GraphStatus,
    /// Per-node results, in execution order.
    pub node_results: Vec<DagResult>,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    pub completed_at: Timestamp,
    /// Total wall-clock seconds spent on the run.
    pub duration_s: u64,
}
