// crates/warden-executor/src/graph.rs
// ============================================================================
// Module: Graph Spec
// Description: The caller-supplied shape of an execution graph (§3, §4.G).
// Dependencies: serde, warden-core
// ============================================================================

//! ## Overview
//! A [`GraphSpec`] is the executor's sole input: an ordered bag of
//! [`DagNode`]s plus run-wide flags. Node order in `nodes` carries no
//! scheduling meaning by itself — [`crate::toposort::topological_order`]
//! derives the actual execution order from `depends_on`.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use warden_core::BusinessIntentId;
use warden_core::GraphId;
use warden_core::NodeId;
use warden_core::ParamMap;

/// One capability a node declares, drawn from the closed set in §4.H.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// The node implements `dry_run` and may be exercised without side effects.
    DryRun,
    /// The node implements `rollback`.
    Rollbackable,
    /// `execute` may be safely retried with the same inputs.
    Idempotent,
    /// The node makes at least one external call, consulted by the governor's
    /// `external_calls` budget dimension.
    External,
}

/// One node in an execution graph, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DagNode {
    /// Unique id of this node within the graph.
    pub node_id: NodeId,
    /// Stable string naming which registered factory instantiates this node.
    pub executor_class: String,
    /// Node ids that must complete before this node becomes eligible.
    #[serde(default)]
    pub depends_on: Vec<NodeId>,
    /// Capabilities this node declares.
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Parameters passed to the node factory and, in turn, to `execute`.
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub executor_params: ParamMap,
    /// When true, this node's failure always stops the run and forces
    /// rollback consideration, regardless of `stop_on_first_error`.
    #[serde(default)]
    pub critical: bool,
    /// Human-facing node type, consulted by governor policy
    /// (`required_approval_node_types`, `skip_on_soft_limit`).
    pub node_type: String,
    /// Effective id of the IR step this node claims to encode, set by the
    /// gateway's IR-to-DAG mapping (§4.K step 4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_step_id: Option<String>,
    /// Canonical hash of the IR step this node claims to encode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_step_hash: Option<String>,
}

/// The full shape of one execution graph run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSpec {
    /// Identifier of this execution graph run.
    pub graph_id: GraphId,
    /// Business intent this graph fulfills, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_intent_id: Option<BusinessIntentId>,
    /// Nodes in this graph, in no particular order.
    pub nodes: Vec<DagNode>,
    /// When true, every node runs via `dry_run` instead of `execute`.
    #[serde(default)]
    pub dry_run: bool,
    /// When true, an unsuccessful run triggers rollback of completed nodes.
    #[serde(default)]
    pub auto_rollback: bool,
    /// When true, the first node failure stops the run immediately.
    #[serde(default)]
    pub stop_on_first_error: bool,
}
