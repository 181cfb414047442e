// crates/warden-executor/src/node.rs
// ============================================================================
// Module: Node Abstraction
// Description: The `Node` trait, its execution context, and outcome/error
//              shapes (§4.H).
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! A [`Node`] never performs its own audit writes or policy decisions — it
//! returns a [`NodeOutcome`] (or a [`NodeError`]) and the executor records
//! everything else. [`ExecutionContext`] is the one channel nodes use to read
//! prior nodes' outputs and contribute artifacts, matching §3's "shared state
//! between nodes... append/overwrite by key; ordering matches execution
//! order."

use std::collections::BTreeMap;

use thiserror::Error;
use warden_core::BusinessIntentId;
use warden_core::GraphId;
use warden_core::ParamValue;

/// Per-run container threaded through every node call in execution order.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Graph this context belongs to.
    pub graph_id: GraphId,
    /// Business intent this graph fulfills, if tracked.
    pub business_intent_id: Option<BusinessIntentId>,
    /// True when nodes should run `dry_run` instead of `execute`.
    pub dry_run: bool,
    /// Shared key/value state contributed by prior nodes in this run.
    shared_state: BTreeMap<String, ParamValue>,
    /// Artifact references contributed by prior nodes in this run, in order.
    artifacts: Vec<String>,
}

impl ExecutionContext {
    /// Constructs an empty context for a fresh run.
    #[must_use]
    pub fn new(graph_id: GraphId, business_intent_id: Option<BusinessIntentId>, dry_run: bool) -> Self {
        Self { graph_id, business_intent_id, dry_run, shared_state: BTreeMap::new(), artifacts: Vec::new() }
    }

    /// Reads a value a prior node contributed, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.shared_state.get(key)
    }

    /// Inserts or overwrites a shared value, for a later node to read.
    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        self.shared_state.insert(key.into(), value);
    }

    /// Appends an artifact reference, preserving contribution order.
    pub fn add_artifact(&mut self, artifact: impl Into<String>) {
        self.artifacts.push(artifact.into());
    }

    /// Returns all artifacts contributed so far, in contribution order.
    #[must_use]
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }
}

/// What a node's `execute`/`dry_run` call produced on success.
#[derive(Debug, Clone, Default)]
pub struct NodeOutcome {
    /// Structured output keys this node is contributing to shared state.
    pub output: BTreeMap<String, ParamValue>,
    /// Artifact references this node is contributing.
    pub artifacts: Vec<String>,
}

/// Errors a [`Node`] call may raise. Per §4.H, any uncaught node-level error
/// is wrapped as a node failure by the executor, never propagated raw.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A precondition checked by `validate_before_execution` failed.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The node's live or dry-run execution failed.
    #[error("execution failed: {0}")]
    Execution(String),
    /// `rollback` was called on a node that did not declare `ROLLBACKABLE`.
    #[error("rollback not implemented for this node")]
    RollbackNotImplemented,
    /// The node exceeded its allotted execution time.
    #[error("node timed out")]
    Timeout,
}

/// One executable unit in a [`crate::graph::GraphSpec`].
///
/// Implementers must not perform their own audit writes or policy decisions;
/// they report structured outputs and artifacts through `ctx` and the
/// executor records the rest (§4.H).
pub trait Node: Send + Sync {
    /// Runs this node with real side effects.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] on any failure; implementations must not panic.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError>;

    /// Runs this node in a side-effect-free or simulated mode. Required
    /// whenever the node declares [`crate::graph::Capability::DryRun`].
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] on any failure.
    fn dry_run(&self, ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError>;

    /// Reverses a prior successful `execute` call. Required whenever the node
    /// declares [`crate::graph::Capability::Rollbackable`]; the default
    /// implementation returns [`NodeError::RollbackNotImplemented`].
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] on any failure, including when rollback is not
    /// implemented.
    fn rollback(&self, ctx: &mut ExecutionContext) -> Result<(), NodeError> {
        let _ = ctx;
        Err(NodeError::RollbackNotImplemented)
    }

    /// Checks this node's preconditions before any side effect runs. The
    /// default implementation has no preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Precondition`] when a precondition fails.
    fn validate_before_execution(&self, ctx: &ExecutionContext) -> Result<(), NodeError> {
        let _ = ctx;
        Ok(())
    }
}
