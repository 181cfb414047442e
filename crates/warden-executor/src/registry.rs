// crates/warden-executor/src/registry.rs
// ============================================================================
// Module: Node Registry
// Description: Maps a `DagNode`'s `executor_class` to a boxed node factory
//              (§4.H).
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! Grounded in the teacher's `decision-gate-providers::registry::ProviderRegistry`
//! builder pattern (a `BTreeMap<String, Box<dyn Trait>>` keyed by a stable
//! string id): [`NodeRegistry`] maps a `DagNode::executor_class` to a factory
//! closure that builds the node for that call. Real provider-backed nodes
//! (DNS, ERP, LLM) register into the same registry from outside this crate,
//! per §1's "external collaborators" boundary; only [`crate::nodes::EchoNode`]
//! and [`crate::nodes::FailingNode`] ship here, for tests and local operation.

use std::collections::BTreeMap;

use crate::graph::DagNode;
use crate::node::Node;

/// A factory that builds a boxed [`Node`] from the [`DagNode`] spec that
/// names it.
pub type NodeFactory = Box<dyn Fn(&DagNode) -> Box<dyn Node> + Send + Sync>;

/// Registry of node factories keyed by `executor_class`.
#[derive(Default)]
pub struct NodeRegistry {
    /// Factories keyed by the `executor_class` they construct.
    factories: BTreeMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Returns an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Returns a registry with the in-tree reference nodes
    /// (`echo`, `failing`) registered.
    #[must_use]
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        registry.register("echo", |_| Box::new(crate::nodes::EchoNode));
        registry.register("failing", |_| Box::new(crate::nodes::FailingNode));
        registry
    }

    /// Registers `factory` under `executor_class`, replacing any prior
    /// registration for the same class.
    pub fn register(&mut self, executor_class: impl Into<String>, factory: impl Fn(&DagNode) -> Box<dyn Node> + Send + Sync + 'static) {
        self.factories.insert(executor_class.into(), Box::new(factory));
    }

    /// Instantiates the node named by `node.executor_class`, or `None` if no
    /// factory is registered under that class.
    #[must_use]
    pub fn instantiate(&self, node: &DagNode) -> Option<Box<dyn Node>> {
        self.factories.get(&node.executor_class).map(|factory| factory(node))
    }
}
