// crates/warden-executor/src/lib.rs
// ============================================================================
// Crate: warden-executor
// Description: Topological DAG executor, node abstraction, and reference
//              nodes (§4.G, §4.H).
// ============================================================================

//! # warden-executor
//!
//! Runs a [`graph::GraphSpec`] to a [`result::GraphResult`] by deriving a
//! topological order from `depends_on` (standard Kahn's algorithm, see
//! [`toposort`]'s design note on the corrected direction), consulting an
//! optional `warden-governor` [`warden_governor::ExecutionGovernor`] before
//! every node, and dispatching to nodes resolved from a [`registry::NodeRegistry`].
//!
//! - [`graph`] — `GraphSpec`, `DagNode`, `Capability`.
//! - [`node`] — the `Node` trait, `ExecutionContext`, `NodeOutcome`, `NodeError`.
//! - [`toposort`] — the corrected Kahn's-algorithm topological sort.
//! - [`result`] — `DagResult`, `GraphResult`, `NodeStatus`, `GraphStatus`.
//! - [`registry`] — `NodeRegistry`, mapping `executor_class` to node factories.
//! - [`nodes`] — `EchoNode`, `FailingNode`, the in-tree reference nodes.
//! - [`executor`] — `DagExecutor`, the run loop itself.
//! - [`error`] — `ExecutorError`, pre-execution structural failures.

pub mod error;
pub mod executor;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod result;
pub mod toposort;

pub use error::ExecutorError;
pub use executor::DagExecutor;
pub use executor::ExecutionOutcome;
pub use graph::Capability;
pub use graph::DagNode;
pub use graph::GraphSpec;
pub use node::ExecutionContext;
pub use node::Node;
pub use node::NodeError;
pub use node::NodeOutcome;
pub use nodes::EchoNode;
pub use nodes::FailingNode;
pub use registry::NodeFactory;
pub use registry::NodeRegistry;
pub use result::DagResult;
pub use result::GraphResult;
pub use result::GraphStatus;
pub use result::NodeStatus;
pub use toposort::TopoError;
pub use toposort::topological_order;
