// crates/warden-executor/src/nodes.rs
// ============================================================================
// Module: Reference Node Implementations
// Description: In-tree nodes used for tests and local operation (§4.H).
// Dependencies: crate::node
// ============================================================================

//! ## Overview
//! Two reference nodes ship in-tree: [`EchoNode`], a no-op that always
//! succeeds and exercises the `DRY_RUN`/`ROLLBACKABLE`/`IDEMPOTENT` path, and
//! [`FailingNode`], a test double that always fails, used to exercise
//! stop-on-first-error and rollback semantics.

use crate::node::ExecutionContext;
use crate::node::Node;
use crate::node::NodeError;
use crate::node::NodeOutcome;

/// A no-op node that always succeeds. Declares `DRY_RUN`, `ROLLBACKABLE`, and
/// `IDEMPOTENT` in its [`crate::graph::DagNode::capabilities`].
pub struct EchoNode;

impl Node for EchoNode {
    fn execute(&self, _ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::default())
    }

    fn dry_run(&self, _ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::default())
    }

    fn rollback(&self, _ctx: &mut ExecutionContext) -> Result<(), NodeError> {
        Ok(())
    }
}

/// A node that always fails, for exercising rollback and
/// stop-on-first-error semantics in tests.
pub struct FailingNode;

impl Node for FailingNode {
    fn execute(&self, _ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError> {
        Err(NodeError::Execution("failing node always fails".to_string()))
    }

    fn dry_run(&self, _ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeError> {
        Err(NodeError::Execution("failing node always fails".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use warden_core::GraphId;

    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(GraphId::new("g1"), None, false)
    }

    #[test]
    fn echo_node_always_succeeds() {
        assert!(EchoNode.execute(&mut ctx()).is_ok());
        assert!(EchoNode.dry_run(&mut ctx()).is_ok());
        assert!(EchoNode.rollback(&mut ctx()).is_ok());
    }

    #[test]
    fn failing_node_always_fails() {
        assert!(FailingNode.execute(&mut ctx()).is_err());
        assert!(FailingNode.dry_run(&mut ctx()).is_err());
    }

    #[test]
    fn failing_node_rollback_not_implemented() {
        assert!(matches!(FailingNode.rollback(&mut ctx()), Err(NodeError::RollbackNotImplemented)));
    }
}
