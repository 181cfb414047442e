// crates/warden-governor/src/policy.rs
// ============================================================================
// Module: Governor Policy
// Description: Static, per-run configuration consulted by ExecutionGovernor
//              (§4.F).
// Dependencies: std::collections, warden-core
// ============================================================================

//! ## Overview
//! A [`GovernorPolicy`] is constructed once per run (never shared across
//! graphs, per §9's "global state in governor" note) and never mutated
//! after construction; only the governor's counters and decision log change
//! as the run progresses.

use std::collections::HashSet;

use warden_core::NodeId;

use crate::budget::Budget;

/// Static per-run governor configuration.
#[derive(Debug, Clone)]
pub struct GovernorPolicy {
    /// The run's resource budget.
    pub budget: Budget,
    /// When `false` (the default), dry-run node checks skip budget/approval
    /// enforcement entirely (§4.F step 1).
    pub dry_run_respects_limits: bool,
    /// Whether soft-limit breaches may degrade (skip) eligible nodes.
    pub allow_soft_degradation: bool,
    /// Fraction of a soft limit (0.0-1.0) at which degradation triggers.
    pub soft_degradation_threshold: f64,
    /// Node ids that are never degraded or skipped, even under soft limits.
    pub critical_nodes: HashSet<NodeId>,
    /// Node type strings eligible to be skipped under soft-limit pressure.
    pub skip_on_soft_limit: HashSet<String>,
    /// Specific node ids that always require a governor-level approval.
    pub required_approval_nodes: HashSet<NodeId>,
    /// Node type strings that always require a governor-level approval.
    pub required_approval_node_types: HashSet<String>,
    /// TTL, in seconds, for a governor node-approval request (§4.F: 15 min).
    pub node_approval_ttl_s: i64,
}

impl GovernorPolicy {
    /// Default TTL for a governor node-approval request: 15 minutes.
    pub const DEFAULT_NODE_APPROVAL_TTL_S: i64 = 15 * 60;

    /// Returns a permissive policy: unbounded budget, no degradation, no
    /// node-level approval requirements. Suitable for dry runs and tests.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            budget: Budget::unbounded(),
            dry_run_respects_limits: false,
            allow_soft_degradation: false,
            soft_degradation_threshold: 0.8,
            critical_nodes: HashSet::new(),
            skip_on_soft_limit: HashSet::new(),
            required_approval_nodes: HashSet::new(),
            required_approval_node_types: HashSet::new(),
            node_approval_ttl_s: Self::DEFAULT_NODE_APPROVAL_TTL_S,
        }
    }

    /// Returns whether `node_id`/`node_type` is exempt from soft degradation
    /// because it is critical (§4.F step 3: "neither in critical_nodes nor
    /// node.critical").
    #[must_use]
    pub fn is_critical(&self, node_id: &NodeId, node_is_critical: bool) -> bool {
        node_is_critical || self.critical_nodes.contains(node_id)
    }

    /// Returns whether `node_id`/`node_type` requires a governor-level
    /// approval before it may execute.
    #[must_use]
    pub fn requires_node_approval(&self, node_id: &NodeId, node_type: &str) -> bool {
        self.required_approval_nodes.contains(node_id) || self.required_approval_node_types.contains(node_type)
    }

    /// Returns whether `node_type` is eligible to be skipped under
    /// soft-limit pressure.
    #[must_use]
    pub fn is_skippable_on_soft_limit(&self, node_type: &str) -> bool {
        self.skip_on_soft_limit.contains(node_type)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn permissive_policy_never_requires_approval() {
        let policy = GovernorPolicy::permissive();
        assert!(!policy.requires_node_approval(&NodeId::new("n1"), "echo"));
    }

    #[test]
    fn critical_flag_on_node_exempts_from_degradation() {
        let policy = GovernorPolicy::permissive();
        assert!(policy.is_critical(&NodeId::new("n1"), true));
        assert!(!policy.is_critical(&NodeId::new("n1"), false));
    }
}
