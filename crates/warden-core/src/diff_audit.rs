// crates/warden-core/src/diff_audit.rs
// ============================================================================
// Module: Diff-Audit Gate
// Description: Verifies an execution graph is a faithful, unmodified encoding
//              of the Ir it was compiled from (§4.E).
// Purpose: Catch a compiler that silently dropped, reordered, or mutated a
//          step between validation and execution.
// Dependencies: crate::core, crate::ir
// ============================================================================

//! ## Overview
//! The diff-audit gate is the last pure check before a graph may be executed.
//! It re-derives what the graph *should* contain directly from the
//! [`crate::ir::Ir`] (one [`DagNodeRef`] per step, in step order) and compares
//! it against what the compiled graph actually claims, node by node. Any
//! mismatch — a missing step, an extra node, a reordering, or a hash that no
//! longer matches the IR step it claims to encode — fails the audit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::hash_canonical_json;
use crate::core::ids::TenantId;
use crate::core::time::Timestamp;
use crate::core::value::ParamMap;
use crate::core::value::ParamValue;
use crate::events::Event;
use crate::events::EventMeta;
use crate::events::EventType;
use crate::ir::Ir;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A reference to one DAG node as claimed by a compiled execution graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNodeRef {
    /// Effective id of the IR step this node claims to encode.
    pub ir_step_id: String,
    /// Content hash of the IR step this node claims to encode.
    pub ir_step_hash: String,
}

/// A single mismatch found between the IR and the compiled graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffAuditMismatch {
    /// A step present in the IR has no corresponding graph node.
    MissingNode {
        /// Effective id of the missing step.
        ir_step_id: String,
    },
    /// A graph node does not correspond to any IR step.
    ExtraNode {
        /// Effective id claimed by the extra node.
        ir_step_id: String,
    },
    /// A graph node's claimed hash does not match the IR step's actual hash.
    HashMismatch {
        /// Effective id of the step.
        ir_step_id: String,
        /// Hash computed directly from the IR step.
        expected_hash: String,
        /// Hash claimed by the graph node.
        actual_hash: String,
    },
    /// The graph's node order does not match the IR's step order.
    OrderMismatch {
        /// Step ids in IR order.
        expected_order: Vec<String>,
        /// Step ids in graph order.
        actual_order: Vec<String>,
    },
}

/// Outcome of a diff-audit pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffAuditReport {
    /// True when the graph is a faithful encoding of the IR.
    pub is_faithful: bool,
    /// All mismatches found; empty iff `is_faithful`.
    pub mismatches: Vec<DiffAuditMismatch>,
    /// Canonical hash of the full IR, for audit linkage.
    pub ir_hash: String,
}

impl DiffAuditReport {
    /// Returns the audit `EventType` this report emits, per §4.E
    /// (`ir.dag_diff_ok|failed`).
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        if self.is_faithful { EventType::IrDagDiffOk } else { EventType::IrDagDiffFailed }
    }

    /// Builds the audit [`Event`] this report emits, carrying mismatch
    /// counts only — never raw IR params (§4.E: "counts only").
    #[must_use]
    pub fn to_event(&self, tenant_id: TenantId, now: Timestamp) -> Event {
        let meta = EventMeta { tenant_id, request_id: None, graph_id: None };
        let mut payload = ParamMap::new();
        payload.insert(
            "mismatch_count".to_string(),
            ParamValue::Integer(i64::try_from(self.mismatches.len()).unwrap_or(i64::MAX)),
        );
        Event::new(self.event_type(), meta, payload, now)
    }
}

// ============================================================================
// SECTION: Diff-Audit
// ============================================================================

/// Compares `graph_nodes` (claimed by a compiled execution graph, in graph
/// order) against the steps of `ir` (in IR order) and reports every mismatch.
///
/// # Errors
///
/// Returns [`CanonicalError`] only if the IR itself fails to canonicalize;
/// step-level and ordering problems are reported as [`DiffAuditMismatch`]
/// entries, not errors.
pub fn diff_audit(ir: &Ir, graph_nodes: &[DagNodeRef]) -> Result<DiffAuditReport, CanonicalError> {
    let ir_hash = hash_canonical_json(ir)?;
    let mut mismatches = Vec::new();

    let mut expected: Vec<DagNodeRef> = Vec::with_capacity(ir.steps.len());
    for (index, step) in ir.steps.iter().enumerate() {
        let ir_step_hash = hash_canonical_json(step)?;
        expected.push(DagNodeRef { ir_step_id: step.effective_id(index), ir_step_hash });
    }

    let expected_ids: std::collections::HashSet<&str> =
        expected.iter().map(|node| node.ir_step_id.as_str()).collect();
    let actual_ids: std::collections::HashSet<&str> =
        graph_nodes.iter().map(|node| node.ir_step_id.as_str()).collect();

    for node in &expected {
        if !actual_ids.contains(node.ir_step_id.as_str()) {
            mismatches.push(DiffAuditMismatch::MissingNode { ir_step_id: node.ir_step_id.clone() });
        }
    }
    for node in graph_nodes {
        if !expected_ids.contains(node.ir_step_id.as_str()) {
            mismatches.push(DiffAuditMismatch::ExtraNode { ir_step_id: node.ir_step_id.clone() });
        }
    }

    for expected_node in &expected {
        if let Some(actual_node) =
            graph_nodes.iter().find(|node| node.ir_step_id == expected_node.ir_step_id)
            && actual_node.ir_step_hash != expected_node.ir_step_hash
        {
            mismatches.push(DiffAuditMismatch::HashMismatch {
                ir_step_id: expected_node.ir_step_id.clone(),
                expected_hash: expected_node.ir_step_hash.clone(),
                actual_hash: actual_node.ir_step_hash.clone(),
            });
        }
    }

    if mismatches.is_empty() {
        let expected_order: Vec<String> = expected.iter().map(|node| node.ir_step_id.clone()).collect();
        let actual_order: Vec<String> = graph_nodes.iter().map(|node| node.ir_step_id.clone()).collect();
        if expected_order != actual_order {
            mismatches.push(DiffAuditMismatch::OrderMismatch { expected_order, actual_order });
        }
    }

    Ok(DiffAuditReport { is_faithful: mismatches.is_empty(), mismatches, ir_hash })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::core::ids::TenantId;
    use crate::core::value::ParamMap;
    use crate::ir::Action;
    use crate::ir::IrStep;
    use crate::ir::Provider;

    fn sample_ir(idempotency_keys: &[&str]) -> Ir {
        let steps = idempotency_keys
            .iter()
            .map(|key| IrStep {
                action: Action::DeployWebsite,
                provider: Provider::DeployProviderV1,
                resource: "site".to_string(),
                params: ParamMap::new(),
                idempotency_key: (*key).to_string(),
                constraints: None,
                budget_cents: None,
                step_id: None,
                description: None,
            })
            .collect();
        Ir { tenant_id: TenantId::parse("acme").unwrap(), steps, request_id: None, created_at: None, labels: ParamMap::new() }
    }

    fn nodes_for(ir: &Ir) -> Vec<DagNodeRef> {
        ir.steps
            .iter()
            .enumerate()
            .map(|(index, step)| DagNodeRef {
                ir_step_id: step.effective_id(index),
                ir_step_hash: hash_canonical_json(step).unwrap(),
            })
            .collect()
    }

    #[test]
    fn faithful_graph_passes() {
        let ir = sample_ir(&["a", "b"]);
        let nodes = nodes_for(&ir);
        let report = diff_audit(&ir, &nodes).unwrap();
        assert!(report.is_faithful);
        assert!(report.mismatches.is_empty());
    }

    #[test]
    fn missing_node_detected() {
        let ir = sample_ir(&["a", "b"]);
        let mut nodes = nodes_for(&ir);
        nodes.remove(1);
        let report = diff_audit(&ir, &nodes).unwrap();
        assert!(!report.is_faithful);
        assert!(report.mismatches.iter().any(|m| matches!(m, DiffAuditMismatch::MissingNode { .. })));
    }

    #[test]
    fn extra_node_detected() {
        let ir = sample_ir(&["a"]);
        let mut nodes = nodes_for(&ir);
        nodes.push(DagNodeRef { ir_step_id: "ghost".to_string(), ir_step_hash: "deadbeef".to_string() });
        let report = diff_audit(&ir, &nodes).unwrap();
        assert!(report.mismatches.iter().any(|m| matches!(m, DiffAuditMismatch::ExtraNode { .. })));
    }

    #[test]
    fn tampered_hash_detected() {
        let ir = sample_ir(&["a"]);
        let mut nodes = nodes_for(&ir);
        nodes[0].ir_step_hash = "tampered".to_string();
        let report = diff_audit(&ir, &nodes).unwrap();
        assert!(report.mismatches.iter().any(|m| matches!(m, DiffAuditMismatch::HashMismatch { .. })));
    }

    #[test]
    fn reordered_nodes_detected() {
        let ir = sample_ir(&["a", "b"]);
        let mut nodes = nodes_for(&ir);
        nodes.swap(0, 1);
        let report = diff_audit(&ir, &nodes).unwrap();
        assert!(report.mismatches.iter().any(|m| matches!(m, DiffAuditMismatch::OrderMismatch { .. })));
    }
}
