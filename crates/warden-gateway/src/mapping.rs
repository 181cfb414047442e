// crates/warden-gateway/src/mapping.rs
// ============================================================================
// Module: IR-to-Graph Mapping
// Description: Attaches ir_step_id/ir_step_hash to a compiled graph's nodes
//              ahead of the diff-audit gate (§4.K step 4).
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! The gateway never compiles IR into a graph itself (that is a caller/planner
//! concern, out of scope here per §1); it only stamps a caller-supplied
//! [`GraphSpec`] with the IR metadata the diff-audit gate needs to compare
//! against, matching each node to its originating step by `node_id ==
//! effective step id`. A node whose id does not match any step is left
//! unstamped and surfaces as a diff-audit `ExtraNode` mismatch rather than
//! being silently dropped here.

use std::collections::HashMap;

use warden_core::Ir;
use warden_core::core::canonical::CanonicalError;
use warden_core::core::canonical::hash_canonical_json;
use warden_core::diff_audit::DagNodeRef;
use warden_executor::GraphSpec;

/// Stamps every node in `graph_spec` whose id matches an IR step's effective
/// id with that step's `ir_step_id`/`ir_step_hash`.
///
/// # Errors
///
/// Returns [`CanonicalError`] if a step fails to canonicalize.
pub fn attach_ir_metadata(ir: &Ir, mut graph_spec: GraphSpec) -> Result<GraphSpec, CanonicalError> {
    let mut step_hashes: HashMap<String, String> = HashMap::with_capacity(ir.steps.len());
    for (index, step) in ir.steps.iter().enumerate() {
        step_hashes.insert(step.effective_id(index), hash_canonical_json(step)?);
    }

    for node in &mut graph_spec.nodes {
        if let Some(hash) = step_hashes.get(node.node_id.as_str()) {
            node.ir_step_id = Some(node.node_id.as_str().to_string());
            node.ir_step_hash = Some(hash.clone());
        }
    }

    Ok(graph_spec)
}

/// Collects the [`DagNodeRef`]s a compiled graph claims, in graph order, for
/// the diff-audit gate. Nodes left unstamped by [`attach_ir_metadata`] (no
/// matching step) are omitted here and show up as `MissingNode` on the IR
/// side of the audit instead.
#[must_use]
pub fn claimed_nodes(graph_spec: &GraphSpec) -> Vec<DagNodeRef> {
    graph_spec
        .nodes
        .iter()
        .filter_map(|node| {
            let ir_step_id = node.ir_step_id.clone()?;
            let ir_step_hash = node.ir_step_hash.clone()?;
            Some(DagNodeRef { ir_step_id, ir_step_hash })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::BTreeSet;

    use warden_core::GraphId;
    use warden_core::NodeId;
    use warden_core::ParamMap;
    use warden_core::TenantId;
    use warden_core::ir::Action;
    use warden_core::ir::IrStep;
    use warden_core::ir::Provider;
    use warden_executor::DagNode;

    use super::*;

    fn sample_ir() -> Ir {
        let step = IrStep {
            action: Action::DeployWebsite,
            provider: Provider::DeployProviderV1,
            resource: "site-1".to_string(),
            params: ParamMap::new(),
            idempotency_key: "dep-1".to_string(),
            constraints: None,
            budget_cents: None,
            step_id: Some("step-a".to_string()),
            description: None,
        };
        Ir { tenant_id: TenantId::parse("acme").unwrap(), steps: vec![step], request_id: None, created_at: None, labels: ParamMap::new() }
    }

    fn sample_graph() -> GraphSpec {
        GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![DagNode {
                node_id: NodeId::new("step-a"),
                executor_class: "echo".to_string(),
                depends_on: Vec::new(),
                capabilities: BTreeSet::new(),
                executor_params: ParamMap::new(),
                critical: false,
                node_type: "echo".to_string(),
                ir_step_id: None,
                ir_step_hash: None,
            }],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        }
    }

    #[test]
    fn matching_node_id_gets_stamped() {
        let graph = attach_ir_metadata(&sample_ir(), sample_graph()).unwrap();
        assert_eq!(graph.nodes[0].ir_step_id.as_deref(), Some("step-a"));
        assert!(graph.nodes[0].ir_step_hash.is_some());
    }

    #[test]
    fn claimed_nodes_matches_stamped_nodes_only() {
        let mut graph = sample_graph();
        graph.nodes.push(DagNode {
            node_id: NodeId::new("unmatched"),
            executor_class: "echo".to_string(),
            depends_on: Vec::new(),
            capabilities: BTreeSet::new(),
            executor_params: ParamMap::new(),
            critical: false,
            node_type: "echo".to_string(),
            ir_step_id: None,
            ir_step_hash: None,
        });
        let graph = attach_ir_metadata(&sample_ir(), graph).unwrap();
        let refs = claimed_nodes(&graph);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].ir_step_id, "step-a");
    }

    #[test]
    fn stamped_hash_matches_diff_audit_expectation() {
        let ir = sample_ir();
        let graph = attach_ir_metadata(&ir, sample_graph()).unwrap();
        let refs = claimed_nodes(&graph);
        let report = warden_core::diff_audit::diff_audit(&ir, &refs).unwrap();
        assert!(report.is_faithful);
    }
}
