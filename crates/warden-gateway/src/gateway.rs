// crates/warden-gateway/src/gateway.rs
// ============================================================================
// Module: Gateway Orchestrator
// Description: Single entry point composing validator, ledger, diff-audit,
//              executor, and evidence into one governed run (§4.K).
// Dependencies: warden-approvals, warden-core, warden-evidence, warden-events,
//               warden-executor, warden-governor
// ============================================================================

//! ## Overview
//! [`GatewayOrchestrator::handle`] is the only place in this workspace that
//! calls every other component in one request. It follows §4.K exactly:
//!
//! 1. Accept `(tenant_id, graph_spec, ir?, approval_token?, execute)`.
//! 2. If IR governance is off for this call, skip straight to dry-run policy
//!    and execution.
//! 3. Validate the IR. `Reject` stops here; `Escalate` requires and consumes
//!    an approval token; `Pass` needs neither.
//! 4. Stamp the graph's nodes with the IR metadata the diff-audit gate needs.
//! 5. Run diff-audit; any mismatch stops here.
//! 6. Force `dry_run` when the caller asked for a dry run or this call's
//!    default is dry-run-only.
//! 7. Run the graph through a freshly built executor and (optional) governor.
//! 8. Build and persist the evidence pack, publish the run's audit events,
//!    and return the aggregate result.

use std::sync::Arc;

use warden_approvals::ApprovalLedger;
use warden_core::Clock;
use warden_core::Ir;
use warden_core::TenantId;
use warden_core::validate;
use warden_core::validator::ValidationStatus;
use warden_events::Envelope;
use warden_events::EventBroker;
use warden_evidence::EvidencePack;
use warden_evidence::EvidenceSink;
use warden_evidence::IrSummary;
use warden_evidence::build_pack;
use warden_executor::DagExecutor;
use warden_executor::GraphSpec;
use warden_executor::NodeRegistry;
use warden_governor::ExecutionGovernor;
use warden_governor::GovernorPolicy;

use crate::error::GatewayError;
use crate::error::GatewayResult;
use crate::mapping::attach_ir_metadata;
use crate::mapping::claimed_nodes;

/// Whether IR governance (validation, approval, diff-audit) applies to a
/// call, or whether the gateway is used purely to run an already-trusted
/// graph (§4.K step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrGovernanceMode {
    /// Skip validation/approval/diff-audit; run the graph as given.
    Off,
    /// Run the full §4.C-§4.E pipeline before executing.
    On,
}

/// One governed-execution request.
pub struct ExecuteRequest {
    /// Tenant this request executes on behalf of.
    pub tenant_id: TenantId,
    /// The graph to run, before any IR metadata is attached.
    pub graph_spec: GraphSpec,
    /// The IR that produced `graph_spec`, required when the gateway's mode
    /// is [`IrGovernanceMode::On`].
    pub ir: Option<Ir>,
    /// Raw approval token, required only when validation escalates.
    pub approval_token: Option<String>,
    /// Free-form identity of whoever is consuming an approval token, if any.
    pub actor: Option<String>,
    /// `false` forces a dry run regardless of `graph_spec.dry_run`.
    pub execute: bool,
}

/// Aggregate result of one [`GatewayOrchestrator::handle`] call.
pub struct ExecuteResponse {
    /// Disposition snapshot for this call.
    pub gateway_result: GatewayResult,
    /// The evidence pack the run produced.
    pub evidence_pack: EvidencePack,
}

/// Composes the governance kernel's components into one request flow.
pub struct GatewayOrchestrator {
    /// Whether IR governance (validate/approve/diff-audit) runs at all.
    mode: IrGovernanceMode,
    /// Shared ledger consulted when a call escalates.
    approval_ledger: Arc<ApprovalLedger>,
    /// Sink every evidence pack is persisted to.
    evidence_sink: Arc<dyn EvidenceSink>,
    /// Optional broker every audit event is published to.
    event_broker: Option<Arc<dyn EventBroker>>,
    /// Template cloned into a fresh governor for every call, if set.
    governor_policy: Option<GovernorPolicy>,
    /// Clock used for every timestamp this orchestrator produces.
    clock: Arc<dyn Clock>,
    /// Forces dry-run regardless of the incoming graph spec's own setting.
    force_dry_run: bool,
}

impl GatewayOrchestrator {
    /// Constructs an orchestrator over its component dependencies.
    ///
    /// `governor_policy` is cloned into a fresh [`ExecutionGovernor`] for
    /// every call (§4.F: never shared across graphs). `event_broker`, when
    /// present, receives every audit event the run produced; a publish
    /// failure is logged by the broker itself and never surfaces here
    /// (§4.I).
    #[must_use]
    pub fn new(
        mode: IrGovernanceMode,
        approval_ledger: Arc<ApprovalLedger>,
        evidence_sink: Arc<dyn EvidenceSink>,
        event_broker: Option<Arc<dyn EventBroker>>,
        governor_policy: Option<GovernorPolicy>,
        clock: Arc<dyn Clock>,
        force_dry_run: bool,
    ) -> Self {
        Self { mode, approval_ledger, evidence_sink, event_broker, governor_policy, clock, force_dry_run }
    }

    /// Runs the full §4.K flow for one request.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] at the first step that rejects the
    /// request, or on a backend failure from the ledger, executor, or
    /// evidence sink.
    pub fn handle(&self, request: ExecuteRequest) -> Result<ExecuteResponse, GatewayError> {
        let ExecuteRequest { tenant_id, mut graph_spec, ir, approval_token, actor, execute } = request;

        let ir_summary = match self.mode {
            IrGovernanceMode::Off => None,
            IrGovernanceMode::On => {
                let Some(ir) = ir else {
                    tracing::warn!(tenant_id = %tenant_id, "ir governance on but no ir supplied");
                    return Err(GatewayError::MissingIr(GatewayResult { allowed: false, ..GatewayResult::default() }));
                };
                let summary = self.run_governance(&tenant_id, &ir, approval_token.as_deref(), actor)?;
                graph_spec = attach_ir_metadata(&ir, graph_spec)?;
                self.run_diff_audit(&ir, &graph_spec, &summary)?;
                Some(summary)
            }
        };

        graph_spec.dry_run = graph_spec.dry_run || !execute || self.force_dry_run;

        let governor = self.governor_policy.clone().map(|policy| Arc::new(ExecutionGovernor::new(policy, Arc::clone(&self.clock))));
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), governor, Arc::clone(&self.clock), tenant_id);
        let outcome = executor.run(&graph_spec)?;

        if let Some(broker) = &self.event_broker {
            for event in outcome.events.clone() {
                broker.publish(Envelope::new(event, "warden-gateway", "warden-gateway", "gateway"));
            }
        }

        let pack = build_pack(&graph_spec, &outcome.result, outcome.events, ir_summary.clone())?;
        let reference = self.evidence_sink.write(&pack)?;
        tracing::info!(graph_id = %pack.graph_spec.graph_id, pack_id = %pack.pack_id, reference = %reference, status = ?pack.execution_result.status, "governed run completed");

        Ok(ExecuteResponse {
            gateway_result: GatewayResult {
                allowed: true,
                ir_hash: ir_summary.as_ref().map(|summary| summary.ir_hash.clone()),
                validation_status: ir_summary.as_ref().map(|summary| summary.validation_status),
                approval_status: None,
                diff_audit_mismatches: ir_summary.as_ref().map(|_| 0),
            },
            evidence_pack: pack,
        })
    }

    /// Runs §4.K steps 3: validate, then require+consume an approval token
    /// when the IR escalated.
    fn run_governance(
        &self,
        tenant_id: &TenantId,
        ir: &Ir,
        approval_token: Option<&str>,
        actor: Option<String>,
    ) -> Result<IrSummary, GatewayError> {
        let now = self.clock.now();
        let validation = validate(ir, now);

        if validation.status == ValidationStatus::Reject {
            tracing::warn!(tenant_id = %tenant_id, ir_hash = %validation.ir_hash, "ir validation rejected request");
            return Err(GatewayError::ValidationRejected(GatewayResult {
                allowed: false,
                ir_hash: Some(validation.ir_hash),
                validation_status: Some(validation.status),
                ..GatewayResult::default()
            }));
        }

        if validation.status != ValidationStatus::Escalate {
            return Ok(IrSummary { ir_hash: validation.ir_hash, validation_status: validation.status, approval_id: None });
        }

        let Some(token) = approval_token else {
            tracing::warn!(tenant_id = %tenant_id, ir_hash = %validation.ir_hash, "ir escalated but no approval token supplied");
            return Err(GatewayError::ApprovalRequired(GatewayResult {
                allowed: false,
                ir_hash: Some(validation.ir_hash),
                validation_status: Some(validation.status),
                ..GatewayResult::default()
            }));
        };

        let (consume_result, _event) = self.approval_ledger.consume(tenant_id, &validation.ir_hash, token, actor)?;
        if !consume_result.success {
            tracing::warn!(tenant_id = %tenant_id, ir_hash = %validation.ir_hash, status = ?consume_result.status, "approval token rejected");
            return Err(GatewayError::ApprovalInvalid(GatewayResult {
                allowed: false,
                ir_hash: Some(validation.ir_hash),
                validation_status: Some(validation.status),
                approval_status: Some(consume_result.status),
                ..GatewayResult::default()
            }));
        }

        Ok(IrSummary {
            ir_hash: validation.ir_hash,
            validation_status: validation.status,
            approval_id: consume_result.approval_id,
        })
    }

    /// Runs §4.K step 5: diff-audit the graph against the IR it claims to
    /// encode.
    fn run_diff_audit(&self, ir: &Ir, graph_spec: &GraphSpec, summary: &IrSummary) -> Result<(), GatewayError> {
        let claimed = claimed_nodes(graph_spec);
        let report = warden_core::diff_audit::diff_audit(ir, &claimed)?;
        if !report.is_faithful {
            tracing::warn!(ir_hash = %summary.ir_hash, mismatches = report.mismatches.len(), "diff-audit found the graph does not match its ir");
            return Err(GatewayError::DiffAuditFailed(GatewayResult {
                allowed: false,
                ir_hash: Some(summary.ir_hash.clone()),
                validation_status: Some(summary.validation_status),
                diff_audit_mismatches: Some(report.mismatches.len()),
                ..GatewayResult::default()
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::BTreeSet;

    use time::OffsetDateTime;
    use warden_approvals::InMemoryApprovalStore;
    use warden_core::FixedClock;
    use warden_core::GraphId;
    use warden_core::NodeId;
    use warden_core::ParamMap;
    use warden_core::Timestamp;
    use warden_core::ir::Action;
    use warden_core::ir::IrStep;
    use warden_core::ir::Provider;
    use warden_evidence::InMemorySink;
    use warden_executor::DagNode;

    use super::*;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Timestamp::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap())))
    }

    fn orchestrator(mode: IrGovernanceMode) -> GatewayOrchestrator {
        let ledger = Arc::new(ApprovalLedger::new(Arc::new(InMemoryApprovalStore::new()), clock()));
        GatewayOrchestrator::new(mode, ledger, Arc::new(InMemorySink::new()), None, None, clock(), false)
    }

    fn low_risk_ir() -> Ir {
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
        Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        }
    }

    fn graph_for(ir: &Ir) -> GraphSpec {
        GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: ir
                .steps
                .iter()
                .enumerate()
                .map(|(index, step)| DagNode {
                    node_id: NodeId::new(step.effective_id(index)),
                    executor_class: "echo".to_string(),
                    depends_on: Vec::new(),
                    capabilities: BTreeSet::new(),
                    executor_params: ParamMap::new(),
                    critical: false,
                    node_type: "echo".to_string(),
                    ir_step_id: None,
                    ir_step_hash: None,
                })
                .collect(),
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        }
    }

    #[test]
    fn governance_off_skips_ir_entirely() {
        let gateway = orchestrator(IrGovernanceMode::Off);
        let ir = low_risk_ir();
        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec: graph_for(&ir),
            ir: None,
            approval_token: None,
            actor: None,
            execute: true,
        };
        let response = gateway.handle(request).unwrap();
        assert!(response.gateway_result.allowed);
        assert!(response.gateway_result.ir_hash.is_none());
    }

    #[test]
    fn low_risk_ir_passes_without_approval() {
        let gateway = orchestrator(IrGovernanceMode::On);
        let ir = low_risk_ir();
        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec: graph_for(&ir),
            ir: Some(ir),
            approval_token: None,
            actor: None,
            execute: true,
        };
        let response = gateway.handle(request).unwrap();
        assert!(response.gateway_result.allowed);
        assert_eq!(response.gateway_result.validation_status, Some(ValidationStatus::Pass));
    }

    #[test]
    fn critical_ir_without_token_requires_approval() {
        let gateway = orchestrator(IrGovernanceMode::On);
        let mut ir = low_risk_ir();
        ir.steps[0].action = Action::InfraDestroy;
        ir.steps[0].provider = Provider::InfraTerraform;
        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec: graph_for(&ir),
            ir: Some(ir),
            approval_token: None,
            actor: None,
            execute: true,
        };
        let err = gateway.handle(request).unwrap_err();
        assert!(matches!(err, GatewayError::ApprovalRequired(_)));
    }

    #[test]
    fn escalated_ir_with_valid_token_executes() {
        let gateway = orchestrator(IrGovernanceMode::On);
        let mut ir = low_risk_ir();
        ir.steps[0].action = Action::InfraDestroy;
        ir.steps[0].provider = Provider::InfraTerraform;
        let validation = validate(&ir, clock().now());
        let (_approval, raw_token, _event) =
            gateway.approval_ledger.create(ir.tenant_id.clone(), validation.ir_hash.clone(), 3600, None).unwrap();

        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec: graph_for(&ir),
            ir: Some(ir),
            approval_token: Some(raw_token),
            actor: Some("reviewer-1".to_string()),
            execute: true,
        };
        let response = gateway.handle(request).unwrap();
        assert!(response.gateway_result.allowed);
        assert!(response.evidence_pack.ir_summary.is_some());
    }

    #[test]
    fn tampered_graph_fails_diff_audit() {
        let gateway = orchestrator(IrGovernanceMode::On);
        let ir = low_risk_ir();
        let mut graph_spec = graph_for(&ir);
        graph_spec.nodes[0].node_id = NodeId::new("not-a-step");
        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec,
            ir: Some(ir),
            approval_token: None,
            actor: None,
            execute: true,
        };
        let err = gateway.handle(request).unwrap_err();
        assert!(matches!(err, GatewayError::DiffAuditFailed(_)));
    }

    #[test]
    fn execute_false_forces_dry_run() {
        let gateway = orchestrator(IrGovernanceMode::Off);
        let ir = low_risk_ir();
        let request = ExecuteRequest {
            tenant_id: ir.tenant_id.clone(),
            graph_spec: graph_for(&ir),
            ir: None,
            approval_token: None,
            actor: None,
            execute: false,
        };
        let response = gateway.handle(request).unwrap();
        assert!(response.evidence_pack.graph_spec.dry_run);
    }
}
