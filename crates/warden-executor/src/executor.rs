// crates/warden-executor/src/executor.rs
// ============================================================================
// Module: DAG Executor
// Description: Runs a `GraphSpec` to a `GraphResult` through a topological
//              pass, consulting an optional governor at every node (§4.G).
// Dependencies: warden-core, warden-governor
// ============================================================================

//! ## Overview
//! [`DagExecutor::run`] implements §4.G's execution loop: validate structure,
//! derive a topological order, and for each node consult the governor (if
//! any), instantiate it from the [`crate::registry::NodeRegistry`], run it,
//! and record the result. An unsuccessful run with `auto_rollback` set walks
//! completed, rollback-capable nodes in reverse completion order.

use std::sync::Arc;

use warden_core::Clock;
use warden_core::Event;
use warden_core::EventMeta;
use warden_core::EventType;
use warden_core::NodeId;
use warden_core::ParamMap;
use warden_core::ParamValue;
use warden_core::TenantId;
use warden_core::Timestamp;
use warden_governor::Decision;
use warden_governor::ExecutionGovernor;

use crate::error::ExecutorError;
use crate::graph::Capability;
use crate::graph::GraphSpec;
use crate::node::ExecutionContext;
use crate::node::NodeError;
use crate::registry::NodeRegistry;
use crate::result::DagResult;
use crate::result::GraphResult;
use crate::result::GraphStatus;
use crate::result::NodeStatus;

/// Runs execution graphs against a [`NodeRegistry`], consulting an optional
/// [`ExecutionGovernor`] before every node.
pub struct DagExecutor {
    /// Maps `executor_class` strings to node factories.
    registry: NodeRegistry,
    /// Optional per-run budget/approval enforcement.
    governor: Option<Arc<ExecutionGovernor>>,
    /// Clock used for every timestamp this run produces.
    clock: Arc<dyn Clock>,
    /// Tenant stamped on every emitted audit event.
    tenant_id: TenantId,
}

/// A completed run's result plus the audit events it produced, kept separate
/// from [`GraphResult`] so storage/serialization of the result never forces
/// the event envelope along with it.
pub struct ExecutionOutcome {
    /// The aggregate run result.
    pub result: GraphResult,
    /// Audit events emitted during the run, in emission order.
    pub events: Vec<Event>,
}

impl DagExecutor {
    /// Constructs an executor over `registry`, optionally gated by
    /// `governor`, using `clock` for timestamps and `tenant_id` for emitted
    /// events.
    #[must_use]
    pub fn new(registry: NodeRegistry, governor: Option<Arc<ExecutionGovernor>>, clock: Arc<dyn Clock>, tenant_id: TenantId) -> Self {
        Self { registry, governor, clock, tenant_id }
    }

    /// Runs `spec` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] if the graph's dependency structure cannot
    /// be ordered (unknown dependency id or a cycle). Individual node
    /// failures never surface as an `Err`; they are recorded as failed
    /// [`DagResult`] entries instead.
    #[allow(
        clippy::expect_used,
        clippy::panic_in_result_fn,
        reason = "topological_order is built from spec.nodes, so every id it yields is present in spec.nodes"
    )]
    pub fn run(&self, spec: &GraphSpec) -> Result<ExecutionOutcome, ExecutorError> {
        let order = crate::toposort::topological_order(&spec.nodes)?;
        if let Some(governor) = &self.governor {
            governor.start();
        }

        let started_at = self.clock.now();
        let mut events = Vec::new();
        events.push(self.event(EventType::ExecutionGraphStarted, started_at, ParamMap::new()));

        let mut ctx = ExecutionContext::new(spec.graph_id.clone(), spec.business_intent_id.clone(), spec.dry_run);
        let mut results: Vec<DagResult> = Vec::with_capacity(order.len());
        let mut run_broken = false;

        for node_id in &order {
            let node_spec = spec.nodes.iter().find(|node| &node.node_id == node_id).expect("order only contains known nodes");

            if let Some(governor) = &self.governor {
                let decision = governor.check_node_execution(node_id, &node_spec.node_type, node_spec.critical, spec.dry_run);
                match decision {
                    Decision::Degrade { reason } => {
                        results.push(skipped_result(node_id));
                        events.push(self.event(
                            EventType::ExecutionGraphNodeDegraded,
                            self.clock.now(),
                            reason_payload(node_id, &reason),
                        ));
                        continue;
                    }
                    Decision::Deny { reason, .. } | Decision::RequireApproval { message: reason } => {
                        results.push(failed_result(node_id, self.clock.now(), &reason));
                        events.push(self.event(
                            EventType::ExecutionGraphNodeFailed,
                            self.clock.now(),
                            reason_payload(node_id, &reason),
                        ));
                        run_broken = true;
                        break;
                    }
                    Decision::Allow => {}
                }
            }

            let node_started_at = self.clock.now();
            let Some(node) = self.registry.instantiate(node_spec) else {
                let reason = format!("no factory registered for executor_class {}", node_spec.executor_class);
                results.push(failed_result(node_id, node_started_at, &reason));
                events.push(self.event(EventType::TaskFailed, self.clock.now(), reason_payload(node_id, &reason)));
                if spec.stop_on_first_error || node_spec.critical {
                    run_broken = true;
                    break;
                }
                continue;
            };

            let outcome = node
                .validate_before_execution(&ctx)
                .and_then(|()| if spec.dry_run { node.dry_run(&mut ctx) } else { node.execute(&mut ctx) });

            let node_completed_at = self.clock.now();
            let duration_s = elapsed_seconds(node_started_at, node_completed_at);

            match outcome {
                Ok(outcome) => {
                    for (key, value) in &outcome.output {
                        ctx.set(key.clone(), value.clone());
                    }
                    for artifact in &outcome.artifacts {
                        ctx.add_artifact(artifact.clone());
                    }
                    results.push(DagResult {
                        node_id: node_id.clone(),
                        status: NodeStatus::Completed,
                        started_at: Some(node_started_at),
                        completed_at: Some(node_completed_at),
                        duration_s,
                        success: true,
                        output: outcome.output,
                        artifacts: outcome.artifacts,
                        error: None,
                        rollback_available: node_spec.capabilities.contains(&Capability::Rollbackable),
                    });
                    if let Some(governor) = &self.governor {
                        let external_calls: u64 = if node_spec.capabilities.contains(&Capability::External) { 1 } else { 0 };
                        governor.record_node_execution(duration_s, external_calls);
                    }
                    events.push(self.event(EventType::TaskCompleted, node_completed_at, ParamMap::new()));
                }
                Err(err) => {
                    let reason = node_error_message(&err);
                    results.push(DagResult {
                        node_id: node_id.clone(),
                        status: NodeStatus::Failed,
                        started_at: Some(node_started_at),
                        completed_at: Some(node_completed_at),
                        duration_s,
                        success: false,
                        output: ParamMap::new(),
                        artifacts: Vec::new(),
                        error: Some(reason.clone()),
                        rollback_available: false,
                    });
                    events.push(self.event(EventType::TaskFailed, node_completed_at, reason_payload(node_id, &reason)));
                    if spec.stop_on_first_error || node_spec.critical {
                        run_broken = true;
                        break;
                    }
                }
            }
        }

        if (run_broken || results.iter().any(|result| result.status == NodeStatus::Failed)) && spec.auto_rollback {
            self.rollback(spec, &mut ctx, &mut results, &mut events);
        }

        let completed_at = self.clock.now();
        let status = final_status(&results, spec);
        let result = GraphResult {
            graph_id: spec.graph_id.clone(),
            status,
            node_results: results,
            started_at,
            completed_at,
            duration_s: elapsed_seconds(started_at, completed_at),
        };
        events.push(self.event(EventType::ExecutionGraphCompleted, completed_at, ParamMap::new()));

        Ok(ExecutionOutcome { result, events })
    }

    /// Rolls back completed, rollback-capable nodes in reverse completion
    /// order (§4.G step 3). Rollback failures are recorded but never stop
    /// further rollbacks.
    fn rollback(&self, spec: &GraphSpec, ctx: &mut ExecutionContext, results: &mut [DagResult], events: &mut Vec<Event>) {
        events.push(self.event(EventType::ExecutionGraphRollbackStarted, self.clock.now(), ParamMap::new()));

        let rollback_candidates: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, result)| result.status == NodeStatus::Completed)
            .map(|(index, _)| index)
            .rev()
            .collect();

        for index in rollback_candidates {
            let node_id = results[index].node_id.clone();
            let Some(node_spec) = spec.nodes.iter().find(|node| node.node_id == node_id) else { continue };
            if !node_spec.capabilities.contains(&Capability::Rollbackable) {
                continue;
            }
            let Some(node) = self.registry.instantiate(node_spec) else { continue };
            match node.rollback(ctx) {
                Ok(()) => {
                    results[index].rollback_available = true;
                    events.push(self.event(EventType::TaskRolledBack, self.clock.now(), ParamMap::new()));
                }
                Err(err) => {
                    events.push(self.event(
                        EventType::TaskFailed,
                        self.clock.now(),
                        reason_payload(&node_id, &node_error_message(&err)),
                    ));
                }
            }
        }

        events.push(self.event(EventType::ExecutionGraphRollbackCompleted, self.clock.now(), ParamMap::new()));
    }

    /// Builds an audit [`Event`] stamped with this executor's tenant.
    fn event(&self, event_type: EventType, now: Timestamp, payload: ParamMap) -> Event {
        let meta = EventMeta { tenant_id: self.tenant_id.clone(), request_id: None, graph_id: None };
        Event::new(event_type, meta, payload, now)
    }
}

/// Builds a small event payload carrying the affected node id and a reason
/// string, used for degrade/deny/failure events.
fn reason_payload(node_id: &NodeId, reason: &str) -> ParamMap {
    let mut payload = ParamMap::new();
    payload.insert("node_id".to_string(), ParamValue::String(node_id.as_str().to_string()));
    payload.insert("reason".to_string(), ParamValue::String(reason.to_string()));
    payload
}

/// Builds the `DagResult` recorded for a node the governor degraded.
fn skipped_result(node_id: &NodeId) -> DagResult {
    DagResult {
        node_id: node_id.clone(),
        status: NodeStatus::Skipped,
        started_at: None,
        completed_at: None,
        duration_s: 0,
        success: false,
        output: ParamMap::new(),
        artifacts: Vec::new(),
        error: None,
        rollback_available: false,
    }
}

/// Builds the `DagResult` recorded for a node the governor denied before it
/// ever ran.
fn failed_result(node_id: &NodeId, now: Timestamp, reason: &str) -> DagResult {
    DagResult {
        node_id: node_id.clone(),
        status: NodeStatus::Failed,
        started_at: Some(now),
        completed_at: Some(now),
        duration_s: 0,
        success: false,
        output: ParamMap::new(),
        artifacts: Vec::new(),
        error: Some(reason.to_string()),
        rollback_available: false,
    }
}

/// Renders a node error's display message for embedding in a [`DagResult`].
fn node_error_message(err: &NodeError) -> String {
    err.to_string()
}

/// Whole seconds between `start` and `end`, floored at zero.
fn elapsed_seconds(start: Timestamp, end: Timestamp) -> u64 {
    let delta = end.as_offset_date_time() - start.as_offset_date_time();
    u64::try_from(delta.whole_seconds().max(0)).unwrap_or(u64::MAX)
}

/// Derives the overall [`GraphStatus`] from per-node results (§4.G step 4).
fn final_status(results: &[DagResult], spec: &GraphSpec) -> GraphStatus {
    let total = results.len();
    let completed = results.iter().filter(|result| result.status == NodeStatus::Completed).count();
    if completed == total && total == spec.nodes.len() {
        return GraphStatus::Completed;
    }
    let failed: Vec<&DagResult> = results.iter().filter(|result| result.status == NodeStatus::Failed).collect();
    let any_critical_failed = failed
        .iter()
        .any(|result| spec.nodes.iter().any(|node| node.node_id == result.node_id && node.critical));
    if !failed.is_empty() && (completed == 0 || any_critical_failed) {
        return GraphStatus::Failed;
    }
    GraphStatus::Partial
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::BTreeSet;

    use warden_core::FixedClock;
    use warden_core::GraphId;
    use warden_governor::GovernorPolicy;

    use super::*;
    use crate::graph::DagNode;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Timestamp::new(time::OffsetDateTime::from_unix_timestamp(1_000).unwrap())))
    }

    fn dag_node(id: &str, depends_on: &[&str], executor_class: &str, capabilities: &[Capability], critical: bool) -> DagNode {
        DagNode {
            node_id: NodeId::new(id),
            executor_class: executor_class.to_string(),
            depends_on: depends_on.iter().map(|dep| NodeId::new(*dep)).collect(),
            capabilities: capabilities.iter().copied().collect::<BTreeSet<_>>(),
            executor_params: ParamMap::new(),
            critical,
            node_type: executor_class.to_string(),
            ir_step_id: None,
            ir_step_hash: None,
        }
    }

    fn tenant() -> TenantId {
        TenantId::parse("acme").unwrap()
    }

    #[test]
    fn all_echo_nodes_completes() {
        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![dag_node("a", &[], "echo", &[Capability::Rollbackable], false)],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), None, clock(), tenant());
        let outcome = executor.run(&spec).unwrap();
        assert_eq!(outcome.result.status, GraphStatus::Completed);
        assert!(outcome.events.iter().any(|event| event.event_type == EventType::ExecutionGraphCompleted));
    }

    #[test]
    fn failing_node_stops_and_rolls_back() {
        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![
                dag_node("a", &[], "echo", &[Capability::Rollbackable], false),
                dag_node("b", &["a"], "failing", &[], false),
            ],
            dry_run: false,
            auto_rollback: true,
            stop_on_first_error: true,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), None, clock(), tenant());
        let outcome = executor.run(&spec).unwrap();
        assert_eq!(outcome.result.status, GraphStatus::Failed);
        assert!(outcome.events.iter().any(|event| event.event_type == EventType::ExecutionGraphRollbackStarted));
        assert!(outcome.events.iter().any(|event| event.event_type == EventType::TaskRolledBack));
    }

    #[test]
    fn critical_failure_yields_failed_status() {
        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![
                dag_node("a", &[], "echo", &[], false),
                dag_node("b", &[], "failing", &[], true),
            ],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), None, clock(), tenant());
        let outcome = executor.run(&spec).unwrap();
        assert_eq!(outcome.result.status, GraphStatus::Failed);
    }

    #[test]
    fn non_critical_failure_without_stop_yields_partial() {
        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![
                dag_node("a", &[], "echo", &[], false),
                dag_node("b", &[], "failing", &[], false),
            ],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), None, clock(), tenant());
        let outcome = executor.run(&spec).unwrap();
        assert_eq!(outcome.result.status, GraphStatus::Partial);
    }

    #[test]
    fn governor_degrade_skips_node() {
        let mut policy = GovernorPolicy::permissive();
        policy.allow_soft_degradation = true;
        policy.budget.max_steps = Some(1);
        policy.budget.steps_limit_type = warden_governor::LimitType::Soft;
        policy.skip_on_soft_limit.insert("echo".to_string());
        let governor = Arc::new(ExecutionGovernor::new(policy, clock()));

        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![
                dag_node("a", &[], "echo", &[], false),
                dag_node("b", &["a"], "echo", &[], false),
            ],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), Some(governor), clock(), tenant());
        let outcome = executor.run(&spec).unwrap();
        let skipped = outcome.result.node_results.iter().find(|result| result.node_id.as_str() == "b").unwrap();
        assert_eq!(skipped.status, NodeStatus::Skipped);
    }

    #[test]
    fn unknown_dependency_rejects_before_any_node_runs() {
        let spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: vec![dag_node("a", &["ghost"], "echo", &[], false)],
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let executor = DagExecutor::new(NodeRegistry::with_builtin_nodes(), None, clock(), tenant());
        assert!(executor.run(&spec).is_err());
    }
}
