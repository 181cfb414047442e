// crates/warden-governor/src/governor.rs
// ============================================================================
// Module: Execution Governor
// Description: Stateful, per-run budget/degradation/approval enforcement at
//              node entry (§4.F).
// Dependencies: std::sync, warden-core
// ============================================================================

//! ## Overview
//! [`ExecutionGovernor`] is constructed fresh for every graph run (never
//! shared across graphs, per §9) and wraps a [`GovernorPolicy`] with live
//! counters, a decision log, and a small table of governor-level node
//! approval requests. `check_node_execution` is the only entry point the
//! executor calls before running a node; `record_node_execution` is called
//! after, to advance the counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use warden_core::Clock;
use warden_core::NodeId;
use warden_core::Timestamp;

use crate::budget::BudgetCounters;
use crate::decision::BudgetViolation;
use crate::decision::Decision;
use crate::decision::DecisionLogEntry;
use crate::decision::NodeApprovalRequest;
use crate::decision::NodeApprovalStatus;
use crate::policy::GovernorPolicy;

/// Per-run budget, degradation, and node-approval enforcement gate.
pub struct ExecutionGovernor {
    /// Budget, degradation, and approval configuration for this run.
    policy: GovernorPolicy,
    /// Clock used for elapsed-time and TTL checks.
    clock: Arc<dyn Clock>,
    /// Set once by `start()`; `None` means the run has not begun.
    start_time: Mutex<Option<Timestamp>>,
    /// Monotonic step/duration/external-call counters.
    counters: Mutex<BudgetCounters>,
    /// Every decision made this run, in order.
    decision_log: Mutex<Vec<DecisionLogEntry>>,
    /// Pending/approved/rejected node-level approval requests, by node id.
    node_approvals: Mutex<HashMap<NodeId, NodeApprovalRequest>>,
}

impl ExecutionGovernor {
    /// Constructs a governor over `policy`, using `clock` for duration and
    /// approval-TTL bookkeeping.
    #[must_use]
    pub fn new(policy: GovernorPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            start_time: Mutex::new(None),
            counters: Mutex::new(BudgetCounters::default()),
            decision_log: Mutex::new(Vec::new()),
            node_approvals: Mutex::new(HashMap::new()),
        }
    }

    /// Marks the run as started now, for wall-clock budget accounting.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned by an earlier panic.
    pub fn start(&self) {
        let mut start_time = self.start_time.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if start_time.is_none() {
            *start_time = Some(self.clock.now());
        }
    }

    /// Records an approver's decision on a pending node approval request.
    /// A no-op if no request is outstanding for `node_id`.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned by an earlier panic.
    pub fn decide_node_approval(&self, node_id: &NodeId, approved: bool) {
        let mut approvals = self.node_approvals.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(request) = approvals.get_mut(node_id) {
            request.status = if approved { NodeApprovalStatus::Approved } else { NodeApprovalStatus::Rejected };
        }
    }

    /// Returns the full decision log recorded so far, in decision order.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned by an earlier panic.
    #[must_use]
    pub fn decision_log(&self) -> Vec<DecisionLogEntry> {
        self.decision_log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Returns the live budget counters.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned by an earlier panic.
    #[must_use]
    pub fn counters(&self) -> BudgetCounters {
        *self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Decides whether `node_id` (of `node_type`) may execute now, per the
    /// four-step policy in §4.F.
    ///
    /// # Panics
    ///
    /// Panics only if an internal mutex is poisoned by an earlier panic.
    pub fn check_node_execution(&self, node_id: &NodeId, node_type: &str, node_critical: bool, is_dry_run: bool) -> Decision {
        let now = self.clock.now();

        if is_dry_run && !self.policy.dry_run_respects_limits {
            return self.log(node_id, Decision::Allow, now);
        }

        if let Some(violation) = self.hard_limit_violation() {
            let decision = Decision::Deny {
                reason: format!("budget exceeded: {} consumed {} of hard limit {}", violation.dimension, violation.consumed, violation.limit),
                violation: Some(violation),
            };
            return self.log(node_id, decision, now);
        }

        if self.policy.allow_soft_degradation
            && !self.policy.is_critical(node_id, node_critical)
            && self.policy.is_skippable_on_soft_limit(node_type)
            && self.soft_limit_pressure()
        {
            let decision = Decision::Degrade { reason: format!("soft budget pressure: {node_type} eligible for degradation") };
            return self.log(node_id, decision, now);
        }

        if self.policy.requires_node_approval(node_id, node_type) {
            let decision = self.approval_decision(node_id, now);
            return self.log(node_id, decision, now);
        }

        self.log(node_id, Decision::Allow, now)
    }

    /// Updates the run's counters after a node finishes executing.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned by an earlier panic.
    pub fn record_node_execution(&self, duration_s: u64, external_calls: u64) {
        let mut counters = self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        counters.record(duration_s, external_calls);
    }

    /// Wall-clock seconds since `start()`, or `0` if not yet started.
    fn elapsed_seconds(&self, now: Timestamp) -> u64 {
        let start_time = self.start_time.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        start_time.map_or(0, |start| {
            let delta = now.as_offset_date_time() - start.as_offset_date_time();
            u64::try_from(delta.whole_seconds().max(0)).unwrap_or(u64::MAX)
        })
    }

    /// Checks steps, duration, and external-call counters against their
    /// hard limits, returning the first violation found, if any.
    fn hard_limit_violation(&self) -> Option<BudgetViolation> {
        let counters = self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let budget = &self.policy.budget;
        let now = self.clock.now();
        let elapsed = self.elapsed_seconds(now);

        check_hard("steps", budget.max_steps, budget.steps_limit_type, counters.steps_consumed)
            .or_else(|| check_hard("duration_seconds", budget.max_duration_seconds, budget.duration_limit_type, elapsed))
            .or_else(|| {
                check_hard("external_calls", budget.max_external_calls, budget.external_calls_limit_type, counters.external_calls_consumed)
            })
    }

    /// Returns whether any monitored counter has reached the configured
    /// soft-degradation threshold.
    fn soft_limit_pressure(&self) -> bool {
        let counters = self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let budget = &self.policy.budget;
        let now = self.clock.now();
        let elapsed = self.elapsed_seconds(now);

        soft_fraction(budget.max_steps, budget.steps_limit_type, counters.steps_consumed) >= self.policy.soft_degradation_threshold
            || soft_fraction(budget.max_duration_seconds, budget.duration_limit_type, elapsed) >= self.policy.soft_degradation_threshold
            || soft_fraction(budget.max_external_calls, budget.external_calls_limit_type, counters.external_calls_consumed)
                >= self.policy.soft_degradation_threshold
    }

    /// Looks up or creates a node-level approval request and returns the
    /// decision it implies (§4.F step 4).
    fn approval_decision(&self, node_id: &NodeId, now: Timestamp) -> Decision {
        let mut approvals = self.node_approvals.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let needs_new = approvals.get(node_id).is_none_or(|request| {
            matches!(request.status, NodeApprovalStatus::Pending) && request.expires_at <= now
        });
        if needs_new {
            let expires_at = Timestamp::new(now.as_offset_date_time() + time::Duration::seconds(self.policy.node_approval_ttl_s));
            approvals.insert(node_id.clone(), NodeApprovalRequest {
                node_id: node_id.clone(),
                status: NodeApprovalStatus::Pending,
                created_at: now,
                expires_at,
            });
            return Decision::RequireApproval { message: format!("node {node_id} awaiting approval") };
        }
        match approvals.get(node_id).map(|request| request.status) {
            Some(NodeApprovalStatus::Approved) => Decision::Allow,
            Some(NodeApprovalStatus::Rejected) => Decision::Deny { reason: format!("node {node_id} approval rejected"), violation: None },
            Some(NodeApprovalStatus::Pending) | None => Decision::RequireApproval { message: format!("node {node_id} still awaiting approval") },
        }
    }

    /// Appends `decision` to the in-memory decision log and returns it
    /// unchanged, so callers can log-and-return in one expression.
    fn log(&self, node_id: &NodeId, decision: Decision, now: Timestamp) -> Decision {
        let mut log = self.decision_log.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        log.push(DecisionLogEntry { node_id: node_id.clone(), decision: decision.clone(), decided_at: now });
        decision
    }
}

/// Returns a [`BudgetViolation`] if `consumed` has reached or exceeded a
/// `Hard`-typed `limit`.
fn check_hard(dimension: &str, limit: Option<u64>, limit_type: crate::budget::LimitType, consumed: u64) -> Option<BudgetViolation> {
    if limit_type != crate::budget::LimitType::Hard {
        return None;
    }
    let limit = limit?;
    if consumed >= limit {
        Some(BudgetViolation { dimension: dimension.to_string(), limit_type, consumed, limit })
    } else {
        None
    }
}

/// Returns the consumption fraction of a `Soft`-typed dimension, or `0.0`
/// when the dimension is unbounded or hard-typed (hard limits never
/// contribute to soft degradation).
fn soft_fraction(limit: Option<u64>, limit_type: crate::budget::LimitType, consumed: u64) -> f64 {
    if limit_type != crate::budget::LimitType::Soft {
        return 0.0;
    }
    BudgetCounters::fraction_of(consumed, limit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use warden_core::FixedClock;

    use super::*;
    use crate::budget::Budget;
    use crate::budget::LimitType;

    fn clock_at(unix: i64) -> Arc<dyn Clock> {
        Arc::new(FixedClock(Timestamp::new(time::OffsetDateTime::from_unix_timestamp(unix).unwrap())))
    }

    #[test]
    fn permissive_policy_always_allows() {
        let governor = ExecutionGovernor::new(GovernorPolicy::permissive(), clock_at(1_000));
        governor.start();
        let decision = governor.check_node_execution(&NodeId::new("n1"), "echo", false, false);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn hard_step_limit_denies() {
        let mut policy = GovernorPolicy::permissive();
        policy.budget.max_steps = Some(1);
        policy.budget.steps_limit_type = LimitType::Hard;
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        governor.record_node_execution(1, 0);
        let decision = governor.check_node_execution(&NodeId::new("n2"), "echo", false, false);
        assert!(matches!(decision, Decision::Deny { .. }));
    }

    #[test]
    fn soft_limit_degrades_skippable_non_critical_node() {
        let mut policy = GovernorPolicy::permissive();
        policy.allow_soft_degradation = true;
        policy.budget.max_steps = Some(10);
        policy.budget.steps_limit_type = LimitType::Soft;
        policy.skip_on_soft_limit.insert("echo".to_string());
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        for _ in 0..9 {
            governor.record_node_execution(0, 0);
        }
        let decision = governor.check_node_execution(&NodeId::new("n10"), "echo", false, false);
        assert!(matches!(decision, Decision::Degrade { .. }));
    }

    #[test]
    fn critical_node_never_degrades() {
        let mut policy = GovernorPolicy::permissive();
        policy.allow_soft_degradation = true;
        policy.budget.max_steps = Some(10);
        policy.budget.steps_limit_type = LimitType::Soft;
        policy.skip_on_soft_limit.insert("echo".to_string());
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        for _ in 0..9 {
            governor.record_node_execution(0, 0);
        }
        let decision = governor.check_node_execution(&NodeId::new("n10"), "echo", true, false);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn node_requiring_approval_blocks_until_decided() {
        let mut policy = GovernorPolicy::permissive();
        policy.required_approval_node_types.insert("erp_install".to_string());
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        let node_id = NodeId::new("n1");
        let first = governor.check_node_execution(&node_id, "erp_install", false, false);
        assert!(matches!(first, Decision::RequireApproval { .. }));

        let still_pending = governor.check_node_execution(&node_id, "erp_install", false, false);
        assert!(matches!(still_pending, Decision::RequireApproval { .. }));

        governor.decide_node_approval(&node_id, true);
        let approved = governor.check_node_execution(&node_id, "erp_install", false, false);
        assert_eq!(approved, Decision::Allow);
    }

    #[test]
    fn rejected_node_approval_denies() {
        let mut policy = GovernorPolicy::permissive();
        policy.required_approval_node_types.insert("erp_install".to_string());
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        let node_id = NodeId::new("n1");
        let _ = governor.check_node_execution(&node_id, "erp_install", false, false);
        governor.decide_node_approval(&node_id, false);
        let decision = governor.check_node_execution(&node_id, "erp_install", false, false);
        assert!(matches!(decision, Decision::Deny { .. }));
    }

    #[test]
    fn dry_run_skips_enforcement_by_default() {
        let mut policy = GovernorPolicy::permissive();
        policy.budget.max_steps = Some(0);
        policy.budget.steps_limit_type = LimitType::Hard;
        let governor = ExecutionGovernor::new(policy, clock_at(1_000));
        governor.start();
        let decision = governor.check_node_execution(&NodeId::new("n1"), "echo", false, true);
        assert_eq!(decision, Decision::Allow);
    }
}
