// crates/warden-core/src/events.rs
// ============================================================================
// Module: Shared Audit Event Model
// Description: Event/EventType/EventMeta types used by every downstream crate
//              that emits or consumes the audit event stream (§4.I).
// Purpose: One closed event taxonomy, shared so warden-events, warden-executor,
//          warden-approvals, and warden-governor can't drift on field names.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Every governance decision — a mission being validated, a task executing, an
//! ethics escalation, a system health change — is recorded as an [`Event`].
//! Consumers deduplicate on `stream_message_id` (a transport-level delivery
//! id), never on [`Event::id`] (the audit identity), because at-least-once
//! delivery can redeliver the same event under the same transport id while a
//! legitimate retry of the same logical action gets a fresh [`Event::id`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::ids::EventId;
use crate::core::ids::TenantId;
use crate::core::time::Timestamp;
use crate::core::value::ParamMap;

// ============================================================================
// SECTION: Event Type
// ============================================================================

/// Closed audit event taxonomy. Unknown values reject on deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A mission (top-level business intent) was submitted.
    #[serde(rename = "mission.submitted")]
    MissionSubmitted,
    /// A mission was validated (pass, escalate, or reject).
    #[serde(rename = "mission.validated")]
    MissionValidated,
    /// A mission completed execution.
    #[serde(rename = "mission.completed")]
    MissionCompleted,
    /// A task (single graph node) started execution.
    #[serde(rename = "task.started")]
    TaskStarted,
    /// A task completed execution.
    #[serde(rename = "task.completed")]
    TaskCompleted,
    /// A task failed execution.
    #[serde(rename = "task.failed")]
    TaskFailed,
    /// A task was rolled back.
    #[serde(rename = "task.rolled_back")]
    TaskRolledBack,
    /// An ethics/risk escalation was raised for human approval.
    #[serde(rename = "ethics.escalated")]
    EthicsEscalated,
    /// A human approval decision was recorded.
    #[serde(rename = "ethics.approval_decided")]
    EthicsApprovalDecided,
    /// A system health or degradation transition occurred.
    #[serde(rename = "system.degraded")]
    SystemDegraded,
    /// The system recovered from a degraded state.
    #[serde(rename = "system.recovered")]
    SystemRecovered,
    /// An IR was submitted for validation.
    #[serde(rename = "ir.submitted")]
    IrSubmitted,
    /// An IR was rejected by the validator.
    #[serde(rename = "ir.rejected")]
    IrRejected,
    /// An execution graph was compiled from a validated IR.
    #[serde(rename = "execution_graph.compiled")]
    ExecutionGraphCompiled,
    /// An execution graph failed the diff-audit gate.
    #[serde(rename = "execution_graph.audit_failed")]
    ExecutionGraphAuditFailed,
    /// The validator passed an IR with no escalation required (§4.C).
    #[serde(rename = "ir.validated_pass")]
    IrValidatedPass,
    /// The validator passed an IR but at least one step requires approval (§4.C).
    #[serde(rename = "ir.validated_escalate")]
    IrValidatedEscalate,
    /// The validator rejected an IR outright (§4.C).
    #[serde(rename = "ir.validated_reject")]
    IrValidatedReject,
    /// An approval token was issued (§4.D).
    #[serde(rename = "ir.approval_created")]
    IrApprovalCreated,
    /// An approval token was consumed successfully (§4.D).
    #[serde(rename = "ir.approval_consumed")]
    IrApprovalConsumed,
    /// An approval was consumed after its TTL elapsed (§4.D).
    #[serde(rename = "ir.approval_expired")]
    IrApprovalExpired,
    /// A consume call did not match a valid pending approval (§4.D).
    #[serde(rename = "ir.approval_invalid")]
    IrApprovalInvalid,
    /// The diff-audit gate found the IR and DAG in agreement (§4.E).
    #[serde(rename = "ir.dag_diff_ok")]
    IrDagDiffOk,
    /// The diff-audit gate found a mismatch between the IR and DAG (§4.E).
    #[serde(rename = "ir.dag_diff_failed")]
    IrDagDiffFailed,
    /// An execution graph run started (§4.G).
    #[serde(rename = "execution_graph_started")]
    ExecutionGraphStarted,
    /// A node was skipped by the governor's soft-degradation decision (§4.G).
    #[serde(rename = "execution_graph_node_degraded")]
    ExecutionGraphNodeDegraded,
    /// A node failed during execution (§4.G).
    #[serde(rename = "execution_graph_node_failed")]
    ExecutionGraphNodeFailed,
    /// Rollback of completed nodes began after an unsuccessful run (§4.G).
    #[serde(rename = "execution_graph_rollback_started")]
    ExecutionGraphRollbackStarted,
    /// Rollback of completed nodes finished (§4.G).
    #[serde(rename = "execution_graph_rollback_completed")]
    ExecutionGraphRollbackCompleted,
    /// An execution graph run reached a final status (§4.G).
    #[serde(rename = "execution_graph_completed")]
    ExecutionGraphCompleted,
}

// ============================================================================
// SECTION: Event Metadata
// ============================================================================

/// Metadata common to every event, independent of its type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Correlated request id, when the event traces back to one IR submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Correlated execution graph id, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
}

// ============================================================================
// SECTION: Event
// ============================================================================

/// A single audit event.
///
/// # Invariants
/// - `id` is the audit identity and must never be used for dedup; transports
///   dedup on a separate `stream_message_id` carried alongside the event by
///   the event stream crate, not on this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Audit identity of this event. Not a dedup key.
    pub id: EventId,
    /// Event type.
    pub event_type: EventType,
    /// Common metadata.
    pub meta: EventMeta,
    /// Free-form, type-specific payload.
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub payload: ParamMap,
    /// When the event occurred, as supplied by the caller's clock.
    pub occurred_at: Timestamp,
}

impl Event {
    /// Constructs a new event with a freshly generated [`EventId`].
    #[must_use]
    pub fn new(event_type: EventType, meta: EventMeta, payload: ParamMap, occurred_at: Timestamp) -> Self {
        Self { id: EventId::generate("evt"), event_type, meta, payload, occurred_at }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn rejects_unknown_event_type() {
        let json = r#""mission.exploded""#;
        assert!(serde_json::from_str::<EventType>(json).is_err());
    }

    #[test]
    fn new_event_gets_distinct_ids() {
        let meta = EventMeta { tenant_id: TenantId::parse("acme").unwrap(), request_id: None, graph_id: None };
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let first = Event::new(EventType::MissionSubmitted, meta.clone(), ParamMap::new(), now);
        let second = Event::new(EventType::MissionSubmitted, meta, ParamMap::new(), now);
        assert_ne!(first.id, second.id);
    }
}
