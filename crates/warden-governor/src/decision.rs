// crates/warden-governor/src/decision.rs
// ============================================================================
// Module: Governor Decisions
// Description: Decision, budget violations, node-approval status, and the
//              decision log entry shape (§4.F).
// Dependencies: serde, warden-core
// ============================================================================

//! ## Overview
//! [`Decision`] is the governor's sole output per node-entry check. The
//! executor (§4.G step 2a) maps it directly to scheduling behavior: `Allow`
//! proceeds, `Degrade` skips, `Deny`/`RequireApproval` stop the run.

use serde::Deserialize;
use serde::Serialize;
use warden_core::NodeId;
use warden_core::Timestamp;

use crate::budget::LimitType;

/// A single budget-dimension breach recorded by the governor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetViolation {
    /// Which budget dimension was breached.
    pub dimension: String,
    /// Whether the breached dimension was configured soft or hard.
    pub limit_type: LimitType,
    /// Consumed value at the time of the breach.
    pub consumed: u64,
    /// Configured limit that was breached.
    pub limit: u64,
}

/// Status of a governor-level, per-node approval request. Distinct from
/// `warden-approvals`'s whole-IR ledger (§4.F note); the two communicate
/// only through emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeApprovalStatus {
    /// Awaiting a human decision.
    Pending,
    /// Approved; the node may proceed.
    Approved,
    /// Rejected; the node must not proceed.
    Rejected,
}

/// A pending or decided governor-level node approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeApprovalRequest {
    /// Node this request gates.
    pub node_id: NodeId,
    /// Current status.
    pub status: NodeApprovalStatus,
    /// When the request was created.
    pub created_at: Timestamp,
    /// When the request expires if undecided.
    pub expires_at: Timestamp,
}

/// Outcome of one `check_node_execution` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The node may proceed.
    Allow,
    /// The node must not proceed; the run stops.
    Deny {
        /// Human-readable reason, surfaced to the executor's failure result.
        reason: String,
        /// The budget violation that caused the denial, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        violation: Option<BudgetViolation>,
    },
    /// A governor-level approval is required before this node may proceed.
    RequireApproval {
        /// Human-readable message describing why an approval is pending.
        message: String,
    },
    /// The node is skipped under soft-limit pressure; the run continues.
    Degrade {
        /// Human-readable reason for the degradation.
        reason: String,
    },
}

/// One entry in the governor's append-only, in-memory decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Node the decision was made for.
    pub node_id: NodeId,
    /// The decision itself.
    pub decision: Decision,
    /// When the decision was made.
    pub decided_at: Timestamp,
}
