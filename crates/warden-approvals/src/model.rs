// crates/warden-approvals/src/model.rs
// ============================================================================
// Module: Approval Record Model
// Description: Approval, its status lifecycle, and consume-call results.
// Dependencies: serde, warden-core
// ============================================================================

//! ## Overview
//! An [`Approval`] binds one `(tenant_id, ir_hash)` pair to a token hash with
//! a TTL. Its status only ever moves `Pending -> Consumed` or
//! `Pending -> Expired`; `Consumed` is terminal (§3 Approval invariants).

use serde::Deserialize;
use serde::Serialize;
use warden_core::ApprovalId;
use warden_core::TenantId;
use warden_core::Timestamp;

/// Lifecycle status stored on an [`Approval`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Issued, not yet consumed or expired.
    Pending,
    /// Consumed exactly once. Terminal.
    Consumed,
    /// TTL elapsed before consumption. Terminal.
    Expired,
}

/// A single-use, TTL-bound approval record.
///
/// # Invariants
/// - The raw token is never a field of this type; only [`Approval::token_hash`]
///   (a SHA-256 hex digest) is ever stored.
/// - `status` transitions are monotonic: `Pending -> {Consumed | Expired}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Approval record identifier.
    pub approval_id: ApprovalId,
    /// Tenant this approval authorizes.
    pub tenant_id: TenantId,
    /// IR hash this approval authorizes.
    pub ir_hash: String,
    /// SHA-256 hex digest of the raw token. Never the raw token itself.
    pub token_hash: String,
    /// Current lifecycle status.
    pub status: ApprovalStatus,
    /// Issuance time.
    pub created_at: Timestamp,
    /// Expiry time; `consume` after this instant fails with `Expired`.
    pub expires_at: Timestamp,
    /// When the approval was consumed, if it has been.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<Timestamp>,
    /// Free-form identity of whoever requested the approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Free-form identity of whoever consumed the approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_by: Option<String>,
}

impl Approval {
    /// Returns whether `at` is at or past this approval's expiry.
    #[must_use]
    pub fn is_expired_at(&self, at: Timestamp) -> bool {
        at >= self.expires_at
    }
}

/// Disposition of a single `consume` call against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeStatus {
    /// This call consumed the approval.
    Consumed,
    /// The approval was already consumed by an earlier call.
    AlreadyConsumed,
    /// The approval's TTL had already elapsed.
    Expired,
    /// No matching approval, or tenant/ir_hash did not match the token.
    Invalid,
}

/// Result of a `consume` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResult {
    /// True only when this call is the one that consumed the approval.
    pub success: bool,
    /// Disposition of the call.
    pub status: ConsumeStatus,
    /// The matched approval id, when one was found by token hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn is_expired_at_boundary_is_inclusive() {
        let expires_at = Timestamp::new(OffsetDateTime::from_unix_timestamp(1000).unwrap());
        let approval = Approval {
            approval_id: ApprovalId::generate("apr"),
            tenant_id: TenantId::parse("acme").unwrap(),
            ir_hash: "deadbeef".to_string(),
            token_hash: "tokenhash".to_string(),
            status: ApprovalStatus::Pending,
            created_at: expires_at,
            expires_at,
            consumed_at: None,
            created_by: None,
            consumed_by: None,
        };
        assert!(approval.is_expired_at(expires_at));
    }
}
