// crates/warden-gateway/src/error.rs
// ============================================================================
// Module: Gateway Errors
// Description: Composes every component-level error into one GatewayError,
//              each rejecting variant carrying a partial GatewayResult (§4.K,
//              §7).
// Dependencies: thiserror, warden-approvals, warden-core, warden-evidence,
//               warden-executor
// ============================================================================

//! ## Overview
//! Every component this gateway composes (validator, ledger, diff-audit,
//! executor, evidence) raises its own `thiserror`-derived error type. Rather
//! than the gateway wrapping each with a generic variant, the four decision
//! points that can reject a request before execution even starts —
//! validation reject, a missing/invalid approval token, and a diff-audit
//! failure — carry a [`GatewayResult`] snapshot of what was known at the
//! point of rejection, so a caller can render the `{error, reason,
//! gateway_result}` envelope without re-deriving it.

use serde::Serialize;
use thiserror::Error;
use warden_approvals::model::ConsumeStatus;
use warden_core::validator::ValidationStatus;

/// Snapshot of what the gateway knew about a request at the point it
/// returned, whether allowed or rejected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayResult {
    /// Whether the run was allowed to proceed to execution.
    pub allowed: bool,
    /// Canonical hash of the IR under consideration, once validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_hash: Option<String>,
    /// The IR's validation disposition, once validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<ValidationStatus>,
    /// The approval token's consume disposition, if a token was consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ConsumeStatus>,
    /// Count of diff-audit mismatches found, if the audit ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_audit_mismatches: Option<usize>,
}

/// Errors raised composing and running §4.K's gateway flow.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// IR governance is on but the caller did not supply an IR.
    #[error("ir governance is enabled for this tenant but no ir was supplied")]
    MissingIr(GatewayResult),
    /// Validation rejected the IR outright.
    #[error("ir validation rejected the request")]
    ValidationRejected(GatewayResult),
    /// The IR escalated but no approval token was supplied.
    #[error("ir escalated to a required human approval but no token was supplied")]
    ApprovalRequired(GatewayResult),
    /// The supplied approval token did not consume successfully.
    #[error("approval token was not accepted")]
    ApprovalInvalid(GatewayResult),
    /// The compiled graph is not a faithful encoding of the validated IR.
    #[error("diff-audit found the compiled graph does not faithfully encode the ir")]
    DiffAuditFailed(GatewayResult),
    /// The approval ledger failed.
    #[error(transparent)]
    Ledger(#[from] warden_approvals::ledger::LedgerError),
    /// The executor could not order the graph's dependency structure.
    #[error(transparent)]
    Executor(#[from] warden_executor::ExecutorError),
    /// A canonicalization step (hashing, evidence packing) failed.
    #[error(transparent)]
    Canonical(#[from] warden_core::core::canonical::CanonicalError),
    /// The evidence sink failed to persist the run's evidence pack.
    #[error(transparent)]
    Evidence(#[from] warden_evidence::SinkError),
}

impl GatewayError {
    /// Returns the [`GatewayResult`] snapshot carried by this error, when one
    /// exists. Component-level errors (`Ledger`, `Executor`, `Canonical`,
    /// `Evidence`) carry none: they represent a backend failure, not a
    /// governance disposition.
    #[must_use]
    pub const fn gateway_result(&self) -> Option<&GatewayResult> {
        match self {
            Self::MissingIr(result)
            | Self::ValidationRejected(result)
            | Self::ApprovalRequired(result)
            | Self::ApprovalInvalid(result)
            | Self::DiffAuditFailed(result) => Some(result),
            Self::Ledger(_) | Self::Executor(_) | Self::Canonical(_) | Self::Evidence(_) => None,
        }
    }
}
