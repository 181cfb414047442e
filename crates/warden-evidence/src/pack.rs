// crates/warden-evidence/src/pack.rs
// ============================================================================
// Module: Evidence Pack
// Description: Canonical, hash-stamped record of one execution graph run
//              (§3, §4.J).
// Dependencies: warden-core, warden-executor
// ============================================================================

//! ## Overview
//! [`build_pack`] assembles a graph spec, its execution result, the audit
//! events the run emitted, and optional IR-level metadata into an
//! [`EvidencePack`], then stamps it with a `content_hash` computed over its
//! own canonical JSON with that field held empty. [`verify_pack`] redoes the
//! same computation and compares: any mismatch means the pack was altered
//! after it was built.

use serde::Deserialize;
use serde::Serialize;
use warden_core::ApprovalId;
use warden_core::Event;
use warden_core::core::canonical::CanonicalError;
use warden_core::core::canonical::hash_canonical_json;
use warden_core::core::ids::random_hex_id;
use warden_core::validator::ValidationStatus;
use warden_executor::GraphResult;
use warden_executor::GraphSpec;

/// IR-level metadata folded into an evidence pack, deliberately excluding
/// raw tokens or PII (§4.J: "never tokens, never raw PII").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrSummary {
    /// Canonical hash of the IR this run executed.
    pub ir_hash: String,
    /// Validation status the IR received.
    pub validation_status: ValidationStatus,
    /// Approval that authorized this run, if one was required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
}

/// Canonical, hash-stamped record of one execution graph run.
///
/// # Invariants
/// - `content_hash` is only ever meaningful after [`build_pack`] or
///   [`verify_pack`] computed it; constructing one by hand with an
///   arbitrary `content_hash` produces a pack that fails verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    /// Identifier of this pack, independent of the graph it records.
    pub pack_id: String,
    /// The graph spec that was run.
    pub graph_spec: GraphSpec,
    /// The run's aggregate result.
    pub execution_result: GraphResult,
    /// Audit events emitted over the course of the run, in emission order.
    pub audit_events: Vec<Event>,
    /// IR-level metadata, when the run was gated by IR governance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_summary: Option<IrSummary>,
    /// SHA-256 over this pack's canonical JSON with this field held empty.
    pub content_hash: String,
}

/// Builds an [`EvidencePack`] and stamps its `content_hash`.
///
/// # Errors
///
/// Returns [`CanonicalError`] if the pack fails to canonicalize.
pub fn build_pack(
    graph_spec: &GraphSpec,
    execution_result: &GraphResult,
    audit_events: Vec<Event>,
    ir_summary: Option<IrSummary>,
) -> Result<EvidencePack, CanonicalError> {
    let mut pack = EvidencePack {
        pack_id: format!("pack-{}", random_hex_id(16)),
        graph_spec: graph_spec.clone(),
        execution_result: execution_result.clone(),
        audit_events,
        ir_summary,
        content_hash: String::new(),
    };
    pack.content_hash = hash_canonical_json(&pack)?;
    Ok(pack)
}

/// Recomputes `pack`'s content hash (with the stored hash held empty) and
/// reports whether it matches the stored one.
///
/// # Errors
///
/// Returns [`CanonicalError`] if the pack fails to canonicalize.
pub fn verify_pack(pack: &EvidencePack) -> Result<bool, CanonicalError> {
    let mut rehashed = pack.clone();
    rehashed.content_hash = String::new();
    let recomputed = hash_canonical_json(&rehashed)?;
    Ok(recomputed == pack.content_hash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;
    use warden_core::GraphId;
    use warden_core::Timestamp;
    use warden_executor::GraphStatus;

    use super::*;

    fn sample_graph_spec() -> GraphSpec {
        GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: Vec::new(),
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        }
    }

    fn sample_result() -> GraphResult {
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_000).unwrap());
        GraphResult {
            graph_id: GraphId::new("g1"),
            status: GraphStatus::Completed,
            node_results: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    #[test]
    fn build_then_verify_succeeds() {
        let pack = build_pack(&sample_graph_spec(), &sample_result(), Vec::new(), None).unwrap();
        assert!(!pack.content_hash.is_empty());
        assert!(verify_pack(&pack).unwrap());
    }

    #[test]
    fn tampered_pack_fails_verification() {
        let mut pack = build_pack(&sample_graph_spec(), &sample_result(), Vec::new(), None).unwrap();
        pack.execution_result.duration_s += 1;
        assert!(!verify_pack(&pack).unwrap());
    }

    #[test]
    fn distinct_packs_get_distinct_ids() {
        let first = build_pack(&sample_graph_spec(), &sample_result(), Vec::new(), None).unwrap();
        let second = build_pack(&sample_graph_spec(), &sample_result(), Vec::new(), None).unwrap();
        assert_ne!(first.pack_id, second.pack_id);
    }

    #[test]
    fn ir_summary_round_trips_through_hashing() {
        let summary = IrSummary {
            ir_hash: "deadbeef".to_string(),
            validation_status: ValidationStatus::Escalate,
            approval_id: Some(ApprovalId::new("apr-1")),
        };
        let pack = build_pack(&sample_graph_spec(), &sample_result(), Vec::new(), Some(summary.clone())).unwrap();
        assert_eq!(pack.ir_summary, Some(summary));
        assert!(verify_pack(&pack).unwrap());
    }
}
