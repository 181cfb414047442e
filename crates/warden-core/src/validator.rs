// crates/warden-core/src/validator.rs
// ============================================================================
// Module: Ethical/Risk Validator
// Description: Pure structural + risk-tier validation of an Ir (§4.C).
// Purpose: Turn an Ir into a ValidationResult without any I/O or randomness,
//          so the same Ir + the same now always yields the same result.
// Dependencies: crate::core, crate::ir
// ============================================================================

//! ## Overview
//! The validator is the gate between "a caller submitted a plan" and "the
//! plan is eligible to be turned into an execution graph". It never mutates
//! the [`crate::ir::Ir`] it receives and never reads the wall clock: `now` is
//! always supplied by the caller (see [`crate::core::time::Clock`]), which is
//! what keeps this module unit-testable without a clock mock.
//!
//! Per step, the validator computes a risk tier as
//! `max(action_tier, scope_tier, impact_tier)` and rolls every step's tier,
//! plus any structural/vocabulary violations, into one [`ValidationResult`]
//! whose [`ValidationStatus`] is `Pass`, `Escalate`, or `Reject`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::ids::TenantId;
use crate::core::time::Timestamp;
use crate::events::Event;
use crate::events::EventMeta;
use crate::events::EventType;
use crate::core::value::ParamValue;
use crate::ir::Action;
use crate::ir::Ir;
use crate::ir::IrStep;

// ============================================================================
// SECTION: Risk Tier
// ============================================================================

/// Risk tier assigned to a step or to the IR as a whole.
///
/// # Invariants
/// - Ordered `Low < Medium < High < Critical`; the IR's overall tier is the
///   maximum tier among its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Routine, reversible, low-blast-radius action.
    Low,
    /// Moderate blast radius or partially reversible.
    Medium,
    /// High blast radius, hard to reverse, or touches production.
    High,
    /// Irreversible or unbounded blast radius.
    Critical,
}

impl RiskTier {
    /// Returns whether this tier requires a human approval before execution.
    #[must_use]
    pub const fn requires_approval(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Returns the intrinsic risk tier of an action, independent of scope/impact.
#[must_use]
pub const fn action_tier(action: Action) -> RiskTier {
    match action {
        Action::CourseCreate | Action::CoursePublish => RiskTier::Low,
        Action::DeployWebsite
        | Action::DeployService
        | Action::ErpRecordCreate
        | Action::ErpRecordUpdate
        | Action::InfraScale => RiskTier::Medium,
        Action::DnsUpdateRecords | Action::DnsCreateZone | Action::ErpInstallModule => RiskTier::High,
        Action::DnsDeleteZone | Action::ErpUninstallModule | Action::ErpRecordDelete | Action::InfraDestroy => {
            RiskTier::Critical
        }
    }
}

/// Markers scanned for in a step's params/constraints that escalate scope
/// tier. Matching is case-insensitive substring search over string values and
/// map keys (see [`crate::core::value::ParamValue::contains_marker`]).
const SCOPE_ESCALATION_MARKERS: [(&str, RiskTier); 1] = [("production", RiskTier::High)];

/// Returns the scope tier contributed by a step's `constraints`/`params`.
#[must_use]
pub fn scope_tier(step: &IrStep) -> RiskTier {
    let mut tier = RiskTier::Low;
    for (needle, marker_tier) in SCOPE_ESCALATION_MARKERS {
        let params_hit = step.params.values().any(|value| value.contains_marker(needle));
        let constraints_hit = step.constraints.as_ref().is_some_and(|constraints| {
            constraints.environment.as_deref().is_some_and(|environment| {
                environment.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
            }) || constraints.extra.values().any(|value| value.contains_marker(needle))
        });
        if (params_hit || constraints_hit) && marker_tier > tier {
            tier = marker_tier;
        }
    }
    tier
}

/// Financial/commercial ERP models whose record mutations always escalate
/// impact tier to [`RiskTier::Critical`], regardless of other params.
const CRITICAL_ERP_MODELS: [&str; 5] =
    ["account.move", "account.payment", "account.invoice", "sale.order", "purchase.order"];

/// Returns true when `step` mutates an ERP record (`erp.record.*`) against a
/// [`CRITICAL_ERP_MODELS`] entry, as named by its `model` param.
#[must_use]
fn targets_critical_erp_model(step: &IrStep) -> bool {
    if !matches!(step.action, Action::ErpRecordCreate | Action::ErpRecordUpdate | Action::ErpRecordDelete) {
        return false;
    }
    step.params
        .get("model")
        .and_then(ParamValue::as_str)
        .is_some_and(|model| CRITICAL_ERP_MODELS.iter().any(|critical| critical.eq_ignore_ascii_case(model)))
}

/// Markers scanned for in a step's params/constraints that escalate impact
/// tier to [`RiskTier::Critical`] (large-blast-radius bulk operations).
const IMPACT_ESCALATION_MARKERS: [&str; 2] = ["bulk", "batch"];

/// Returns true when `step`'s params/constraints carry any
/// [`IMPACT_ESCALATION_MARKERS`] marker.
#[must_use]
fn has_bulk_marker(step: &IrStep) -> bool {
    IMPACT_ESCALATION_MARKERS.iter().any(|needle| {
        let params_hit = step.params.values().any(|value| value.contains_marker(needle));
        let constraints_hit = step.constraints.as_ref().is_some_and(|constraints| {
            constraints.environment.as_deref().is_some_and(|environment| {
                environment.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
            }) || constraints.extra.values().any(|value| value.contains_marker(needle))
        });
        params_hit || constraints_hit
    })
}

/// Returns the impact tier contributed by a step's target model and
/// params/constraints markers.
#[must_use]
pub fn impact_tier(step: &IrStep) -> RiskTier {
    if targets_critical_erp_model(step) || has_bulk_marker(step) { RiskTier::Critical } else { RiskTier::Low }
}

/// Computes a step's overall risk tier as the max of action, scope, and
/// impact tiers.
#[must_use]
pub fn step_risk_tier(step: &IrStep) -> RiskTier {
    action_tier(step.action).max(scope_tier(step)).max(impact_tier(step))
}

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Severity of a single validation violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks the IR outright.
    Error,
    /// Does not block the IR by itself but is surfaced to reviewers.
    Warning,
}

/// A single validation finding, scoped to one step when applicable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Violation severity.
    pub severity: Severity,
    /// Stable machine-readable violation code.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Effective id of the offending step, if step-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

// ============================================================================
// SECTION: Result
// ============================================================================

/// Overall disposition of an IR after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No errors, no step required approval: eligible to proceed directly.
    Pass,
    /// No errors, but at least one step requires human approval.
    Escalate,
    /// At least one error violation: the IR must not proceed.
    Reject,
}

/// Per-step risk assessment, keyed by the step's effective id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAssessment {
    /// Effective step id (`step_id`, or positional index).
    pub step_id: String,
    /// Content hash of the step (see [`crate::core::canonical::hash_canonical_json`]),
    /// independent of anything computed here.
    pub step_hash: String,
    /// Computed risk tier.
    pub risk_tier: RiskTier,
    /// Whether this step requires approval before execution.
    pub requires_approval: bool,
}

/// Full output of validating an [`Ir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Overall status.
    pub status: ValidationStatus,
    /// Overall risk tier: the maximum among all steps.
    pub risk_tier: RiskTier,
    /// True when at least one step requires approval; callers use this,
    /// not a status comparison, to decide whether to request a token.
    pub requires_approval: bool,
    /// Canonical hash of the validated IR, computed once here so no caller
    /// needs to recompute it (§4.C).
    pub ir_hash: String,
    /// Owning tenant, carried through from the IR for downstream callers.
    pub tenant_id: TenantId,
    /// The IR's request id, if one was assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Per-step assessments, in IR step order.
    pub steps: Vec<StepAssessment>,
    /// All violations found, in the order discovered.
    pub violations: Vec<Violation>,
    /// Timestamp supplied by the caller at validation time.
    pub validated_at: Timestamp,
}

impl ValidationResult {
    /// Returns true when no step requires approval and there are no errors.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// Returns the audit `EventType` this result emits, per §4.C
    /// (`ir.validated_pass|escalate|reject`).
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self.status {
            ValidationStatus::Pass => EventType::IrValidatedPass,
            ValidationStatus::Escalate => EventType::IrValidatedEscalate,
            ValidationStatus::Reject => EventType::IrValidatedReject,
        }
    }

    /// Builds the audit [`Event`] this result emits. Construction only;
    /// publishing to the event stream is the caller's responsibility, which
    /// is what keeps [`validate`] itself free of I/O.
    #[must_use]
    pub fn to_event(&self) -> Event {
        let meta = EventMeta {
            tenant_id: self.tenant_id.clone(),
            request_id: self.request_id.clone(),
            graph_id: None,
        };
        Event::new(self.event_type(), meta, crate::core::value::ParamMap::new(), self.validated_at)
    }
}

// ============================================================================
// SECTION: Validate
// ============================================================================

/// Validates `ir` as of `now`, without performing any I/O.
///
/// # Errors
///
/// This function does not return a `Result`: malformed structure is surfaced
/// as `Error`-severity [`Violation`]s with [`ValidationStatus::Reject`] rather
/// than an `Err`, so a caller always gets a complete report.
#[must_use]
pub fn validate(ir: &Ir, now: Timestamp) -> ValidationResult {
    let mut violations = Vec::new();

    for error in ir.all_structural_errors() {
        violations.push(Violation {
            severity: Severity::Error,
            code: "structural_error".to_string(),
            message: error.to_string(),
            step_id: None,
        });
    }

    let mut steps = Vec::with_capacity(ir.steps.len());
    let mut overall_tier = RiskTier::Low;

    for (index, step) in ir.steps.iter().enumerate() {
        let step_id = step.effective_id(index);
        let tier = step_risk_tier(step);
        let requires_approval = tier.requires_approval();
        overall_tier = overall_tier.max(tier);

        let step_hash = match crate::core::canonical::hash_canonical_json(step) {
            Ok(hash) => hash,
            Err(err) => {
                violations.push(Violation {
                    severity: Severity::Error,
                    code: "hash_failure".to_string(),
                    message: err.to_string(),
                    step_id: Some(step_id.clone()),
                });
                String::new()
            }
        };

        if tier == RiskTier::Critical {
            violations.push(Violation {
                severity: Severity::Warning,
                code: "critical_risk_step".to_string(),
                message: format!("step {step_id} carries critical risk tier"),
                step_id: Some(step_id.clone()),
            });
        }

        steps.push(StepAssessment { step_id, step_hash, risk_tier: tier, requires_approval });
    }

    let needs_approval = steps.iter().any(|step| step.requires_approval);

    let ir_hash = match crate::core::canonical::hash_canonical_json(ir) {
        Ok(hash) => hash,
        Err(err) => {
            violations.push(Violation {
                severity: Severity::Error,
                code: "hash_failure".to_string(),
                message: err.to_string(),
                step_id: None,
            });
            String::new()
        }
    };

    let has_errors = violations.iter().any(|violation| violation.severity == Severity::Error);
    let status = if has_errors {
        ValidationStatus::Reject
    } else if needs_approval {
        ValidationStatus::Escalate
    } else {
        ValidationStatus::Pass
    };

    ValidationResult {
        status,
        risk_tier: overall_tier,
        requires_approval: needs_approval,
        ir_hash,
        tenant_id: ir.tenant_id.clone(),
        request_id: ir.request_id.clone(),
        steps,
        violations,
        validated_at: now,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::BTreeMap;

    use time::OffsetDateTime;

    use super::*;
    use crate::core::ids::TenantId;
    use crate::core::value::ParamMap;
    use crate::core::value::ParamValue;
    use crate::ir::Constraints;
    use crate::ir::Provider;

    fn now() -> Timestamp {
        Timestamp::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap())
    }

    fn low_risk_step() -> IrStep {
        IrStep {
            action: Action::CourseCreate,
            provider: Provider::DeployProviderV1,
            resource: "site-1".to_string(),
            params: ParamMap::new(),
            idempotency_key: "dep-1".to_string(),
            constraints: None,
            budget_cents: Some(500),
            step_id: None,
            description: None,
        }
    }

    #[test]
    fn low_risk_step_passes_without_approval() {
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![low_risk_step()],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        let result = validate(&ir, now());
        assert_eq!(result.status, ValidationStatus::Pass);
        assert_eq!(result.risk_tier, RiskTier::Low);
    }

    #[test]
    fn critical_action_escalates() {
        let mut step = low_risk_step();
        step.action = Action::InfraDestroy;
        step.provider = Provider::InfraTerraform;
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        let result = validate(&ir, now());
        assert_eq!(result.status, ValidationStatus::Escalate);
        assert_eq!(result.risk_tier, RiskTier::Critical);
        assert!(result.steps[0].requires_approval);
    }

    #[test]
    fn production_marker_escalates_scope_tier() {
        let mut step = low_risk_step();
        step.constraints = Some(Constraints { environment: Some("production".to_string()), extra: ParamMap::new() });
        assert_eq!(scope_tier(&step), RiskTier::High);
    }

    #[test]
    fn critical_erp_model_escalates_impact_tier() {
        let mut step = low_risk_step();
        step.action = Action::ErpRecordUpdate;
        step.provider = Provider::ErpOdoo;
        let mut params = BTreeMap::new();
        params.insert("model".to_string(), ParamValue::String("account.move".to_string()));
        step.params = params;
        assert_eq!(impact_tier(&step), RiskTier::Critical);
    }

    #[test]
    fn non_critical_erp_model_does_not_escalate_impact_tier() {
        let mut step = low_risk_step();
        step.action = Action::ErpRecordUpdate;
        step.provider = Provider::ErpOdoo;
        let mut params = BTreeMap::new();
        params.insert("model".to_string(), ParamValue::String("res.partner".to_string()));
        step.params = params;
        assert_eq!(impact_tier(&step), RiskTier::Low);
    }

    #[test]
    fn deploy_website_action_tier_is_medium() {
        assert_eq!(action_tier(Action::DeployWebsite), RiskTier::Medium);
    }

    #[test]
    fn dns_update_records_action_tier_is_high() {
        assert_eq!(action_tier(Action::DnsUpdateRecords), RiskTier::High);
    }

    #[test]
    fn destructive_erp_actions_escalate_to_critical() {
        assert_eq!(action_tier(Action::ErpUninstallModule), RiskTier::Critical);
        assert_eq!(action_tier(Action::ErpRecordDelete), RiskTier::Critical);
    }

    #[test]
    fn structural_error_rejects_regardless_of_risk() {
        let mut step = low_risk_step();
        step.idempotency_key = String::new();
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        let result = validate(&ir, now());
        assert_eq!(result.status, ValidationStatus::Reject);
    }

    #[test]
    fn step_hash_is_independent_of_validator_output() {
        let step = low_risk_step();
        let hash_before = crate::core::canonical::hash_canonical_json(&step).unwrap();
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step.clone()],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        let result = validate(&ir, now());
        assert_eq!(result.steps[0].step_hash, hash_before);
        let hash_after = crate::core::canonical::hash_canonical_json(&step).unwrap();
        assert_eq!(hash_before, hash_after);
    }

    #[test]
    fn validate_is_pure_same_inputs_same_output() {
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![low_risk_step()],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        assert_eq!(validate(&ir, now()), validate(&ir, now()));
    }

    #[test]
    fn bulk_marker_in_params_escalates_impact() {
        let mut step = low_risk_step();
        let mut params = BTreeMap::new();
        params.insert("mode".to_string(), ParamValue::String("bulk".to_string()));
        step.params = params;
        assert_eq!(impact_tier(&step), RiskTier::Critical);
    }
}
