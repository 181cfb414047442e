// crates/warden-core/src/ir.rs
// ============================================================================
// Module: Canonical Intermediate Representation
// Description: Typed plan model with fixed action/provider vocabularies.
// Purpose: Give every downstream component (validator, diff-audit, executor)
//          a single, deterministically hashable plan type.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! The IR is the one artifact every governance decision is made against. It
//! is deliberately closed: unknown top-level fields, unknown per-step fields,
//! and unknown action/provider vocabulary values all reject at deserialize
//! time, before any semantic validation runs (§4.B). Risk-tier and
//! approval-requirement fields are never part of the wire `IrStep` — they are
//! validator output (see [`crate::validator`]), not caller input, which is
//! what keeps [`crate::core::canonical::hash_canonical_json`] of a step
//! stable across validation (§8: "step_hash is independent of
//! validator-computed fields").

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ids::TenantId;
use crate::core::time::Timestamp;
use crate::core::value::ParamMap;

// ============================================================================
// SECTION: Closed Vocabularies
// ============================================================================

/// Closed action vocabulary. Unknown values reject on deserialize.
///
/// # Invariants
/// - Exhaustive in code; adding a new action is a compile-time-visible change
///   across every `match` that handles `Action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Generate and deploy a website.
    #[serde(rename = "deploy.website")]
    DeployWebsite,
    /// Deploy a backing service.
    #[serde(rename = "deploy.service")]
    DeployService,
    /// Update DNS records in an existing zone.
    #[serde(rename = "dns.update_records")]
    DnsUpdateRecords,
    /// Create a new DNS zone.
    #[serde(rename = "dns.create_zone")]
    DnsCreateZone,
    /// Delete a DNS zone.
    #[serde(rename = "dns.delete_zone")]
    DnsDeleteZone,
    /// Install an ERP module.
    #[serde(rename = "erp.install_module")]
    ErpInstallModule,
    /// Uninstall an ERP module.
    #[serde(rename = "erp.uninstall_module")]
    ErpUninstallModule,
    /// Create an ERP record.
    #[serde(rename = "erp.record.create")]
    ErpRecordCreate,
    /// Update an ERP record.
    #[serde(rename = "erp.record.update")]
    ErpRecordUpdate,
    /// Delete an ERP record.
    #[serde(rename = "erp.record.delete")]
    ErpRecordDelete,
    /// Destroy infrastructure.
    #[serde(rename = "infra.destroy")]
    InfraDestroy,
    /// Scale infrastructure.
    #[serde(rename = "infra.scale")]
    InfraScale,
    /// Create a course.
    #[serde(rename = "course.create")]
    CourseCreate,
    /// Publish a course.
    #[serde(rename = "course.publish")]
    CoursePublish,
}

impl Action {
    /// Returns the wire string for this action.
    #[must_use]
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::DeployWebsite => "deploy.website",
            Self::DeployService => "deploy.service",
            Self::DnsUpdateRecords => "dns.update_records",
            Self::DnsCreateZone => "dns.create_zone",
            Self::DnsDeleteZone => "dns.delete_zone",
            Self::ErpInstallModule => "erp.install_module",
            Self::ErpUninstallModule => "erp.uninstall_module",
            Self::ErpRecordCreate => "erp.record.create",
            Self::ErpRecordUpdate => "erp.record.update",
            Self::ErpRecordDelete => "erp.record.delete",
            Self::InfraDestroy => "infra.destroy",
            Self::InfraScale => "infra.scale",
            Self::CourseCreate => "course.create",
            Self::CoursePublish => "course.publish",
        }
    }
}

/// Closed provider vocabulary. Unknown values reject on deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// First-party deploy provider.
    #[serde(rename = "deploy.provider_v1")]
    DeployProviderV1,
    /// Hetzner DNS provider.
    #[serde(rename = "dns.hetzner")]
    DnsHetzner,
    /// AWS Route53 DNS provider.
    #[serde(rename = "dns.route53")]
    DnsRoute53,
    /// Odoo ERP provider.
    #[serde(rename = "erp.odoo")]
    ErpOdoo,
    /// LLM planning/drafting provider.
    #[serde(rename = "llm.brain")]
    LlmBrain,
    /// Terraform infrastructure provider.
    #[serde(rename = "infra.terraform")]
    InfraTerraform,
}

impl Provider {
    /// Returns the wire string for this provider.
    #[must_use]
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::DeployProviderV1 => "deploy.provider_v1",
            Self::DnsHetzner => "dns.hetzner",
            Self::DnsRoute53 => "dns.route53",
            Self::ErpOdoo => "erp.odoo",
            Self::LlmBrain => "llm.brain",
            Self::InfraTerraform => "infra.terraform",
        }
    }
}

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Optional per-step constraints consulted by the validator's scope tier.
///
/// # Invariants
/// - Unknown fields reject (fail-closed), matching the step and IR level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    /// Deployment/operational environment, e.g. `"production"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Free-form additional constraint markers consulted by marker scans.
    #[serde(default, skip_serializing_if = ParamMap::is_empty)]
    pub extra: ParamMap,
}

// ============================================================================
// SECTION: IR Step
// ============================================================================

/// A single step in an IR plan.
///
/// # Invariants
/// - `resource` is non-empty.
/// - `idempotency_key` is non-empty and at most 200 characters after trimming.
/// - `budget_cents`, when present, is a non-negative integer (never a float).
/// - `risk_tier`/`requires_approval` are never part of this type: they are
///   validator output, reported via [`crate::validator::ValidationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrStep {
    /// Action vocabulary entry.
    pub action: Action,
    /// Provider vocabulary entry.
    pub provider: Provider,
    /// Target resource identifier.
    pub resource: String,
    /// Free-form parameters consumed by the target node.
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub params: ParamMap,
    /// Idempotency key for the step.
    pub idempotency_key: String,
    /// Optional policy constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Optional budget in integer cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_cents: Option<i64>,
    /// Optional caller-supplied step identifier; when absent the step's
    /// positional index (as a string) is used everywhere an id is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IrStep {
    /// Returns this step's effective identifier: `step_id` if present, else
    /// the positional index rendered as a string.
    #[must_use]
    pub fn effective_id(&self, index: usize) -> String {
        self.step_id.clone().unwrap_or_else(|| index.to_string())
    }
}

// ============================================================================
// SECTION: IR
// ============================================================================

/// A full intermediate-representation plan.
///
/// # Invariants
/// - `steps` is non-empty.
/// - `tenant_id` is required, non-empty, and control-character free (enforced
///   by [`TenantId`]'s own validated deserialization).
/// - Unknown top-level fields reject.
/// - Immutable after validation: callers must not mutate an `Ir` once it has
///   been passed through [`crate::validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ir {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Ordered, non-empty list of steps.
    pub steps: Vec<IrStep>,
    /// Request identifier; generated if absent on construction via
    /// [`Ir::with_generated_request_id`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub labels: ParamMap,
}

/// Errors raised constructing or performing structural checks on an [`Ir`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrSchemaError {
    /// The IR contained zero steps.
    #[error("ir must contain at least one step")]
    EmptySteps,
    /// A step's idempotency key was empty or whitespace-only.
    #[error("step {step_index} idempotency_key must not be empty or whitespace-only")]
    EmptyIdempotencyKey {
        /// Index of the offending step.
        step_index: usize,
    },
    /// A step's idempotency key exceeded the maximum length.
    #[error("step {step_index} idempotency_key exceeds 200 characters after trimming")]
    IdempotencyKeyTooLong {
        /// Index of the offending step.
        step_index: usize,
    },
    /// A step's resource was empty.
    #[error("step {step_index} resource must not be empty")]
    EmptyResource {
        /// Index of the offending step.
        step_index: usize,
    },
    /// A step's budget was negative.
    #[error("step {step_index} budget_cents must be non-negative")]
    NegativeBudget {
        /// Index of the offending step.
        step_index: usize,
    },
}

impl Ir {
    /// Returns `request_id` if set, assigning and returning a freshly
    /// generated one otherwise.
    #[must_use]
    pub fn with_generated_request_id(mut self) -> Self {
        if self.request_id.is_none() {
            self.request_id = Some(format!("req-{}", crate::core::ids::random_hex_id(16)));
        }
        self
    }

    /// Performs the structural checks re-verified by the validator as
    /// "belt & braces" on top of what `serde` already enforces at the
    /// schema boundary (§4.C).
    ///
    /// # Errors
    ///
    /// Returns the first [`IrSchemaError`] encountered.
    pub fn check_structure(&self) -> Result<(), IrSchemaError> {
        if self.steps.is_empty() {
            return Err(IrSchemaError::EmptySteps);
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.resource.trim().is_empty() {
                return Err(IrSchemaError::EmptyResource { step_index: index });
            }
            let trimmed_key = step.idempotency_key.trim();
            if trimmed_key.is_empty() {
                return Err(IrSchemaError::EmptyIdempotencyKey { step_index: index });
            }
            if trimmed_key.chars().count() > 200 {
                return Err(IrSchemaError::IdempotencyKeyTooLong { step_index: index });
            }
            if let Some(budget) = step.budget_cents
                && budget < 0
            {
                return Err(IrSchemaError::NegativeBudget { step_index: index });
            }
        }
        Ok(())
    }

    /// Returns all structural violations found, rather than stopping at the
    /// first one. Used by the validator to report every `ERROR` violation in
    /// a single pass.
    #[must_use]
    pub fn all_structural_errors(&self) -> Vec<IrSchemaError> {
        let mut errors = Vec::new();
        if self.steps.is_empty() {
            errors.push(IrSchemaError::EmptySteps);
            return errors;
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.resource.trim().is_empty() {
                errors.push(IrSchemaError::EmptyResource { step_index: index });
            }
            let trimmed_key = step.idempotency_key.trim();
            if trimmed_key.is_empty() {
                errors.push(IrSchemaError::EmptyIdempotencyKey { step_index: index });
            } else if trimmed_key.chars().count() > 200 {
                errors.push(IrSchemaError::IdempotencyKeyTooLong { step_index: index });
            }
            if let Some(budget) = step.budget_cents
                && budget < 0
            {
                errors.push(IrSchemaError::NegativeBudget { step_index: index });
            }
        }
        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn sample_step() -> IrStep {
        IrStep {
            action: Action::DeployWebsite,
            provider: Provider::DeployProviderV1,
            resource: "site-123".to_string(),
            params: ParamMap::new(),
            idempotency_key: "dep-dev-1".to_string(),
            constraints: None,
            budget_cents: Some(0),
            step_id: None,
            description: None,
        }
    }

    #[test]
    fn rejects_unknown_action() {
        let json = r#"{"action":"delete.everything","provider":"deploy.provider_v1","resource":"r","idempotency_key":"k"}"#;
        assert!(serde_json::from_str::<IrStep>(json).is_err());
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let json = r#"{"tenant_id":"acme","steps":[],"sneaky":true}"#;
        assert!(serde_json::from_str::<Ir>(json).is_err());
    }

    #[test]
    fn empty_steps_rejected() {
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        assert_eq!(ir.check_structure(), Err(IrSchemaError::EmptySteps));
    }

    #[test]
    fn whitespace_only_idempotency_key_rejected() {
        let mut step = sample_step();
        step.idempotency_key = "   ".to_string();
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        assert_eq!(ir.check_structure(), Err(IrSchemaError::EmptyIdempotencyKey { step_index: 0 }));
    }

    #[test]
    fn zero_budget_is_legal_negative_rejects() {
        let mut step = sample_step();
        step.budget_cents = Some(0);
        assert!(step.budget_cents.is_some_and(|value| value >= 0));
        step.budget_cents = Some(-1);
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![step],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        };
        assert_eq!(ir.check_structure(), Err(IrSchemaError::NegativeBudget { step_index: 0 }));
    }

    #[test]
    fn generated_request_id_is_stable_once_assigned() {
        let ir = Ir {
            tenant_id: TenantId::parse("acme").unwrap(),
            steps: vec![sample_step()],
            request_id: None,
            created_at: None,
            labels: ParamMap::new(),
        }
        .with_generated_request_id();
        assert!(ir.request_id.is_some());
    }
}
