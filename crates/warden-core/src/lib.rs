// crates/warden-core/src/lib.rs
// ============================================================================
// Crate: warden-core
// Description: Canonical IR, risk validator, and diff-audit gate for the
//              governance kernel — the pure, no-I/O heart of the workspace.
// ============================================================================

//! # warden-core
//!
//! This crate holds the governance kernel's pure decision logic:
//!
//! - [`core`] — opaque identifiers, the clock seam, the schemaless value
//!   type, and RFC 8785 canonical hashing.
//! - [`ir`] — the closed intermediate representation (action/provider
//!   vocabularies, steps, plans).
//! - [`validator`] — risk-tier computation and structural validation
//!   (`Ir` + `now` → `ValidationResult`).
//! - [`diff_audit`] — verifies a compiled execution graph faithfully encodes
//!   the `Ir` it claims to come from.
//! - [`events`] — the shared audit event taxonomy used across the workspace.
//!
//! Every function in [`validator`] and [`diff_audit`] is a pure function:
//! no I/O, no randomness, no implicit wall-clock reads. Everything else in
//! the workspace (storage, the event stream, the CLI) is built around this
//! pure core, not the other way around.

pub mod core;
pub mod diff_audit;
pub mod events;
pub mod ir;
pub mod validator;

pub use core::ids::ApprovalId;
pub use core::ids::BusinessIntentId;
pub use core::ids::EventId;
pub use core::ids::GraphId;
pub use core::ids::NodeId;
pub use core::ids::RequestId;
pub use core::ids::SubscriberName;
pub use core::ids::TenantId;
pub use core::time::Clock;
pub use core::time::FixedClock;
pub use core::time::SystemClock;
pub use core::time::Timestamp;
pub use core::value::ParamMap;
pub use core::value::ParamValue;
pub use diff_audit::DagNodeRef;
pub use diff_audit::DiffAuditMismatch;
pub use diff_audit::DiffAuditReport;
pub use diff_audit::diff_audit;
pub use events::Event;
pub use events::EventMeta;
pub use events::EventType;
pub use ir::Action;
pub use ir::Constraints;
pub use ir::Ir;
pub use ir::IrSchemaError;
pub use ir::IrStep;
pub use ir::Provider;
pub use validator::RiskTier;
pub use validator::Severity;
pub use validator::StepAssessment;
pub use validator::ValidationResult;
pub use validator::ValidationStatus;
pub use validator::Violation;
pub use validator::validate;
