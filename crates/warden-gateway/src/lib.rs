// crates/warden-gateway/src/lib.rs
// ============================================================================
// Crate: warden-gateway
// Description: The gateway orchestrator (§4.K) — the single entry point that
//              composes validation, approvals, diff-audit, execution, event
//              publishing, and evidence packing into one request/response
//              call.
// ============================================================================

//! # warden-gateway
//!
//! Callers never talk to the validator, ledger, executor, or evidence sink
//! directly: they submit an [`gateway::ExecuteRequest`] to a
//! [`gateway::GatewayOrchestrator`] and get back either an
//! [`gateway::ExecuteResponse`] or an [`error::GatewayError`] carrying a
//! [`error::GatewayResult`] snapshot of what was decided before the request
//! was rejected.
//!
//! - [`gateway`] — [`gateway::GatewayOrchestrator`], [`gateway::ExecuteRequest`],
//!   [`gateway::ExecuteResponse`], [`gateway::IrGovernanceMode`].
//! - [`error`] — [`error::GatewayError`], [`error::GatewayResult`].
//! - [`mapping`] — stamps a compiled graph with the IR metadata the
//!   diff-audit gate needs.

pub mod error;
pub mod gateway;
pub mod mapping;

pub use error::GatewayError;
pub use error::GatewayResult;
pub use gateway::ExecuteRequest;
pub use gateway::ExecuteResponse;
pub use gateway::GatewayOrchestrator;
pub use gateway::IrGovernanceMode;
pub use mapping::attach_ir_metadata;
pub use mapping::claimed_nodes;
