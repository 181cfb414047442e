// crates/warden-approvals/src/lib.rs
// ============================================================================
// Crate: warden-approvals
// Description: Single-use, TTL-bound approval ledger binding (tenant, ir_hash)
//              to a one-time token (§4.D).
// ============================================================================

//! # warden-approvals
//!
//! The approval ledger is how an `ESCALATE`d IR becomes executable: a caller
//! mints a single-use token bound to `(tenant_id, ir_hash)`, hands the raw
//! token to a human reviewer out of band, and the reviewer's one `consume`
//! call is the only way the token is ever used. The store only ever sees
//! [`Approval::token_hash`] — the raw token is generated by [`ledger::ApprovalLedger::create`]
//! and returned to its caller exactly once, never persisted or logged.
//!
//! - [`model`] — the `Approval` record and its status/consume-result types.
//! - [`store`] — the pluggable `ApprovalStore` trait plus an in-process
//!   implementation; `warden-store-sqlite` provides the durable one.
//! - [`ledger`] — `ApprovalLedger`, the service that wraps a store with
//!   token generation/hashing and emits audit events.

pub mod ledger;
pub mod model;
pub mod store;

pub use ledger::ApprovalLedger;
pub use ledger::RAW_TOKEN_BYTES;
pub use model::Approval;
pub use model::ApprovalStatus;
pub use model::ConsumeResult;
pub use model::ConsumeStatus;
pub use store::ApprovalStore;
pub use store::InMemoryApprovalStore;
pub use store::StoreError;
