// crates/warden-governor/src/lib.rs
// ============================================================================
// Crate: warden-governor
// Description: Per-run budget, soft-degradation, and node-approval
//              enforcement at node entry (§4.F).
// ============================================================================

//! # warden-governor
//!
//! The governor is the executor's policy gate: before every node runs, the
//! executor asks [`ExecutionGovernor::check_node_execution`] whether it may
//! proceed. Budgets are enforced hard (deny the run) or soft (degrade
//! individual node types), and a separate node-level approval path lets
//! specific node types require a human decision at run time — distinct from
//! `warden-approvals`'s whole-IR ledger, per §4.F's note that the two layers
//! only interoperate through events.
//!
//! - [`budget`] — `Budget`, `LimitType`, and the monotonic run counters.
//! - [`policy`] — `GovernorPolicy`, the static configuration for one run.
//! - [`decision`] — `Decision`, `BudgetViolation`, and the decision log.
//! - [`governor`] — `ExecutionGovernor`, the stateful per-run instance.

pub mod budget;
pub mod decision;
pub mod governor;
pub mod policy;

pub use budget::Budget;
pub use budget::BudgetCounters;
pub use budget::LimitType;
pub use decision::BudgetViolation;
pub use decision::Decision;
pub use decision::DecisionLogEntry;
pub use decision::NodeApprovalStatus;
pub use governor::ExecutionGovernor;
pub use policy::GovernorPolicy;
