// crates/warden-executor/src/error.rs
// ============================================================================
// Module: Executor Errors
// Description: Pre-execution structural errors for one graph run (§4.G).
// Dependencies: thiserror, warden-core
// ============================================================================

//! ## Overview
//! [`ExecutorError`] covers only the checks the executor performs before a
//! single node runs (step 1 of §4.G): unresolvable dependencies and cycles.
//! A node's own failure during execution is never an [`ExecutorError`] — it
//! becomes a [`crate::result::DagResult`] with `success=false`, per §4.H's
//! "any uncaught exception is wrapped as a node failure."

use thiserror::Error;

use crate::toposort::TopoError;

/// Errors that stop a run before any node executes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The graph's dependency structure could not be ordered.
    #[error(transparent)]
    Topology(#[from] TopoError),
}
