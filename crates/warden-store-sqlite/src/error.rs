// crates/warden-store-sqlite/src/error.rs
// ============================================================================
// Module: SQLite Store Errors
// Description: Backend error type shared by the approval and dedup store
//              implementations, mapped onto each trait's own error type at
//              the call site.
// Dependencies: thiserror, warden-approvals, warden-events
// ============================================================================

use thiserror::Error;
use warden_approvals::StoreError as ApprovalStoreError;
use warden_events::DedupError;

/// Errors raised by the `SQLite`-backed store implementations.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// The database file or its parent directory could not be opened.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// The `SQLite` engine reported a query or transaction failure.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// A stored row's content hash did not match its JSON payload.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// A stored row failed to deserialize or violated a type invariant.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// The writer queue rejected a command because it was saturated or the
    /// writer thread has stopped.
    #[error("sqlite store writer unavailable: {0}")]
    WriterUnavailable(String),
}

impl From<SqliteStoreError> for ApprovalStoreError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<SqliteStoreError> for DedupError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}
