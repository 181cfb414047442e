// crates/warden-store-sqlite/src/connection.rs
// ============================================================================
// Module: SQLite Connection Setup
// Description: Connection-opening and schema-initialization helpers shared
//              by the approval and dedup store implementations.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Every connection this crate opens is tuned the same way: WAL journaling
//! (so one writer and many readers never block each other), a busy timeout
//! instead of an immediate `SQLITE_BUSY`, and `synchronous = NORMAL` (safe
//! under WAL, faster than `FULL`). One writer connection is guarded by the
//! writer thread in [`crate::writer`]; the read pool in [`crate::SqliteStore`]
//! opens a handful of read-only connections round-robined across callers.

use std::path::Path;
use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::error::SqliteStoreError;

/// Default busy timeout applied to every connection, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read-only connections in the read pool.
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Default capacity of the writer command queue.
pub const DEFAULT_WRITER_QUEUE_CAPACITY: usize = 1_024;

/// Configuration for a [`crate::SqliteStore`].
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout applied to every connection, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Number of read-only connections in the read pool.
    pub read_pool_size: usize,
    /// Writer command queue capacity.
    pub writer_queue_capacity: usize,
}

impl SqliteStoreConfig {
    /// Builds a config pointing at `path` with every other setting at its
    /// default.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
            writer_queue_capacity: DEFAULT_WRITER_QUEUE_CAPACITY,
        }
    }
}

/// Opens a connection at `path` with WAL journaling and the configured busy
/// timeout.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] if the parent directory does not exist,
/// or [`SqliteStoreError::Db`] if `SQLite` rejects the connection or a
/// pragma.
pub fn open_connection(path: &Path, busy_timeout_ms: u64) -> Result<Connection, SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        return Err(SqliteStoreError::Io(format!("parent directory does not exist: {}", parent.display())));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(path, flags)?;
    connection.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
    connection.pragma_update(None, "journal_mode", "wal")?;
    connection.pragma_update(None, "synchronous", "normal")?;
    connection.pragma_update(None, "foreign_keys", "on")?;
    Ok(connection)
}

/// Creates the approval and dedup tables if they do not already exist.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] if the schema statements fail.
pub fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS approvals (
            approval_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            ir_hash TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            approval_json TEXT NOT NULL,
            content_hash TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_approvals_tenant_ir ON approvals (tenant_id, ir_hash);

        CREATE TABLE IF NOT EXISTS processed_events (
            subscriber TEXT NOT NULL,
            stream_message_id INTEGER NOT NULL,
            record_json TEXT NOT NULL,
            PRIMARY KEY (subscriber, stream_message_id)
        );",
    )?;
    Ok(())
}
