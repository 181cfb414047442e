// crates/warden-store-sqlite/src/lib.rs
// ============================================================================
// Crate: warden-store-sqlite
// Description: Durable SQLite-backed implementations of the approval ledger's
//              ApprovalStore and the event stream's DedupStore (ambient
//              durability layer behind §4.D and §4.I's in-memory defaults).
// ============================================================================

//! # warden-store-sqlite
//!
//! The in-memory stores `warden-approvals` and `warden-events` ship with are
//! correct but vanish on restart. [`SqliteStore`] implements both
//! [`warden_approvals::ApprovalStore`] and [`warden_events::DedupStore`]
//! over one `SQLite` database: one background thread owns the write
//! connection (see [`writer`]), and a small pool of read-only connections
//! serves reads round-robin under WAL, following the same single-writer/
//! many-readers shape `decision-gate-store-sqlite` used for its run-state
//! store.
//!
//! - [`connection`] — pragma setup and schema initialization.
//! - [`writer`] — the background writer thread and its job queue.
//! - [`approvals`] — the `ApprovalStore` implementation.
//! - [`dedup`] — the `DedupStore` implementation.
//! - [`error`] — [`error::SqliteStoreError`], mapped onto each trait's error
//!   type at the call site.

pub mod approvals;
pub mod connection;
pub mod dedup;
pub mod error;
pub mod writer;

pub use connection::DEFAULT_BUSY_TIMEOUT_MS;
pub use connection::DEFAULT_READ_POOL_SIZE;
pub use connection::DEFAULT_WRITER_QUEUE_CAPACITY;
pub use connection::SqliteStoreConfig;
pub use error::SqliteStoreError;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rusqlite::Connection;

use crate::connection::initialize_schema;
use crate::connection::open_connection;
use crate::writer::WriterHandle;

/// Durable backend over `SQLite`, implementing both `ApprovalStore` and
/// `DedupStore`.
///
/// # Invariants
/// - All writes are serialized through one background thread; reads never
///   block on a write beyond `SQLite`'s own WAL reader/writer concurrency.
pub struct SqliteStore {
    /// Single background writer thread all mutations are funneled through.
    writer: WriterHandle,
    /// Pool of read-only connections, round-robined across callers.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Next index into `read_connections` to hand out.
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteStore {
    /// Opens (creating if absent) a `SQLite`-backed store at `config.path`,
    /// spawning its writer thread and read connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the database cannot be opened or its
    /// schema initialized.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let write_connection = open_connection(&config.path, config.busy_timeout_ms)?;
        initialize_schema(&write_connection)?;

        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            let read_connection = open_connection(&config.path, config.busy_timeout_ms)?;
            initialize_schema(&read_connection)?;
            read_connections.push(Mutex::new(read_connection));
        }

        Ok(Self {
            writer: writer::spawn(write_connection, config.writer_queue_capacity)?,
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the next read connection using round-robin selection.
    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }
}
