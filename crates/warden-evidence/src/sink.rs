// crates/warden-evidence/src/sink.rs
// ============================================================================
// Module: Evidence Sink
// Description: Write/read contract for persisting evidence packs, plus an
//              in-memory and a filesystem implementation (§4.J).
// Dependencies: std::fs, warden-core
// ============================================================================

//! ## Overview
//! [`EvidenceSink`] is a minimal write/finalize contract: `write` persists
//! one pack and returns an opaque reference to where it landed.
//! [`EvidenceReader`] is the matching read-back contract used by
//! verification. [`InMemorySink`] backs tests; [`FileSink`] writes one JSON
//! file per pack under a configured directory for local operation. Both
//! honor the same contract so `warden-gateway` never depends on which is
//! configured.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::pack::EvidencePack;

/// Errors raised by an [`EvidenceSink`] or [`EvidenceReader`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backing store failed to persist or read a pack.
    #[error("evidence sink error: {0}")]
    Backend(String),
    /// No pack exists under the requested reference.
    #[error("no evidence pack at {0}")]
    NotFound(String),
}

/// Persists [`EvidencePack`]s, returning an opaque reference to each write.
pub trait EvidenceSink {
    /// Writes `pack`, returning a reference usable with a matching
    /// [`EvidenceReader`].
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Backend`] when the write fails.
    fn write(&self, pack: &EvidencePack) -> Result<String, SinkError>;
}

/// Reads back previously written [`EvidencePack`]s.
pub trait EvidenceReader {
    /// Reads the pack stored under `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NotFound`] if no pack exists there, or
    /// [`SinkError::Backend`] on a read failure.
    fn read(&self, reference: &str) -> Result<EvidencePack, SinkError>;
}

/// In-process sink backed by a mutex-guarded `HashMap`, for tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    /// Packs keyed by the reference returned from `write`.
    packs: Mutex<HashMap<String, EvidencePack>>,
}

impl InMemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvidenceSink for InMemorySink {
    fn write(&self, pack: &EvidencePack) -> Result<String, SinkError> {
        let mut packs = self.packs.lock().map_err(|_| SinkError::Backend("lock poisoned".to_string()))?;
        packs.insert(pack.pack_id.clone(), pack.clone());
        Ok(pack.pack_id.clone())
    }
}

impl EvidenceReader for InMemorySink {
    fn read(&self, reference: &str) -> Result<EvidencePack, SinkError> {
        let packs = self.packs.lock().map_err(|_| SinkError::Backend("lock poisoned".to_string()))?;
        packs.get(reference).cloned().ok_or_else(|| SinkError::NotFound(reference.to_string()))
    }
}

/// Filesystem sink writing one JSON file per pack under `root_dir`.
#[derive(Debug, Clone)]
pub struct FileSink {
    /// Directory each pack is written to as `<pack_id>.json`.
    root_dir: PathBuf,
}

impl FileSink {
    /// Creates a sink rooted at `root_dir`, creating the directory if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Backend`] if the directory cannot be created.
    pub fn new(root_dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let root_dir = root_dir.into();
        fs::create_dir_all(&root_dir).map_err(|err| SinkError::Backend(err.to_string()))?;
        Ok(Self { root_dir })
    }

    /// File path a pack with the given id is written to or read from.
    fn path_for(&self, pack_id: &str) -> PathBuf {
        self.root_dir.join(format!("{pack_id}.json"))
    }
}

impl EvidenceSink for FileSink {
    fn write(&self, pack: &EvidencePack) -> Result<String, SinkError> {
        let path = self.path_for(&pack.pack_id);
        let json = serde_json::to_vec_pretty(pack).map_err(|err| SinkError::Backend(err.to_string()))?;
        fs::write(&path, json).map_err(|err| SinkError::Backend(err.to_string()))?;
        Ok(pack.pack_id.clone())
    }
}

impl EvidenceReader for FileSink {
    fn read(&self, reference: &str) -> Result<EvidencePack, SinkError> {
        let path = self.path_for(reference);
        if !Path::new(&path).exists() {
            return Err(SinkError::NotFound(reference.to_string()));
        }
        let bytes = fs::read(&path).map_err(|err| SinkError::Backend(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| SinkError::Backend(err.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use tempfile::tempdir;
    use time::OffsetDateTime;
    use warden_core::GraphId;
    use warden_core::Timestamp;
    use warden_executor::GraphResult;
    use warden_executor::GraphSpec;
    use warden_executor::GraphStatus;

    use super::*;
    use crate::pack::build_pack;

    fn sample_pack() -> EvidencePack {
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_000).unwrap());
        let graph_spec = GraphSpec {
            graph_id: GraphId::new("g1"),
            business_intent_id: None,
            nodes: Vec::new(),
            dry_run: false,
            auto_rollback: false,
            stop_on_first_error: false,
        };
        let execution_result = GraphResult {
            graph_id: GraphId::new("g1"),
            status: GraphStatus::Completed,
            node_results: Vec::new(),
            started_at: now,
            completed_at: now,
        };
        build_pack(&graph_spec, &execution_result, Vec::new(), None).unwrap()
    }

    #[test]
    fn in_memory_sink_round_trips() {
        let sink = InMemorySink::new();
        let pack = sample_pack();
        let reference = sink.write(&pack).unwrap();
        let read_back = sink.read(&reference).unwrap();
        assert_eq!(read_back, pack);
    }

    #[test]
    fn in_memory_sink_reports_missing_reference() {
        let sink = InMemorySink::new();
        assert!(matches!(sink.read("missing"), Err(SinkError::NotFound(_))));
    }

    #[test]
    fn file_sink_round_trips() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();
        let pack = sample_pack();
        let reference = sink.write(&pack).unwrap();
        let read_back = sink.read(&reference).unwrap();
        assert_eq!(read_back, pack);
    }
}
