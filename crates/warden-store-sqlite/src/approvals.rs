// crates/warden-store-sqlite/src/approvals.rs
// ============================================================================
// Module: SQLite Approval Store
// Description: Durable ApprovalStore backend (§4.D) over SQLite WAL.
// Dependencies: rusqlite, warden-approvals, warden-core
// ============================================================================

//! ## Overview
//! Reads run directly against a round-robined read-only connection from the
//! pool; every row's `content_hash` is re-derived from `approval_json` and
//! checked before the row is trusted, the same fail-closed pattern the
//! canonicalizer uses for IR hashes. Writes go through [`crate::writer`].

use rusqlite::OptionalExtension;
use rusqlite::params;
use warden_approvals::Approval;
use warden_approvals::ApprovalId;
use warden_approvals::ApprovalStore;
use warden_approvals::StoreError;
use warden_core::core::canonical::canonical_json_bytes;
use warden_core::core::canonical::sha256_hex;

use crate::SqliteStore;
use crate::error::SqliteStoreError;
use crate::writer::WriterJob;

impl ApprovalStore for SqliteStore {
    fn create(&self, approval: Approval) -> Result<(), StoreError> {
        let approval_id = approval.approval_id.clone();
        self.writer.submit(WriterJob::ApprovalCreate(approval)).map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message.contains("already exists") => {
                StoreError::AlreadyExists(approval_id)
            }
            other => other.into(),
        })
    }

    fn get(&self, approval_id: &ApprovalId) -> Result<Option<Approval>, StoreError> {
        self.load_approval("SELECT approval_json, content_hash FROM approvals WHERE approval_id = ?1", approval_id.as_str())
            .map_err(StoreError::from)
    }

    fn update(&self, approval: Approval) -> Result<(), StoreError> {
        self.writer.submit(WriterJob::ApprovalUpdate(approval)).map_err(StoreError::from)
    }

    fn delete(&self, approval_id: &ApprovalId) -> Result<(), StoreError> {
        self.writer.submit(WriterJob::ApprovalDelete(approval_id.clone())).map_err(StoreError::from)
    }

    fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Approval>, StoreError> {
        self.load_approval("SELECT approval_json, content_hash FROM approvals WHERE token_hash = ?1", token_hash)
            .map_err(StoreError::from)
    }
}

impl SqliteStore {
    /// Runs `query` (expected to select `approval_json, content_hash` for
    /// exactly one row matched by `key`) against a pooled read connection,
    /// verifying the stored hash before deserializing.
    fn load_approval(&self, query: &str, key: &str) -> Result<Option<Approval>, SqliteStoreError> {
        let connection = self.read_connection();
        let guard = connection.lock().map_err(|_| SqliteStoreError::Db("read mutex poisoned".to_string()))?;
        let row: Option<(String, String)> = guard
            .query_row(query, params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        drop(guard);
        let Some((json, content_hash)) = row else {
            return Ok(None);
        };
        let expected = sha256_hex(json.as_bytes());
        if expected != content_hash {
            return Err(SqliteStoreError::Corrupt(format!("content hash mismatch for approval row matched by {key}")));
        }
        let approval: Approval =
            serde_json::from_str(&json).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let recomputed = sha256_hex(&canonical_json_bytes(&approval).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?);
        if recomputed != content_hash {
            return Err(SqliteStoreError::Corrupt(format!(
                "stored approval row matched by {key} does not round-trip through canonical json"
            )));
        }
        Ok(Some(approval))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;
    use warden_approvals::ApprovalStatus;
    use warden_core::TenantId;
    use warden_core::Timestamp;

    use super::*;
    use crate::SqliteStoreConfig;

    fn sample(id: &str) -> Approval {
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1000).unwrap());
        Approval {
            approval_id: ApprovalId::new(id),
            tenant_id: TenantId::parse("acme").unwrap(),
            ir_hash: "ha".to_string(),
            token_hash: format!("th-{id}"),
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now,
            consumed_at: None,
            created_by: None,
            consumed_by: None,
        }
    }

    fn store() -> SqliteStore {
        let dir = tempfile::tempdir().unwrap();
        SqliteStore::open(SqliteStoreConfig::new(dir.path().join("store.db"))).unwrap()
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = store();
        store.create(sample("a1")).unwrap();
        let found = store.get(&ApprovalId::new("a1")).unwrap().unwrap();
        assert_eq!(found.approval_id, ApprovalId::new("a1"));
    }

    #[test]
    fn create_twice_rejects() {
        let store = store();
        store.create(sample("a1")).unwrap();
        assert!(matches!(store.create(sample("a1")), Err(StoreError::Backend(_)) | Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn find_by_token_hash_locates_row() {
        let store = store();
        store.create(sample("a1")).unwrap();
        let found = store.find_by_token_hash("th-a1").unwrap().unwrap();
        assert_eq!(found.approval_id, ApprovalId::new("a1"));
    }

    #[test]
    fn update_replaces_status() {
        let store = store();
        store.create(sample("a1")).unwrap();
        let mut updated = sample("a1");
        updated.status = ApprovalStatus::Consumed;
        updated.consumed_at = Some(updated.created_at);
        store.update(updated).unwrap();
        let found = store.get(&ApprovalId::new("a1")).unwrap().unwrap();
        assert_eq!(found.status, ApprovalStatus::Consumed);
    }

    #[test]
    fn delete_removes_row() {
        let store = store();
        store.create(sample("a1")).unwrap();
        store.delete(&ApprovalId::new("a1")).unwrap();
        assert!(store.get(&ApprovalId::new("a1")).unwrap().is_none());
    }

    #[test]
    fn unknown_id_returns_none() {
        let store = store();
        assert!(store.get(&ApprovalId::new("missing")).unwrap().is_none());
    }
}
