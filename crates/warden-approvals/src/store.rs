// crates/warden-approvals/src/store.rs
// ============================================================================
// Module: Approval Store
// Description: Pluggable storage contract for approval records, plus an
//              in-process implementation (§4.D).
// Dependencies: std::sync, warden-core
// ============================================================================

//! ## Overview
//! The abstract store contract is `create`/`get`/`update`/`delete`/
//! `find_by_token_hash` (§4.D). [`InMemoryApprovalStore`] is the in-process
//! backend: a `token_hash -> approval_id` index over a `HashMap`, guarded by
//! one mutex so creation and consumption serialize per approval id. The
//! durable, horizontally-scalable backend (native-TTL key/value semantics
//! realized over SQLite) lives in `warden-store-sqlite`, implementing the
//! same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use warden_core::ApprovalId;

use crate::model::Approval;

/// Errors raised by an [`ApprovalStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not complete the operation.
    #[error("approval store backend error: {0}")]
    Backend(String),
    /// `create` was called with an `approval_id` that already exists.
    #[error("approval {0} already exists")]
    AlreadyExists(ApprovalId),
}

/// Pluggable storage contract for [`Approval`] records.
///
/// # Invariants
/// - Implementations serialize writes to the same `approval_id`; concurrent
///   reads are always safe.
pub trait ApprovalStore: Send + Sync {
    /// Persists a newly created approval.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the id is already present, or
    /// [`StoreError::Backend`] on a backend failure.
    fn create(&self, approval: Approval) -> Result<(), StoreError>;

    /// Looks up an approval by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on a backend failure.
    fn get(&self, approval_id: &ApprovalId) -> Result<Option<Approval>, StoreError>;

    /// Replaces the stored record for `approval.approval_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on a backend failure.
    fn update(&self, approval: Approval) -> Result<(), StoreError>;

    /// Removes an approval record, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on a backend failure.
    fn delete(&self, approval_id: &ApprovalId) -> Result<(), StoreError>;

    /// Looks up an approval by its token hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on a backend failure.
    fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Approval>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    /// Primary store, keyed by approval id.
    by_id: HashMap<ApprovalId, Approval>,
    /// Secondary index used by `find_by_token_hash`.
    by_token_hash: HashMap<String, ApprovalId>,
}

/// In-process [`ApprovalStore`] backed by a mutex-guarded `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryApprovalStore {
    /// Guarded state shared across `create`/`get`/`update`/`delete`.
    inner: Mutex<Inner>,
}

impl InMemoryApprovalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApprovalStore for InMemoryApprovalStore {
    fn create(&self, approval: Approval) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        if inner.by_id.contains_key(&approval.approval_id) {
            return Err(StoreError::AlreadyExists(approval.approval_id));
        }
        inner.by_token_hash.insert(approval.token_hash.clone(), approval.approval_id.clone());
        inner.by_id.insert(approval.approval_id.clone(), approval);
        Ok(())
    }

    fn get(&self, approval_id: &ApprovalId) -> Result<Option<Approval>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(inner.by_id.get(approval_id).cloned())
    }

    fn update(&self, approval: Approval) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        inner.by_token_hash.insert(approval.token_hash.clone(), approval.approval_id.clone());
        inner.by_id.insert(approval.approval_id.clone(), approval);
        Ok(())
    }

    fn delete(&self, approval_id: &ApprovalId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        if let Some(approval) = inner.by_id.remove(approval_id) {
            inner.by_token_hash.remove(&approval.token_hash);
        }
        Ok(())
    }

    fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Approval>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(inner.by_token_hash.get(token_hash).and_then(|id| inner.by_id.get(id)).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;
    use warden_core::TenantId;
    use warden_core::Timestamp;

    use super::*;
    use crate::model::ApprovalStatus;

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

    #[test]
    fn create_then_find_by_token_hash() {
        let store = InMemoryApprovalStore::new();
        store.create(sample("a1")).unwrap();
        let found = store.find_by_token_hash("th-a1").unwrap().unwrap();
        assert_eq!(found.approval_id, ApprovalId::new("a1"));
    }

    #[test]
    fn create_twice_rejects() {
        let store = InMemoryApprovalStore::new();
        store.create(sample("a1")).unwrap();
        assert!(matches!(store.create(sample("a1")), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn delete_removes_token_hash_index() {
        let store = InMemoryApprovalStore::new();
        store.create(sample("a1")).unwrap();
        store.delete(&ApprovalId::new("a1")).unwrap();
        assert!(store.find_by_token_hash("th-a1").unwrap().is_none());
        assert!(store.get(&ApprovalId::new("a1")).unwrap().is_none());
    }
}
