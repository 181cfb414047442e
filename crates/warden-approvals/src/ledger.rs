// crates/warden-approvals/src/ledger.rs
// ============================================================================
// Module: Approval Ledger Service
// Description: Issues and consumes single-use approval tokens over a
//              pluggable ApprovalStore (§4.D).
// Dependencies: base64, rand, sha2 (via warden-core), warden-core
// ============================================================================

//! ## Overview
//! [`ApprovalLedger`] is the one place that ever sees a raw token: it
//! generates 256 random bits, base64url-encodes them for the caller, and
//! stores only the SHA-256 hash. `consume` looks the approval up by that
//! hash and walks the state machine in §4.D: tenant/hash mismatch or no
//! match at all is `Invalid`; past `expires_at` is `Expired` (and the store
//! is mutated to reflect it); an already-`Consumed` record returns
//! `AlreadyConsumed` with `success=false`, satisfying the single-use
//! invariant even under a retried call.

use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use warden_core::ApprovalId;
use warden_core::Clock;
use warden_core::Event;
use warden_core::EventMeta;
use warden_core::EventType;
use warden_core::TenantId;
use warden_core::Timestamp;
use warden_core::core::canonical::sha256_hex;
use warden_core::core::value::ParamMap;

use crate::model::Approval;
use crate::model::ApprovalStatus;
use crate::model::ConsumeResult;
use crate::model::ConsumeStatus;
use crate::store::ApprovalStore;
use crate::store::StoreError;

/// Number of random bytes used to generate a raw approval token (256 bits).
pub const RAW_TOKEN_BYTES: usize = 32;

/// Errors raised by [`ApprovalLedger`] operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issues and consumes single-use, TTL-bound approval tokens.
pub struct ApprovalLedger {
    /// Pluggable backing store (§4.D).
    store: Arc<dyn ApprovalStore>,
    /// Clock used to stamp issuance, expiry, and consumption times.
    clock: Arc<dyn Clock>,
}

impl ApprovalLedger {
    /// Constructs a ledger over `store`, using `clock` for issuance,
    /// expiry, and audit timestamps.
    #[must_use]
    pub fn new(store: Arc<dyn ApprovalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Issues a new approval for `(tenant_id, ir_hash)` with a `ttl_s`
    /// second time-to-live, returning the stored record, the raw token
    /// (released exactly once), and the `ir.approval_created` audit event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on a backend failure.
    pub fn create(
        &self,
        tenant_id: TenantId,
        ir_hash: String,
        ttl_s: i64,
        created_by: Option<String>,
    ) -> Result<(Approval, String, Event), LedgerError> {
        let mut raw = vec![0_u8; RAW_TOKEN_BYTES];
        OsRng.fill_bytes(&mut raw);
        let raw_token = base64_url_encode(&raw);
        let token_hash = sha256_hex(raw_token.as_bytes());

        let now = self.clock.now();
        let expires_at = add_seconds(now, ttl_s);
        let approval = Approval {
            approval_id: ApprovalId::generate("apr"),
            tenant_id: tenant_id.clone(),
            ir_hash,
            token_hash,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at,
            consumed_at: None,
            created_by,
            consumed_by: None,
        };
        self.store.create(approval.clone())?;

        let event = Event::new(
            EventType::IrApprovalCreated,
            EventMeta { tenant_id, request_id: None, graph_id: None },
            ParamMap::new(),
            now,
        );
        Ok((approval, raw_token, event))
    }

    /// Consumes a raw token on behalf of `tenant_id`/`ir_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on a backend failure. A token that
    /// does not exist, or does not bind to the given tenant/ir_hash, is
    /// reported as `ConsumeStatus::Invalid`, not an `Err`.
    pub fn consume(
        &self,
        tenant_id: &TenantId,
        ir_hash: &str,
        raw_token: &str,
        consumed_by: Option<String>,
    ) -> Result<(ConsumeResult, Event), LedgerError> {
        let now = self.clock.now();
        let token_hash = sha256_hex(raw_token.as_bytes());
        let found = self.store.find_by_token_hash(&token_hash)?;

        let Some(mut approval) = found else {
            return Ok(invalid_result(tenant_id.clone(), now));
        };

        if approval.tenant_id != *tenant_id || approval.ir_hash != ir_hash {
            return Ok(invalid_result(tenant_id.clone(), now));
        }

        match approval.status {
            ApprovalStatus::Consumed => {
                let result = ConsumeResult {
                    success: false,
                    status: ConsumeStatus::AlreadyConsumed,
                    approval_id: Some(approval.approval_id.clone()),
                };
                let event = approval_event(
                    EventType::IrApprovalInvalid,
                    approval.tenant_id.clone(),
                    approval.approval_id.clone(),
                    now,
                );
                Ok((result, event))
            }
            ApprovalStatus::Expired => {
                let result = ConsumeResult {
                    success: false,
                    status: ConsumeStatus::Expired,
                    approval_id: Some(approval.approval_id.clone()),
                };
                let event = approval_event(
                    EventType::IrApprovalExpired,
                    approval.tenant_id.clone(),
                    approval.approval_id.clone(),
                    now,
                );
                Ok((result, event))
            }
            ApprovalStatus::Pending if approval.is_expired_at(now) => {
                approval.status = ApprovalStatus::Expired;
                self.store.update(approval.clone())?;
                let result = ConsumeResult {
                    success: false,
                    status: ConsumeStatus::Expired,
                    approval_id: Some(approval.approval_id.clone()),
                };
                let event = approval_event(
                    EventType::IrApprovalExpired,
                    approval.tenant_id.clone(),
                    approval.approval_id.clone(),
                    now,
                );
                Ok((result, event))
            }
            ApprovalStatus::Pending => {
                approval.status = ApprovalStatus::Consumed;
                approval.consumed_at = Some(now);
                approval.consumed_by = consumed_by;
                self.store.update(approval.clone())?;
                let result = ConsumeResult {
                    success: true,
                    status: ConsumeStatus::Consumed,
                    approval_id: Some(approval.approval_id.clone()),
                };
                let event = approval_event(
                    EventType::IrApprovalConsumed,
                    approval.tenant_id.clone(),
                    approval.approval_id.clone(),
                    now,
                );
                Ok((result, event))
            }
        }
    }

    /// Looks up an approval by id, lazily transitioning it to `Expired` on
    /// read if its TTL has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] on a backend failure.
    pub fn get(&self, approval_id: &ApprovalId) -> Result<Option<Approval>, LedgerError> {
        let Some(mut approval) = self.store.get(approval_id)? else {
            return Ok(None);
        };
        let now = self.clock.now();
        if approval.status == ApprovalStatus::Pending && approval.is_expired_at(now) {
            approval.status = ApprovalStatus::Expired;
            self.store.update(approval.clone())?;
        }
        Ok(Some(approval))
    }
}

/// Builds the `Invalid` consume disposition and its `ir.approval_invalid` event.
fn invalid_result(tenant_id: TenantId, now: Timestamp) -> (ConsumeResult, Event) {
    let result = ConsumeResult { success: false, status: ConsumeStatus::Invalid, approval_id: None };
    let event =
        Event::new(EventType::IrApprovalInvalid, EventMeta { tenant_id, request_id: None, graph_id: None }, ParamMap::new(), now);
    (result, event)
}

/// Builds an approval-lifecycle event carrying the approval id only.
fn approval_event(event_type: EventType, tenant_id: TenantId, approval_id: ApprovalId, now: Timestamp) -> Event {
    let mut payload = ParamMap::new();
    payload.insert(
        "approval_id".to_string(),
        warden_core::core::value::ParamValue::String(approval_id.as_str().to_string()),
    );
    Event::new(event_type, EventMeta { tenant_id, request_id: None, graph_id: None }, payload, now)
}

/// Adds a whole number of seconds to a timestamp.
fn add_seconds(ts: Timestamp, seconds: i64) -> Timestamp {
    Timestamp::new(ts.as_offset_date_time() + time::Duration::seconds(seconds))
}

/// Base64 URL-safe, no-padding encoding used for raw approval tokens.
fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use warden_core::FixedClock;

    use super::*;
    use crate::store::InMemoryApprovalStore;

    fn ledger_at(unix: i64) -> ApprovalLedger {
        let clock = FixedClock(Timestamp::new(time::OffsetDateTime::from_unix_timestamp(unix).unwrap()));
        ApprovalLedger::new(Arc::new(InMemoryApprovalStore::new()), Arc::new(clock))
    }

    #[test]
    fn create_then_consume_succeeds_once() {
        let ledger = ledger_at(1_000);
        let tenant = TenantId::parse("acme").unwrap();
        let (approval, raw_token, _event) = ledger.create(tenant.clone(), "ha".to_string(), 60, None).unwrap();

        let (first, _) = ledger.consume(&tenant, "ha", &raw_token, None).unwrap();
        assert!(first.success);
        assert_eq!(first.status, ConsumeStatus::Consumed);
        assert_eq!(first.approval_id, Some(approval.approval_id.clone()));

        let (second, _) = ledger.consume(&tenant, "ha", &raw_token, None).unwrap();
        assert!(!second.success);
        assert_eq!(second.status, ConsumeStatus::AlreadyConsumed);
    }

    #[test]
    fn wrong_tenant_is_invalid() {
        let ledger = ledger_at(1_000);
        let tenant = TenantId::parse("acme").unwrap();
        let other = TenantId::parse("globex").unwrap();
        let (_approval, raw_token, _event) = ledger.create(tenant, "ha".to_string(), 60, None).unwrap();
        let (result, _) = ledger.consume(&other, "ha", &raw_token, None).unwrap();
        assert_eq!(result.status, ConsumeStatus::Invalid);
        assert!(!result.success);
    }

    #[test]
    fn token_hash_never_equals_raw_token() {
        let ledger = ledger_at(1_000);
        let tenant = TenantId::parse("acme").unwrap();
        let (approval, raw_token, _event) = ledger.create(tenant, "ha".to_string(), 60, None).unwrap();
        assert_ne!(approval.token_hash, raw_token);
        assert_eq!(approval.token_hash.len(), 64);
    }

    #[test]
    fn expired_token_never_reverts_and_never_consumes() {
        let clock = FixedClock(Timestamp::new(time::OffsetDateTime::from_unix_timestamp(1_000).unwrap()));
        let store = Arc::new(InMemoryApprovalStore::new());
        let ledger = ApprovalLedger::new(store, Arc::new(clock));
        let tenant = TenantId::parse("acme").unwrap();
        let (_approval, raw_token, _event) = ledger.create(tenant.clone(), "ha".to_string(), 10, None).unwrap();

        // Advance past expiry by rebuilding the ledger over the same store with a later clock.
        let later_clock = FixedClock(Timestamp::new(time::OffsetDateTime::from_unix_timestamp(1_100).unwrap()));
        let later_ledger = ApprovalLedger::new(
            Arc::clone(&ledger.store),
            Arc::new(later_clock),
        );
        let (result, _) = later_ledger.consume(&tenant, "ha", &raw_token, None).unwrap();
        assert_eq!(result.status, ConsumeStatus::Expired);
        assert!(!result.success);

        let (again, _) = later_ledger.consume(&tenant, "ha", &raw_token, None).unwrap();
        assert_eq!(again.status, ConsumeStatus::Expired);
        assert!(!again.success);
    }
}
