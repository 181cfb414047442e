// crates/warden-events/src/dedup.rs
// ============================================================================
// Module: Idempotent Consumer Dedup Store
// Description: Pluggable storage for ProcessedEvent records keyed by
//              (subscriber, stream_message_id) (§3/§4.I).
// Dependencies: std::sync, warden-core
// ============================================================================

//! ## Overview
//! The dedup table is what makes at-least-once delivery look like
//! exactly-once to a handler: before dispatch, the consumer loop checks
//! whether `(subscriber, stream_message_id)` has already been recorded, and
//! skips (but still acks) if so. [`InMemoryDedupStore`] mirrors
//! `warden-approvals`'s mutex-guarded `HashMap` store shape; the durable
//! backend lives in `warden-store-sqlite`, implementing the same trait over
//! a table whose primary key is the same pair.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use warden_core::EventId;
use warden_core::EventType;
use warden_core::ParamMap;
use warden_core::SubscriberName;
use warden_core::Timestamp;

/// A record of one event having been durably processed by one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    /// Subscriber that processed the event.
    pub subscriber: SubscriberName,
    /// Broker-assigned delivery id this record dedups on.
    pub stream_message_id: u64,
    /// Audit identity of the event processed, for diagnostics only.
    pub event_id: EventId,
    /// Type of the event processed.
    pub event_type: EventType,
    /// When processing completed.
    pub processed_at: Timestamp,
    /// Handler-supplied diagnostic metadata.
    pub metadata: ParamMap,
}

/// Errors raised by a [`DedupStore`] implementation.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The backing store failed.
    #[error("dedup store backend error: {0}")]
    Backend(String),
}

/// Pluggable storage contract for idempotent-consumer dedup records.
///
/// # Invariants
/// - Primary key is `(subscriber, stream_message_id)`; a second
///   `mark_processed` for an already-recorded key is a no-op, never an
///   error, so a redelivered-but-already-handled record cannot fail dedup.
pub trait DedupStore: Send + Sync {
    /// Returns whether `(subscriber, stream_message_id)` has already been
    /// recorded as processed.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError::Backend`] on a backend failure.
    fn is_processed(&self, subscriber: &SubscriberName, stream_message_id: u64) -> Result<bool, DedupError>;

    /// Records `record` as processed, tolerating a duplicate insert for the
    /// same key.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError::Backend`] on a backend failure.
    fn mark_processed(&self, record: ProcessedEvent) -> Result<(), DedupError>;
}

/// In-process [`DedupStore`] backed by a mutex-guarded `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryDedupStore {
    /// Processed records keyed by `(subscriber, stream_message_id)`.
    inner: Mutex<HashMap<(SubscriberName, u64), ProcessedEvent>>,
}

impl InMemoryDedupStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupStore for InMemoryDedupStore {
    fn is_processed(&self, subscriber: &SubscriberName, stream_message_id: u64) -> Result<bool, DedupError> {
        let inner = self.inner.lock().map_err(|_| DedupError::Backend("lock poisoned".to_string()))?;
        Ok(inner.contains_key(&(subscriber.clone(), stream_message_id)))
    }

    fn mark_processed(&self, record: ProcessedEvent) -> Result<(), DedupError> {
        let mut inner = self.inner.lock().map_err(|_| DedupError::Backend("lock poisoned".to_string()))?;
        inner.entry((record.subscriber.clone(), record.stream_message_id)).or_insert(record);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn sample(subscriber: &str, stream_message_id: u64) -> ProcessedEvent {
        ProcessedEvent {
            subscriber: SubscriberName::new(subscriber),
            stream_message_id,
            event_id: EventId::generate("evt"),
            event_type: EventType::TaskStarted,
            processed_at: Timestamp::new(OffsetDateTime::from_unix_timestamp(1_000).unwrap()),
            metadata: ParamMap::new(),
        }
    }

    #[test]
    fn unknown_key_is_not_processed() {
        let store = InMemoryDedupStore::new();
        assert!(!store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn marked_key_is_processed() {
        let store = InMemoryDedupStore::new();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn duplicate_mark_is_tolerated() {
        let store = InMemoryDedupStore::new();
        store.mark_processed(sample("s1", 1)).unwrap();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn distinct_subscribers_are_independent() {
        let store = InMemoryDedupStore::new();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(!store.is_processed(&SubscriberName::new("s2"), 1).unwrap());
    }
}
