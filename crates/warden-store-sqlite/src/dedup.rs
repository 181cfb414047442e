// crates/warden-store-sqlite/src/dedup.rs
// ============================================================================
// Module: SQLite Dedup Store
// Description: Durable DedupStore backend (§4.I) over SQLite WAL, keyed on
//              (subscriber, stream_message_id).
// Dependencies: rusqlite, warden-core, warden-events
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use warden_core::EventId;
use warden_core::EventType;
use warden_core::SubscriberName;
use warden_core::Timestamp;
use warden_events::DedupError;
use warden_events::DedupStore;
use warden_events::ProcessedEvent;

use crate::SqliteStore;
use crate::error::SqliteStoreError;
use crate::writer::RecordRow;
use crate::writer::WriterJob;

impl DedupStore for SqliteStore {
    fn is_processed(&self, subscriber: &SubscriberName, stream_message_id: u64) -> Result<bool, DedupError> {
        let connection = self.read_connection();
        let guard = connection.lock().map_err(|_| DedupError::Backend("read mutex poisoned".to_string()))?;
        let exists: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM processed_events WHERE subscriber = ?1 AND stream_message_id = ?2",
                params![subscriber.as_str(), i64::try_from(stream_message_id).unwrap_or(i64::MAX)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::from(err).to_string())
            .map_err(DedupError::Backend)?;
        Ok(exists.is_some())
    }

    fn mark_processed(&self, record: ProcessedEvent) -> Result<(), DedupError> {
        self.writer.submit(WriterJob::DedupMark(record)).map_err(DedupError::from)
    }
}

impl SqliteStore {
    /// Loads a stored processed-event record, for diagnostics and tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on a backend failure or a corrupt row.
    pub fn get_processed(
        &self,
        subscriber: &SubscriberName,
        stream_message_id: u64,
    ) -> Result<Option<ProcessedEvent>, SqliteStoreError> {
        let connection = self.read_connection();
        let guard = connection.lock().map_err(|_| SqliteStoreError::Db("read mutex poisoned".to_string()))?;
        let json: Option<String> = guard
            .query_row(
                "SELECT record_json FROM processed_events WHERE subscriber = ?1 AND stream_message_id = ?2",
                params![subscriber.as_str(), i64::try_from(stream_message_id).unwrap_or(i64::MAX)],
                |row| row.get(0),
            )
            .optional()?;
        drop(guard);
        let Some(json) = json else {
            return Ok(None);
        };
        let row: RecordRow = serde_json::from_str(&json).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok(Some(ProcessedEvent {
            subscriber: SubscriberName::new(row.subscriber),
            stream_message_id: row.stream_message_id,
            event_id: EventId::new(row.event_id),
            event_type: row.event_type,
            processed_at: row.processed_at,
            metadata: row.metadata,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;
    use warden_core::ParamMap;

    use super::*;
    use crate::SqliteStoreConfig;

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

    fn store() -> SqliteStore {
        let dir = tempfile::tempdir().unwrap();
        SqliteStore::open(SqliteStoreConfig::new(dir.path().join("store.db"))).unwrap()
    }

    #[test]
    fn unknown_key_is_not_processed() {
        let store = store();
        assert!(!store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn marked_key_is_processed() {
        let store = store();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn duplicate_mark_is_tolerated() {
        let store = store();
        store.mark_processed(sample("s1", 1)).unwrap();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(store.is_processed(&SubscriberName::new("s1"), 1).unwrap());
    }

    #[test]
    fn distinct_subscribers_are_independent() {
        let store = store();
        store.mark_processed(sample("s1", 1)).unwrap();
        assert!(!store.is_processed(&SubscriberName::new("s2"), 1).unwrap());
    }
}
