// crates/warden-events/src/consumer.rs
// ============================================================================
// Module: Idempotent Consumer Loop
// Description: Drains a subscriber's batches, classifies handler outcomes,
//              and dedups/acks accordingly (§4.I).
// Dependencies: tokio, warden-core
// ============================================================================

//! ## Overview
//! One pass of [`run_once`] peeks a subscriber's next batch without
//! consuming it, then walks each channel's records in FIFO order: an
//! already-[`ProcessedEvent`] is acked and skipped outright (already durable
//! — safe to advance past); otherwise the handler is invoked and classified.
//! [`HandlerOutcome::Success`] and [`HandlerOutcome::Permanent`] both record
//! a `ProcessedEvent` and ack, since both are terminal for the record
//! (a permanent failure — a schema or contract violation — can never
//! succeed on redelivery, so it would loop forever if left unacked).
//! [`HandlerOutcome::Transient`] leaves the record unacked and stops further
//! processing on *that* channel for this pass, since channels are
//! per-channel FIFO and later records on the same channel must not be
//! delivered out of order ahead of the one that just failed.
//!
//! [`run_forever`] wraps this in a `tokio` task with a `stop()` handle for
//! graceful cancellation: the event stream is the one place in this
//! workspace `tokio` is used, matching the governance path's own "no async
//! runtime" design.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use warden_core::Clock;
use warden_core::EventId;
use warden_core::EventType;
use warden_core::ParamMap;
use warden_core::SubscriberName;

use crate::broker::EventBroker;
use crate::dedup::DedupError;
use crate::dedup::DedupStore;
use crate::dedup::ProcessedEvent;
use crate::envelope::Envelope;

/// Default number of records drained per poll.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default idle wait between polls when a batch comes back empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Disposition a handler reports for one envelope.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// The handler completed its work.
    Success,
    /// A schema or contract violation; redelivery can never succeed.
    Permanent(String),
    /// An infrastructure failure; the record should be redelivered.
    Transient(String),
}

/// Dispatches one envelope to business logic.
pub trait EventHandler: Send + Sync {
    /// Handles `envelope`, returning how the consumer loop should treat it.
    fn handle(&self, envelope: &Envelope) -> HandlerOutcome;
}

/// Errors surfaced from a consumer pass. A dedup-store failure is the only
/// thing that aborts a pass outright; handler outcomes never raise one.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The dedup store failed.
    #[error(transparent)]
    Dedup(#[from] DedupError),
}

/// Runs one drain pass for `subscriber` over `broker`, recording outcomes in
/// `dedup` via `handler`. Returns the number of records acked.
///
/// # Errors
///
/// Returns [`ConsumerError::Dedup`] if the dedup store fails; any records
/// processed before the failure remain acked.
pub fn run_once(
    broker: &dyn EventBroker,
    dedup: &dyn DedupStore,
    handler: &dyn EventHandler,
    subscriber: &SubscriberName,
    clock: &dyn Clock,
    batch_size: usize,
) -> Result<usize, ConsumerError> {
    let batch = broker.peek_batch(subscriber, batch_size);
    let mut acked = 0;
    let mut halted_channels = std::collections::HashSet::new();

    for (channel, (stream_message_id, envelope)) in batch {
        if halted_channels.contains(&channel) {
            continue;
        }

        if dedup.is_processed(subscriber, stream_message_id)? {
            broker.ack(subscriber, &channel, stream_message_id);
            acked += 1;
            continue;
        }

        let event_id = envelope.event.id.clone();
        let event_type = envelope.event.event_type;

        match handler.handle(&envelope) {
            HandlerOutcome::Success => {
                record_and_ack(dedup, broker, subscriber, &channel, stream_message_id, event_id, event_type, clock, ParamMap::new())?;
                acked += 1;
            }
            HandlerOutcome::Permanent(reason) => {
                let mut metadata = ParamMap::new();
                metadata.insert("error".to_string(), warden_core::ParamValue::String(reason));
                record_and_ack(dedup, broker, subscriber, &channel, stream_message_id, event_id, event_type, clock, metadata)?;
                acked += 1;
            }
            HandlerOutcome::Transient(_) => {
                halted_channels.insert(channel);
            }
        }
    }

    Ok(acked)
}

/// Records a `ProcessedEvent` for `(subscriber, stream_message_id)` and acks
/// the record, the shared tail of the success and permanent-failure paths.
#[allow(clippy::too_many_arguments, reason = "internal helper, one call site per outcome kind")]
fn record_and_ack(
    dedup: &dyn DedupStore,
    broker: &dyn EventBroker,
    subscriber: &SubscriberName,
    channel: &crate::channel::Channel,
    stream_message_id: u64,
    event_id: EventId,
    event_type: EventType,
    clock: &dyn Clock,
    metadata: ParamMap,
) -> Result<(), ConsumerError> {
    dedup.mark_processed(ProcessedEvent {
        subscriber: subscriber.clone(),
        stream_message_id,
        event_id,
        event_type,
        processed_at: clock.now(),
        metadata,
    })?;
    broker.ack(subscriber, channel, stream_message_id);
    Ok(())
}

/// A cooperative stop signal for [`run_forever`].
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates a fresh, unsignaled stop handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the consumer loop stop after its current pass.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether [`StopHandle::stop`] has been called.
    fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs [`run_once`] in a loop until `stop` is signaled, sleeping
/// `poll_interval` between empty passes.
///
/// # Errors
///
/// Returns [`ConsumerError::Dedup`] if a pass's dedup store fails; the loop
/// exits immediately rather than spinning on a broken store.
pub async fn run_forever(
    broker: Arc<dyn EventBroker>,
    dedup: Arc<dyn DedupStore>,
    handler: Arc<dyn EventHandler>,
    subscriber: SubscriberName,
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    batch_size: usize,
    poll_interval: Duration,
) -> Result<(), ConsumerError> {
    while !stop.is_stopped() {
        let acked = run_once(broker.as_ref(), dedup.as_ref(), handler.as_ref(), &subscriber, clock.as_ref(), batch_size)?;
        if acked == 0 {
            tokio::time::sleep(poll_interval).await;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::sync::Mutex as StdMutex;

    use time::OffsetDateTime;
    use warden_core::EventMeta;
    use warden_core::FixedClock;
    use warden_core::TenantId;
    use warden_core::Timestamp;

    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::channel::Channel;
    use crate::dedup::InMemoryDedupStore;

    fn envelope(event_type: EventType) -> Envelope {
        let meta = EventMeta { tenant_id: TenantId::parse("acme").unwrap(), request_id: None, graph_id: None };
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_000).unwrap());
        let event = warden_core::Event::new(event_type, meta, ParamMap::new(), now);
        Envelope::new(event, "gateway", "warden-events", "broker")
    }

    struct ScriptedHandler {
        outcomes: StdMutex<Vec<HandlerOutcome>>,
    }

    impl EventHandler for ScriptedHandler {
        fn handle(&self, _envelope: &Envelope) -> HandlerOutcome {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                HandlerOutcome::Success
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Timestamp::new(OffsetDateTime::from_unix_timestamp(2_000).unwrap()))
    }

    #[test]
    fn success_marks_processed_and_acks() {
        let broker = InMemoryBroker::default();
        let dedup = InMemoryDedupStore::new();
        let sub = SubscriberName::new("s1");
        broker.publish(envelope(EventType::TaskStarted));
        broker.subscribe(sub.clone(), vec![Channel::Tasks]);
        let handler = ScriptedHandler { outcomes: StdMutex::new(vec![]) };

        let acked = run_once(&broker, &dedup, &handler, &sub, &clock(), 10).unwrap();
        assert_eq!(acked, 1);
        assert!(dedup.is_processed(&sub, 1).unwrap());
        assert!(broker.peek_batch(&sub, 10).is_empty());
    }

    #[test]
    fn already_processed_record_is_skipped_and_acked() {
        let broker = InMemoryBroker::default();
        let dedup = InMemoryDedupStore::new();
        let sub = SubscriberName::new("s1");
        broker.publish(envelope(EventType::TaskStarted));
        broker.subscribe(sub.clone(), vec![Channel::Tasks]);
        dedup
            .mark_processed(ProcessedEvent {
                subscriber: sub.clone(),
                stream_message_id: 1,
                event_id: EventId::generate("evt"),
                event_type: EventType::TaskStarted,
                processed_at: clock().now(),
                metadata: ParamMap::new(),
            })
            .unwrap();
        let handler = ScriptedHandler { outcomes: StdMutex::new(vec![HandlerOutcome::Transient("should not be called".to_string())]) };

        let acked = run_once(&broker, &dedup, &handler, &sub, &clock(), 10).unwrap();
        assert_eq!(acked, 1);
        assert!(broker.peek_batch(&sub, 10).is_empty());
    }

    #[test]
    fn permanent_failure_acks_and_records() {
        let broker = InMemoryBroker::default();
        let dedup = InMemoryDedupStore::new();
        let sub = SubscriberName::new("s1");
        broker.publish(envelope(EventType::TaskStarted));
        broker.subscribe(sub.clone(), vec![Channel::Tasks]);
        let handler = ScriptedHandler { outcomes: StdMutex::new(vec![HandlerOutcome::Permanent("bad schema".to_string())]) };

        let acked = run_once(&broker, &dedup, &handler, &sub, &clock(), 10).unwrap();
        assert_eq!(acked, 1);
        assert!(dedup.is_processed(&sub, 1).unwrap());
        assert!(broker.peek_batch(&sub, 10).is_empty());
    }

    #[test]
    fn transient_failure_leaves_record_for_redelivery() {
        let broker = InMemoryBroker::default();
        let dedup = InMemoryDedupStore::new();
        let sub = SubscriberName::new("s1");
        broker.publish(envelope(EventType::TaskStarted));
        broker.subscribe(sub.clone(), vec![Channel::Tasks]);
        let handler = ScriptedHandler { outcomes: StdMutex::new(vec![HandlerOutcome::Transient("db down".to_string())]) };

        let acked = run_once(&broker, &dedup, &handler, &sub, &clock(), 10).unwrap();
        assert_eq!(acked, 0);
        assert!(!dedup.is_processed(&sub, 1).unwrap());
        assert_eq!(broker.peek_batch(&sub, 10).len(), 1);
    }

    #[test]
    fn transient_failure_halts_only_its_own_channel() {
        let broker = InMemoryBroker::default();
        let dedup = InMemoryDedupStore::new();
        let sub = SubscriberName::new("s1");
        broker.publish(envelope(EventType::TaskStarted));
        broker.publish(envelope(EventType::EthicsEscalated));
        broker.subscribe(sub.clone(), vec![Channel::Tasks, Channel::Ethics]);
        let handler = ScriptedHandler {
            outcomes: StdMutex::new(vec![HandlerOutcome::Transient("db down".to_string()), HandlerOutcome::Success]),
        };

        let acked = run_once(&broker, &dedup, &handler, &sub, &clock(), 10).unwrap();
        assert_eq!(acked, 1);
        let remaining = broker.peek_batch(&sub, 10);
        assert_eq!(remaining.len(), 1);
    }
}
