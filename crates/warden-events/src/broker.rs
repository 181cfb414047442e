// crates/warden-events/src/broker.rs
// ============================================================================
// Module: Event Broker
// Description: Pluggable publish/subscribe contract plus an in-process,
//              ring-buffered implementation (§4.I).
// Dependencies: std::sync, time, warden-core
// ============================================================================

//! ## Overview
//! [`EventBroker`] is the abstract contract: `publish` appends to the
//! broadcast log and routes to a type-prefix or direct-target channel;
//! `subscribe` registers a durable per-channel read cursor for a named
//! subscriber; `peek_batch` returns the next unacked records for a
//! subscriber without advancing its cursor, so a handler failure can leave
//! a record for redelivery; `ack` advances the cursor past one record once
//! it has been durably processed. [`InMemoryBroker`] bounds every channel to
//! `max_len` records (default 10 000, mirroring the original's `XADD ...
//! MAXLEN`) and keeps a `(EventType, Date) -> count` rollup so "how many
//! events of type X were published on day Y" never requires scanning the
//! full log.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use time::Date;
use warden_core::EventType;
use warden_core::SubscriberName;

use crate::channel::Channel;
use crate::channel::destination_channel;
use crate::envelope::Envelope;

/// Default retention cap per channel, matching the original's `MAXLEN`.
pub const DEFAULT_MAX_LEN: usize = 10_000;

/// A record stored on a channel: its broker-assigned id and its envelope.
pub type Delivery = (u64, Envelope);

/// Pluggable publish/subscribe contract for the event stream.
///
/// # Invariants
/// - `publish` never returns an error to the caller; backend failures are
///   reported as `false` and logged, matching "publish failures are never
///   propagated to business logic" (§4.I).
pub trait EventBroker: Send + Sync {
    /// Publishes `envelope`, assigning it a stream message id and routing it
    /// to the broadcast log plus its destination channel. Returns `true` on
    /// success; a `false` return means the publish was dropped and logged,
    /// never that the caller should retry synchronously.
    fn publish(&self, envelope: Envelope) -> bool;

    /// Registers `subscriber` as durably interested in `channels`. A
    /// channel's cursor for this subscriber starts at the beginning of the
    /// retained log if this is a new subscription, left untouched if it
    /// already exists.
    fn subscribe(&self, subscriber: SubscriberName, channels: Vec<Channel>);

    /// Returns up to `max` unacked records across `subscriber`'s subscribed
    /// channels, in per-channel FIFO order. Does not advance any cursor.
    fn peek_batch(&self, subscriber: &SubscriberName, max: usize) -> Vec<(Channel, Delivery)>;

    /// Advances `subscriber`'s cursor on `channel` past `stream_message_id`.
    /// A no-op if the cursor has already moved past it.
    fn ack(&self, subscriber: &SubscriberName, channel: &Channel, stream_message_id: u64);

    /// Returns how many events of `event_type` were published on `day`.
    fn daily_count(&self, event_type: EventType, day: Date) -> u64;
}

#[derive(Default)]
struct Inner {
    /// Per-channel ring buffer of undelivered/unacked records.
    channels: HashMap<Channel, VecDeque<Delivery>>,
    /// Last acked `stream_message_id` per `(subscriber, channel)`.
    cursors: HashMap<(SubscriberName, Channel), u64>,
    /// Channels each subscriber is registered against.
    subscriptions: HashMap<SubscriberName, Vec<Channel>>,
    /// Publish counts for the daily roll-up, keyed by type and UTC day.
    daily_counts: BTreeMap<(EventType, Date), u64>,
}

/// In-process [`EventBroker`] backed by a mutex-guarded ring buffer per
/// channel.
pub struct InMemoryBroker {
    /// Retention bound applied per channel (§4.I).
    max_len: usize,
    /// Source of monotonic `stream_message_id`s.
    next_id: AtomicU64,
    /// Guarded queues, cursors, and counters.
    inner: Mutex<Inner>,
}

impl InMemoryBroker {
    /// Creates an empty broker retaining up to `max_len` records per channel.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self { max_len, next_id: AtomicU64::new(1), inner: Mutex::new(Inner::default()) }
    }

    /// Appends `delivery` to `channel`'s queue, trimming the oldest entries
    /// once the queue exceeds `max_len` (§4.I retention bound).
    fn push(inner: &mut Inner, max_len: usize, channel: Channel, delivery: Delivery) {
        let queue = inner.channels.entry(channel).or_default();
        queue.push_back(delivery);
        while queue.len() > max_len {
            queue.pop_front();
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl EventBroker for InMemoryBroker {
    fn publish(&self, mut envelope: Envelope) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("event broker lock poisoned, dropping publish");
            return false;
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        envelope.stream_message_id = Some(id);

        let event_type = envelope.event.event_type;
        let day = envelope.event.occurred_at.as_offset_date_time().date();
        *inner.daily_counts.entry((event_type, day)).or_insert(0) += 1;

        let destination = destination_channel(event_type, envelope.target.as_deref());
        Self::push(&mut inner, self.max_len, Channel::Broadcast, (id, envelope.clone()));
        if destination != Channel::Broadcast {
            Self::push(&mut inner, self.max_len, destination, (id, envelope));
        }
        true
    }

    fn subscribe(&self, subscriber: SubscriberName, channels: Vec<Channel>) {
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("event broker lock poisoned, dropping subscribe");
            return;
        };
        for channel in &channels {
            inner.cursors.entry((subscriber.clone(), channel.clone())).or_insert(0);
        }
        inner.subscriptions.insert(subscriber, channels);
    }

    fn peek_batch(&self, subscriber: &SubscriberName, max: usize) -> Vec<(Channel, Delivery)> {
        let Ok(inner) = self.inner.lock() else {
            tracing::error!("event broker lock poisoned, returning empty batch");
            return Vec::new();
        };
        let Some(channels) = inner.subscriptions.get(subscriber) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for channel in channels {
            let cursor = inner.cursors.get(&(subscriber.clone(), channel.clone())).copied().unwrap_or(0);
            let Some(queue) = inner.channels.get(channel) else { continue };
            for (id, envelope) in queue {
                if out.len() >= max {
                    break;
                }
                if *id >= cursor {
                    out.push((channel.clone(), (*id, envelope.clone())));
                }
            }
        }
        out
    }

    fn ack(&self, subscriber: &SubscriberName, channel: &Channel, stream_message_id: u64) {
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("event broker lock poisoned, dropping ack");
            return;
        };
        let cursor = inner.cursors.entry((subscriber.clone(), channel.clone())).or_insert(0);
        if stream_message_id + 1 > *cursor {
            *cursor = stream_message_id + 1;
        }
    }

    fn daily_count(&self, event_type: EventType, day: Date) -> u64 {
        let Ok(inner) = self.inner.lock() else {
            tracing::error!("event broker lock poisoned, reporting zero count");
            return 0;
        };
        inner.daily_counts.get(&(event_type, day)).copied().unwrap_or(0)
    }
}
