// crates/warden-events/src/lib.rs
// ============================================================================
// Crate: warden-events
// Description: Ordered event stream with type-prefix/target fan-out and an
//              idempotent consumer loop over a pluggable dedup store (§4.I).
// ============================================================================

//! # warden-events
//!
//! Every governance decision in the workspace is recorded as a
//! [`warden_core::Event`] and handed to this crate for delivery:
//!
//! - [`envelope`] — [`Envelope`], the transport wrapper carrying the
//!   routing and correlation fields the core audit model omits.
//! - [`channel`] — maps an event type (or an explicit target) to its
//!   fan-out [`Channel`].
//! - [`broker`] — the pluggable [`EventBroker`] contract plus
//!   [`InMemoryBroker`], a ring-buffered in-process implementation.
//! - [`dedup`] — the pluggable [`DedupStore`] contract plus
//!   [`InMemoryDedupStore`], keyed on `(subscriber, stream_message_id)`.
//! - [`consumer`] — [`run_once`]/[`run_forever`], the idempotent drain loop
//!   that classifies handler outcomes as success, permanent, or transient.
//!
//! `event.id` is never a dedup key; every consumer in this crate dedups on
//! the broker-assigned `stream_message_id` carried in the delivery tuple.

pub mod broker;
pub mod channel;
pub mod consumer;
pub mod dedup;
pub mod envelope;

pub use broker::DEFAULT_MAX_LEN;
pub use broker::Delivery;
pub use broker::EventBroker;
pub use broker::InMemoryBroker;
pub use channel::Channel;
pub use channel::destination_channel;
pub use channel::prefix_channel;
pub use consumer::ConsumerError;
pub use consumer::DEFAULT_BATCH_SIZE;
pub use consumer::DEFAULT_POLL_INTERVAL;
pub use consumer::EventHandler;
pub use consumer::HandlerOutcome;
pub use consumer::StopHandle;
pub use consumer::run_forever;
pub use consumer::run_once;
pub use dedup::DedupError;
pub use dedup::DedupStore;
pub use dedup::InMemoryDedupStore;
pub use dedup::ProcessedEvent;
pub use envelope::Envelope;
pub use envelope::EnvelopeMeta;
pub use envelope::Severity;
