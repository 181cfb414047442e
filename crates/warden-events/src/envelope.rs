// crates/warden-events/src/envelope.rs
// ============================================================================
// Module: Event Envelope
// Description: Transport-level wrapper around warden_core::Event carrying the
//              wire fields the core audit model deliberately omits (§3/§4.I).
// Dependencies: serde, warden-core
// ============================================================================

//! ## Overview
//! [`warden_core::Event`] is the audit-only record every pure component
//! emits: it has no opinion on delivery. The event stream adds the fields a
//! transport needs on top of it — `source`/`target` routing, `actor_id`/
//! `correlation_id`/`mission_id`/`task_id` correlation, a `severity`, and the
//! `schema_version`/`producer`/`source_module` triple — without touching the
//! core type four other crates already build and test against. A consumer
//! reading an [`Envelope`] with no `envelope_meta` on the wire gets
//! `schema_version=1, producer="legacy", source_module="unknown"` rather
//! than a deserialize failure, matching the backward-compatibility rule
//! every producer in this lineage has always honored.

use serde::Deserialize;
use serde::Serialize;
use warden_core::Event;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity carried alongside an event, independent of its audit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no action expected.
    Info,
    /// Worth surfacing but not actionable on its own.
    Warning,
    /// An operation failed.
    Error,
    /// Requires immediate operator attention.
    Critical,
}

// ============================================================================
// SECTION: Envelope Meta
// ============================================================================

/// Producer-identifying metadata distinct from the event's own audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Wire schema version for the envelope shape itself.
    pub schema_version: u32,
    /// Name of the component that produced the event.
    pub producer: String,
    /// Module within the producer that raised it.
    pub source_module: String,
}

impl EnvelopeMeta {
    /// Builds meta for a freshly produced envelope.
    #[must_use]
    pub fn new(producer: impl Into<String>, source_module: impl Into<String>) -> Self {
        Self { schema_version: 1, producer: producer.into(), source_module: source_module.into() }
    }
}

impl Default for EnvelopeMeta {
    /// Backward-compatibility default applied when a wire envelope omits
    /// `envelope_meta` entirely (§4.I: "missing meta as schema_version=1,
    /// producer=legacy").
    fn default() -> Self {
        Self { schema_version: 1, producer: "legacy".to_string(), source_module: "unknown".to_string() }
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// A published event plus the transport fields the core model omits.
///
/// # Invariants
/// - `stream_message_id` is assigned by the broker on publish and is the
///   only field consumers may use for deduplication; `event.id` never is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The underlying audit event.
    pub event: Event,
    /// Component or agent that produced the event.
    pub source: String,
    /// Direct-addressed recipient, when this is not a fan-out event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Human or automated actor responsible for the triggering action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Correlation id threading a chain of related events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Mission (top-level business intent) this event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
    /// Task (graph node) this event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Severity of the event, when meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Producer metadata, defaulted for backward compatibility if absent.
    #[serde(default)]
    pub envelope_meta: EnvelopeMeta,
    /// Broker-assigned delivery id. `None` until published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_message_id: Option<u64>,
}

impl Envelope {
    /// Wraps `event` for publication from `source`, tagging it with fresh
    /// (non-legacy) producer metadata.
    #[must_use]
    pub fn new(event: Event, source: impl Into<String>, producer: impl Into<String>, source_module: impl Into<String>) -> Self {
        Self {
            event,
            source: source.into(),
            target: None,
            actor_id: None,
            correlation_id: None,
            mission_id: None,
            task_id: None,
            severity: None,
            envelope_meta: EnvelopeMeta::new(producer, source_module),
            stream_message_id: None,
        }
    }

    /// Addresses this envelope directly to a named subscriber inbox instead
    /// of routing by event-type prefix.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use time::OffsetDateTime;
    use warden_core::EventMeta;
    use warden_core::EventType;
    use warden_core::ParamMap;
    use warden_core::TenantId;
    use warden_core::Timestamp;

    use super::*;

    fn sample_event() -> Event {
        let meta = EventMeta { tenant_id: TenantId::parse("acme").unwrap(), request_id: None, graph_id: None };
        let now = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        Event::new(EventType::MissionSubmitted, meta, ParamMap::new(), now)
    }

    #[test]
    fn missing_envelope_meta_defaults_to_legacy() {
        let json = serde_json::json!({
            "event": serde_json::to_value(sample_event()).unwrap(),
            "source": "old-producer",
        });
        let envelope: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(envelope.envelope_meta.schema_version, 1);
        assert_eq!(envelope.envelope_meta.producer, "legacy");
        assert_eq!(envelope.envelope_meta.source_module, "unknown");
    }

    #[test]
    fn new_envelope_carries_fresh_producer() {
        let envelope = Envelope::new(sample_event(), "gateway", "warden-events", "broker");
        assert_eq!(envelope.envelope_meta.producer, "warden-events");
        assert!(envelope.stream_message_id.is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let envelope = Envelope::new(sample_event(), "gateway", "warden-events", "broker")
            .with_target("agent-7")
            .with_correlation_id("corr-1")
            .with_severity(Severity::Warning);
        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
