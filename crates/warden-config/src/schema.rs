// crates/warden-config/src/schema.rs
// ============================================================================
// Module: Config Schema
// Description: Machine-readable description of the GovernanceConfig TOML
//              shape, for external tooling and doc generation.
// Purpose: Give operators and tooling a single source of truth for field
//          names, defaults, and bounds without re-deriving them from source.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `config_schema` builds a plain JSON document describing each TOML
//! section and field. It is not a JSON-Schema validator: [`GovernanceConfig`]
//! is already validated directly by `serde` (`deny_unknown_fields`) and
//! [`GovernanceConfig::validate`](crate::config::GovernanceConfig::validate);
//! this is read-only documentation metadata consumed by [`crate::docs`].

use serde_json::Value;
use serde_json::json;

use crate::config::DEFAULT_APPROVAL_CLEANUP_INTERVAL_S;
use crate::config::DEFAULT_APPROVAL_TTL_S;
use crate::config::DEFAULT_EVENT_STREAM_BATCH_SIZE;
use crate::config::DEFAULT_EVENT_STREAM_MAX_LEN;
use crate::config::DEFAULT_EVENT_STREAM_POLL_INTERVAL_MS;
use crate::config::DEFAULT_NODE_APPROVAL_TTL_S;
use crate::config::DEFAULT_SOFT_DEGRADATION_THRESHOLD;
use crate::config::MAX_APPROVAL_TTL_S;
use crate::config::MIN_APPROVAL_TTL_S;
use warden_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use warden_store_sqlite::DEFAULT_READ_POOL_SIZE;
use warden_store_sqlite::DEFAULT_WRITER_QUEUE_CAPACITY;

/// Builds the full configuration schema document.
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "title": "GovernanceConfig",
        "description": "Workspace-wide governance kernel configuration.",
        "sections": {
            "budget": budget_schema(),
            "approval": approval_schema(),
            "governor": governor_schema(),
            "store": store_schema(),
            "event_stream": event_stream_schema(),
        },
    })
}

/// Schema fragment describing the `[budget]` section.
fn budget_schema() -> Value {
    json!({
        "description": "Default run budget applied when a call site supplies none.",
        "fields": {
            "max_steps": {"type": "integer", "nullable": true, "default": null},
            "steps_limit_type": {"type": "string", "enum": ["soft", "hard"], "default": "hard"},
            "max_duration_seconds": {"type": "integer", "nullable": true, "default": null},
            "duration_limit_type": {"type": "string", "enum": ["soft", "hard"], "default": "hard"},
            "max_external_calls": {"type": "integer", "nullable": true, "default": null},
            "external_calls_limit_type": {"type": "string", "enum": ["soft", "hard"], "default": "hard"},
        },
    })
}

/// Schema fragment describing the `[approval]` section.
fn approval_schema() -> Value {
    json!({
        "description": "Approval ledger TTL and cleanup policy.",
        "fields": {
            "default_ttl_seconds": {
                "type": "integer",
                "minimum": MIN_APPROVAL_TTL_S,
                "maximum": MAX_APPROVAL_TTL_S,
                "default": DEFAULT_APPROVAL_TTL_S,
            },
            "cleanup_interval_seconds": {
                "type": "integer",
                "minimum": 1,
                "default": DEFAULT_APPROVAL_CLEANUP_INTERVAL_S,
            },
        },
    })
}

/// Schema fragment describing the `[governor]` section.
fn governor_schema() -> Value {
    json!({
        "description": "Execution governor soft-degradation and node-approval policy.",
        "fields": {
            "dry_run_respects_limits": {"type": "boolean", "default": false},
            "allow_soft_degradation": {"type": "boolean", "default": false},
            "soft_degradation_threshold": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "default": DEFAULT_SOFT_DEGRADATION_THRESHOLD,
            },
            "critical_nodes": {"type": "array", "items": "string", "default": []},
            "skip_on_soft_limit": {"type": "array", "items": "string", "default": []},
            "required_approval_nodes": {"type": "array", "items": "string", "default": []},
            "required_approval_node_types": {"type": "array", "items": "string", "default": []},
            "node_approval_ttl_s": {
                "type": "integer",
                "minimum": MIN_APPROVAL_TTL_S,
                "default": DEFAULT_NODE_APPROVAL_TTL_S,
            },
        },
    })
}

/// Schema fragment describing the `[store]` section.
fn store_schema() -> Value {
    json!({
        "description": "Durable store backend selection for the approval ledger and event-stream dedup table.",
        "fields": {
            "backend": {"type": "string", "enum": ["in_memory", "sqlite"], "default": "in_memory"},
            "sqlite": {
                "type": "object",
                "required_when": "backend = \"sqlite\"",
                "fields": {
                    "path": {"type": "string"},
                    "busy_timeout_ms": {"type": "integer", "default": DEFAULT_BUSY_TIMEOUT_MS},
                    "read_pool_size": {"type": "integer", "default": DEFAULT_READ_POOL_SIZE},
                    "writer_queue_capacity": {
                        "type": "integer",
                        "default": DEFAULT_WRITER_QUEUE_CAPACITY,
                    },
                },
            },
        },
    })
}

/// Schema fragment describing the `[event_stream]` section.
fn event_stream_schema() -> Value {
    json!({
        "description": "Event stream retention and consumer batching.",
        "fields": {
            "max_len": {"type": "integer", "minimum": 1, "default": DEFAULT_EVENT_STREAM_MAX_LEN},
            "batch_size": {
                "type": "integer",
                "minimum": 1,
                "maximum": "event_stream.max_len",
                "default": DEFAULT_EVENT_STREAM_BATCH_SIZE,
            },
            "poll_interval_ms": {"type": "integer", "minimum": 1, "default": DEFAULT_EVENT_STREAM_POLL_INTERVAL_MS},
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn schema_has_all_top_level_sections() {
        let schema = config_schema();
        let sections = schema.get("sections").unwrap();
        for key in ["budget", "approval", "governor", "store", "event_stream"] {
            assert!(sections.get(key).is_some(), "missing section {key}");
        }
    }

    #[test]
    fn schema_is_deterministic() {
        assert_eq!(config_schema(), config_schema());
    }
}
