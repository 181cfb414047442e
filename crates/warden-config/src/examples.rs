// crates/warden-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs, tooling, and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A single canonical example keeps schema, docs, and tests honest against
//! the same document.

/// Returns a canonical example `warden.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[budget]
max_steps = 500
steps_limit_type = "hard"
max_duration_seconds = 3600
duration_limit_type = "hard"
max_external_calls = 100
external_calls_limit_type = "soft"

[approval]
default_ttl_seconds = 900
cleanup_interval_seconds = 60

[governor]
dry_run_respects_limits = false
allow_soft_degradation = true
soft_degradation_threshold = 0.8
critical_nodes = []
skip_on_soft_limit = ["notify"]
required_approval_nodes = []
required_approval_node_types = ["deploy"]
node_approval_ttl_s = 900

[store]
backend = "in_memory"

[event_stream]
max_len = 10000
batch_size = 64
poll_interval_ms = 100
"#,
    )
}
