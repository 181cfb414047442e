//! Schema shape tests for warden-config.
// crates/warden-config/tests/schema_validation.rs
// =============================================================================
// Module: Config Schema Tests
// Description: Validate the generated configuration schema document.
// Purpose: Catch drift between GovernanceConfig's fields and its schema.
// =============================================================================

use warden_config::config_schema;

#[test]
fn schema_lists_every_top_level_section() {
    let schema = config_schema();
    let sections = schema.get("sections").expect("schema has a sections object");
    for name in ["budget", "approval", "governor", "store", "event_stream"] {
        assert!(sections.get(name).is_some(), "schema missing section {name}");
    }
}

#[test]
fn approval_section_declares_ttl_bounds() {
    let schema = config_schema();
    let field = schema
        .pointer("/sections/approval/fields/default_ttl_seconds")
        .expect("approval.default_ttl_seconds documented");
    assert_eq!(field.get("minimum").and_then(serde_json::Value::as_i64), Some(1));
    assert_eq!(field.get("maximum").and_then(serde_json::Value::as_i64), Some(7 * 24 * 3_600));
}

#[test]
fn governor_section_declares_threshold_default() {
    let schema = config_schema();
    let field = schema
        .pointer("/sections/governor/fields/soft_degradation_threshold")
        .expect("governor.soft_degradation_threshold documented");
    assert_eq!(field.get("default").and_then(serde_json::Value::as_f64), Some(0.8));
}

#[test]
fn store_section_documents_sqlite_backend() {
    let schema = config_schema();
    let backends =
        schema.pointer("/sections/store/fields/backend/enum").expect("store.backend enum documented");
    let values: Vec<&str> =
        backends.as_array().expect("enum is an array").iter().filter_map(serde_json::Value::as_str).collect();
    assert_eq!(values, vec!["in_memory", "sqlite"]);
}

#[test]
fn schema_is_stable_across_calls() {
    assert_eq!(config_schema(), config_schema());
}
