// crates/warden-config/src/docs.rs
// ============================================================================
// Module: Config Docs
// Description: Markdown documentation generation for GovernanceConfig,
//              rendered directly from the schema so docs cannot drift from
//              the field list they describe.
// Purpose: Give operators a readable reference alongside the example TOML.
// Dependencies: std, serde_json
// ============================================================================

//! ## Overview
//! [`config_docs_markdown`] renders one section per TOML table, each with
//! its description and a field table. [`write_config_docs`] and
//! [`verify_config_docs`] let a build step regenerate the file and catch
//! drift between the schema and a checked-in copy, mirroring the teacher's
//! own docs/schema consistency check.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::schema::config_schema;

/// Errors raised generating or verifying configuration docs.
#[derive(Debug, Error)]
pub enum DocsError {
    /// I/O failure reading or writing the docs file.
    #[error("docs io error: {0}")]
    Io(String),
    /// The on-disk docs file does not match freshly rendered content.
    #[error("config docs are stale; regenerate with write_config_docs")]
    Drift,
}

const SECTION_ORDER: [&str; 5] = ["budget", "approval", "governor", "store", "event_stream"];

/// Renders the full configuration reference as Markdown.
///
/// # Panics
///
/// Panics if the schema produced by [`config_schema`] is malformed, which
/// would indicate a bug in this crate rather than bad input.
#[must_use]
#[allow(
    clippy::missing_panics_doc,
    clippy::expect_used,
    reason = "schema shape is an internal invariant, not caller input"
)]
pub fn config_docs_markdown() -> String {
    let schema = config_schema();
    let sections = schema.get("sections").expect("schema always has a sections object");

    let mut out = String::new();
    out.push_str("# Governance Kernel Configuration\n\n");
    out.push_str(
        "Generated reference for `warden.toml`. Regenerate with `write_config_docs` \
         whenever the configuration model changes.\n\n",
    );

    for name in SECTION_ORDER {
        let section = sections.get(name).expect("every SECTION_ORDER entry exists in the schema");
        out.push_str(&format!("## [{name}]\n\n"));
        if let Some(description) = section.get("description").and_then(|value| value.as_str()) {
            out.push_str(description);
            out.push_str("\n\n");
        }
        out.push_str("| Field | Type | Default |\n");
        out.push_str("|---|---|---|\n");
        if let Some(fields) = section.get("fields").and_then(|value| value.as_object()) {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            for key in keys {
                let field = &fields[key];
                let type_name = field.get("type").and_then(|value| value.as_str()).unwrap_or("unknown");
                let default = field.get("default").map_or_else(|| "-".to_string(), |value| value.to_string());
                out.push_str(&format!("| `{key}` | {type_name} | {default} |\n"));
            }
        }
        out.push('\n');
    }

    out
}

/// Writes the rendered configuration docs to `path`.
///
/// # Errors
///
/// Returns [`DocsError::Io`] when the file cannot be written.
pub fn write_config_docs(path: &Path) -> Result<(), DocsError> {
    fs::write(path, config_docs_markdown()).map_err(|err| DocsError::Io(err.to_string()))
}

/// Verifies that the file at `path` matches freshly rendered docs.
///
/// # Errors
///
/// Returns [`DocsError::Io`] if the file cannot be read, or
/// [`DocsError::Drift`] if its content does not match.
pub fn verify_config_docs(path: &Path) -> Result<(), DocsError> {
    let existing = fs::read_to_string(path).map_err(|err| DocsError::Io(err.to_string()))?;
    if existing == config_docs_markdown() { Ok(()) } else { Err(DocsError::Drift) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn docs_contain_every_section() {
        let docs = config_docs_markdown();
        for name in SECTION_ORDER {
            assert!(docs.contains(&format!("[{name}]")), "missing section {name}");
        }
    }

    #[test]
    fn write_then_verify_round_trips() {
        let file = NamedTempFile::new().unwrap();
        write_config_docs(file.path()).unwrap();
        assert!(verify_config_docs(file.path()).is_ok());
    }

    #[test]
    fn verify_detects_drift() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "stale content").unwrap();
        assert!(matches!(verify_config_docs(file.path()), Err(DocsError::Drift)));
    }
}
