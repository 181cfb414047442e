// crates/warden-core/src/core/canonical.rs
// ============================================================================
// Module: Governance Kernel Canonical Hashing
// Description: RFC 8785 JSON canonicalization and content hashing utilities.
// Purpose: Provide deterministic hashes for IR steps, IRs, DAGs, and evidence
//          packs that are stable across key ordering and process restarts.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every hash the kernel computes — `step_hash`, `ir_hash`, `dag_hash`,
//! evidence `content_hash` — goes through the same two functions: canonicalize
//! to RFC 8785 (JCS) bytes, then SHA-256 the bytes. Using a real JCS encoder
//! (`serde_jcs`) rather than a hand-rolled key sorter means enum-by-string,
//! UTF-8, and number-form guarantees come from a spec-compliant implementation
//! instead of ad hoc code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::ids::hex_encode;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// JSON canonicalization failed (e.g. non-finite float, unserializable value).
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonical Encoding
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`CanonicalError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    serde_jcs::to_vec(value).map_err(|err| CanonicalError::Canonicalization(err.to_string()))
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Canonicalizes `value` and returns its SHA-256 hex digest.
///
/// # Errors
///
/// Returns [`CanonicalError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    Ok(sha256_hex(&canonical_json_bytes(value)?))
}

/// Returns a truncated (16-character) copy of a hex digest for display in
/// audit messages. Storage and equality checks must always use the full
/// digest returned by [`sha256_hex`]; only human-facing text truncates.
#[must_use]
pub fn truncate_hash_for_display(full_hex: &str) -> String {
    full_hex.chars().take(16).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_json_sorts_object_keys() {
        let mut a = BTreeMap::new();
        a.insert("b", 1);
        a.insert("a", 2);
        let bytes = canonical_json_bytes(&a).unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn hash_is_stable_across_key_reordering_at_source() {
        let first = json!({"a": 1, "b": 2});
        let second = json!({"b": 2, "a": 1});
        assert_eq!(hash_canonical_json(&first).unwrap(), hash_canonical_json(&second).unwrap());
    }

    #[test]
    fn truncate_hash_keeps_first_sixteen_chars() {
        let full = sha256_hex(b"hello world");
        let truncated = truncate_hash_for_display(&full);
        assert_eq!(truncated.len(), 16);
        assert!(full.starts_with(&truncated));
    }
}
