// crates/warden-core/src/core/value.rs
// ============================================================================
// Module: Governance Kernel Schemaless Value
// Description: Tagged-union value type for IR step params/constraints.
// Purpose: Replace the source system's free-form dynamically typed dicts with
//          a small, canonicalizable value type at the typed edges of the IR.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `params` and `constraints` on an IR step are caller-defined key/value bags
//! in the original system. Rather than carry `serde_json::Value` (which would
//! let floats and non-canonical number forms leak into hashed structures),
//! the kernel uses [`ParamValue`]: a small closed tagged union of the shapes
//! the validator and canonicalizer actually need to reason about.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Value
// ============================================================================

/// Schemaless value used for IR step `params` and `constraints` maps.
///
/// # Invariants
/// - `Integer` is the only numeric variant; the IR schema never admits
///   floating point (budgets and counts are always exact).
/// - `Map` keys are canonicalized (sorted) by the canonicalizer, not by this
///   type itself, so construction order does not matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean value.
    Bool(bool),
    /// Exact integer value.
    Integer(i64),
    /// UTF-8 string value.
    String(String),
    /// Ordered list of values.
    List(Vec<ParamValue>),
    /// String-keyed map of values.
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Returns the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the value as an `i64`, if it is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a map, if it is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true if this value, or any nested string value, contains
    /// `needle` case-insensitively. Used by the validator's marker scans
    /// (e.g. "production", "bulk", "batch") over params/constraints.
    #[must_use]
    pub fn contains_marker(&self, needle: &str) -> bool {
        match self {
            Self::String(value) => value.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()),
            Self::List(items) => items.iter().any(|item| item.contains_marker(needle)),
            Self::Map(map) => {
                map.keys().any(|key| key.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()))
                    || map.values().any(|value| value.contains_marker(needle))
            }
            Self::Bool(_) | Self::Integer(_) => false,
        }
    }
}

/// A string-keyed bag of [`ParamValue`]s, used for `params` and `constraints`.
pub type ParamMap = BTreeMap<String, ParamValue>;

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn contains_marker_scans_nested_strings() {
        let mut map = ParamMap::new();
        map.insert("mode".to_string(), ParamValue::String("bulk-update".to_string()));
        let value = ParamValue::Map(map);
        assert!(value.contains_marker("bulk"));
        assert!(!value.contains_marker("batch"));
    }

    #[test]
    fn contains_marker_scans_keys_too() {
        let mut map = ParamMap::new();
        map.insert("environment".to_string(), ParamValue::String("production".to_string()));
        let value = ParamValue::Map(map);
        assert!(value.contains_marker("production"));
    }

    #[test]
    fn integer_round_trips_without_float_coercion() {
        let value = ParamValue::Integer(1200);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "1200");
    }
}
