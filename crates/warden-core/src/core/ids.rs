// crates/warden-core/src/core/ids.rs
// ============================================================================
// Module: Governance Kernel Identifiers
// Description: Opaque identifier newtypes shared across the governance kernel.
// Purpose: Give tenants, requests, approvals, and graph nodes distinct,
//          non-interchangeable wire types.
// Dependencies: serde, rand
// ============================================================================

//! ## Overview
//! Identifiers in the governance kernel are opaque UTF-8 strings. Every
//! identifier here is either caller-supplied (tenant, resource, idempotency
//! key) or kernel-generated as random hex (request, approval, event ids),
//! following the `rand::rngs::OsRng` + hex idiom rather than pulling in a
//! dedicated UUID crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;

// ============================================================================
// SECTION: Random Id Generation
// ============================================================================

/// Generates a lowercase hex identifier of `bytes` random bytes.
#[must_use]
pub fn random_hex_id(bytes: usize) -> String {
    let mut buf = vec![0_u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex_encode(&buf)
}

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Tenant Identifier
// ============================================================================

/// Error returned when a tenant identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tenant_id: {0}")]
pub struct InvalidTenantId(pub String);

/// Tenant identifier.
///
/// # Invariants
/// - Non-empty.
/// - Contains no ASCII control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Validates and constructs a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTenantId`] when `raw` is empty or contains control
    /// characters.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidTenantId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidTenantId("tenant_id must not be empty".to_string()));
        }
        if raw.chars().any(char::is_control) {
            return Err(InvalidTenantId(
                "tenant_id must not contain control characters".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(D::Error::custom)
    }
}

// ============================================================================
// SECTION: Opaque String Identifiers
// ============================================================================

/// Defines an opaque, unvalidated string identifier newtype.
macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Generates a new identifier with a random hex suffix.
            #[must_use]
            pub fn generate(prefix: &str) -> Self {
                Self(format!("{prefix}-{}", random_hex_id(16)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(RequestId, "Request identifier assigned to an IR submission.");
opaque_id!(ApprovalId, "Approval record identifier.");
opaque_id!(GraphId, "Execution graph identifier.");
opaque_id!(BusinessIntentId, "Business-intent identifier correlated across graphs.");
opaque_id!(NodeId, "DAG node identifier.");
opaque_id!(EventId, "Audit-only event identifier (never used as a dedup key).");
opaque_id!(SubscriberName, "Durable event-stream subscriber identity.");

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_rejects_empty() {
        assert!(TenantId::parse("").is_err());
    }

    #[test]
    fn tenant_id_rejects_control_chars() {
        assert!(TenantId::parse("tenant\u{0007}").is_err());
    }

    #[test]
    fn tenant_id_accepts_normal_string() {
        assert_eq!(TenantId::parse("acme-corp").unwrap().as_str(), "acme-corp");
    }

    #[test]
    fn random_hex_id_is_correct_length() {
        assert_eq!(random_hex_id(32).len(), 64);
    }
}
