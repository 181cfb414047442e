// crates/warden-core/src/core/time.rs
// ============================================================================
// Module: Governance Kernel Time Model
// Description: Canonical timestamp representation shared by IR, events, and
//              evidence packs.
// Purpose: Keep policy decisions (validator, diff-audit) pure by routing
//          wall-clock reads through a single caller-supplied clock seam.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! The validator and diff-audit gate are specified as pure functions with "no
//! I/O, no randomness" — so the core never reads the wall clock internally.
//! Every timestamped record takes its `Timestamp` from the caller (gateway,
//! CLI, or a test fixture). [`Clock`] is the one seam through which a host
//! supplies "now"; the default [`SystemClock`] is the only caller of
//! [`time::OffsetDateTime::now_utc`] in the workspace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp, serialized as RFC 3339 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl Timestamp {
    /// Wraps an existing [`OffsetDateTime`], normalized to UTC.
    #[must_use]
    pub fn new(value: OffsetDateTime) -> Self {
        Self(value.to_offset(time::UtcOffset::UTC))
    }

    /// Returns the underlying [`OffsetDateTime`].
    #[must_use]
    pub const fn as_offset_date_time(&self) -> OffsetDateTime {
        self.0
    }

    /// Formats the timestamp as RFC 3339 text.
    ///
    /// # Panics
    ///
    /// Never panics: UTC offsets always format under RFC 3339.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.format(&Rfc3339).unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Supplies the current time to callers outside the pure governance path.
///
/// # Invariants
/// - Implementations must be monotonic-nondecreasing in practice; the kernel
///   does not enforce this but downstream counters assume it.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// System-clock implementation backed by [`OffsetDateTime::now_utc`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(OffsetDateTime::now_utc())
    }
}

/// Fixed-time clock for deterministic tests and replay.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_rfc3339() {
        let ts = Timestamp::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let text = ts.to_rfc3339();
        let parsed = OffsetDateTime::parse(&text, &Rfc3339).unwrap();
        assert_eq!(Timestamp::new(parsed), ts);
    }

    #[test]
    fn fixed_clock_is_stable() {
        let ts = Timestamp::new(OffsetDateTime::from_unix_timestamp(42).unwrap());
        let clock = FixedClock(ts);
        assert_eq!(clock.now(), ts);
        assert_eq!(clock.now(), ts);
    }
}
