// crates/warden-governor/src/budget.rs
// ============================================================================
// Module: Budget Model
// Description: Run-level budget limits and their monotonic counters (§3, §4.F).
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Budget`] bounds one run by step count, wall-clock duration, and
//! external-call count. Each dimension is either `Soft` (drives degradation)
//! or `Hard` (drives denial). [`BudgetCounters`] tracks consumption; it is
//! monotonic-nondecreasing for the lifetime of a run, matching §3's
//! invariant.

use serde::Deserialize;
use serde::Serialize;

/// Whether a budget dimension denies the run (`Hard`) or only triggers
/// soft-degradation of non-critical nodes (`Soft`) when exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    /// Exceeding this limit only degrades eligible node types.
    Soft,
    /// Exceeding this limit denies the run outright.
    Hard,
}

/// Per-run resource limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum number of nodes that may execute, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Whether `max_steps` is a soft or hard limit.
    pub steps_limit_type: LimitType,
    /// Maximum wall-clock duration since `ExecutionGovernor::start`, in
    /// seconds, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u64>,
    /// Whether `max_duration_seconds` is a soft or hard limit.
    pub duration_limit_type: LimitType,
    /// Maximum number of external calls a run may make, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_external_calls: Option<u64>,
    /// Whether `max_external_calls` is a soft or hard limit.
    pub external_calls_limit_type: LimitType,
}

impl Budget {
    /// Returns an unbounded budget: no dimension ever denies or degrades.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_steps: None,
            steps_limit_type: LimitType::Hard,
            max_duration_seconds: None,
            duration_limit_type: LimitType::Hard,
            max_external_calls: None,
            external_calls_limit_type: LimitType::Hard,
        }
    }
}

/// Monotonic-nondecreasing consumption counters for one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetCounters {
    /// Nodes executed so far.
    pub steps_consumed: u64,
    /// Wall-clock seconds elapsed since the run started.
    pub duration_consumed_s: u64,
    /// External calls made so far.
    pub external_calls_consumed: u64,
}

impl BudgetCounters {
    /// Records one more node's execution, advancing all three counters.
    pub fn record(&mut self, duration_s: u64, external_calls: u64) {
        self.steps_consumed = self.steps_consumed.saturating_add(1);
        self.duration_consumed_s = self.duration_consumed_s.saturating_add(duration_s);
        self.external_calls_consumed = self.external_calls_consumed.saturating_add(external_calls);
    }

    /// Returns the fraction (0.0-1.0+) of `limit` that `consumed` represents,
    /// or `0.0` when `limit` is `None` (unbounded dimensions never degrade).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "soft-degradation thresholds compare a ratio near 1.0; precision loss above 2^53 is not observable at realistic budget sizes"
    )]
    pub fn fraction_of(consumed: u64, limit: Option<u64>) -> f64 {
        match limit {
            Some(0) => 1.0,
            Some(limit) => consumed as f64 / limit as f64,
            None => 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn record_is_monotonic() {
        let mut counters = BudgetCounters::default();
        counters.record(2, 1);
        counters.record(3, 0);
        assert_eq!(counters.steps_consumed, 2);
        assert_eq!(counters.duration_consumed_s, 5);
        assert_eq!(counters.external_calls_consumed, 1);
    }

    #[test]
    fn fraction_of_unbounded_is_zero() {
        assert_eq!(BudgetCounters::fraction_of(1000, None), 0.0);
    }

    #[test]
    fn fraction_of_computes_ratio() {
        assert!((BudgetCounters::fraction_of(8, Some(10)) - 0.8).abs() < f64::EPSILON);
    }
}
