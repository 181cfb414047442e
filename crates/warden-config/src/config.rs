// crates/warden-config/src/config.rs
// ============================================================================
// Module: Governance Kernel Configuration
// Description: Configuration loading and validation for the governance
//              kernel's workspace-wide policy (§2's cross-cutting config
//              concern).
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, warden-core, warden-governor, warden-store-sqlite
// ============================================================================

//! ## Overview
//! `GovernanceConfig` resolves budget defaults, approval TTLs, the
//! governor's soft-degradation/approval policy, the durable store backend,
//! and event-stream retention from a single TOML document, in the manner of
//! the teacher's layered `decision-gate-config` crate. Configuration is
//! untrusted input: loading fails closed on oversized files, non-UTF-8
//! content, unknown fields, and out-of-range values, mirroring the same
//! fail-closed posture the IR schema itself applies to plans.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use warden_core::NodeId;
use warden_governor::Budget;
use warden_governor::GovernorPolicy;
use warden_store_sqlite::SqliteStoreConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "warden.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "WARDEN_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default approval TTL, in seconds, when a caller does not specify one.
pub(crate) const DEFAULT_APPROVAL_TTL_S: i64 = 900;
/// Minimum accepted approval TTL, in seconds.
pub(crate) const MIN_APPROVAL_TTL_S: i64 = 1;
/// Maximum accepted approval TTL, in seconds (7 days).
pub(crate) const MAX_APPROVAL_TTL_S: i64 = 7 * 24 * 3_600;
/// Default cleanup sweep interval for expired approvals, in seconds.
pub(crate) const DEFAULT_APPROVAL_CLEANUP_INTERVAL_S: u64 = 60;
/// Default soft-degradation threshold, matching §4.F's "≥ 80%" rule.
pub(crate) const DEFAULT_SOFT_DEGRADATION_THRESHOLD: f64 = 0.8;
/// Default TTL for a governor node-level approval request (§4.F: 15 min).
pub(crate) const DEFAULT_NODE_APPROVAL_TTL_S: i64 = GovernorPolicy::DEFAULT_NODE_APPROVAL_TTL_S;
/// Default retention cap per event-stream channel, matching §4.I.
pub(crate) const DEFAULT_EVENT_STREAM_MAX_LEN: usize = 10_000;
/// Default consumer batch size.
pub(crate) const DEFAULT_EVENT_STREAM_BATCH_SIZE: usize = 64;
/// Default consumer poll interval, in milliseconds.
pub(crate) const DEFAULT_EVENT_STREAM_POLL_INTERVAL_MS: u64 = 100;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Workspace-wide governance kernel configuration (§2's config cross-cutting
/// concern).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Default run budget applied when a call site does not supply its own.
    #[serde(default = "Budget::unbounded")]
    pub budget: Budget,
    /// Approval ledger TTL and cleanup policy.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Execution governor soft-degradation and node-approval policy.
    #[serde(default)]
    pub governor: GovernorConfig,
    /// Durable store backend selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Event stream retention and consumer batching.
    #[serde(default)]
    pub event_stream: EventStreamConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<std::time::SystemTime>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            budget: Budget::unbounded(),
            approval: ApprovalConfig::default(),
            governor: GovernorConfig::default(),
            store: StoreConfig::default(),
            event_stream: EventStreamConfig::default(),
            source_modified_at: None,
        }
    }
}

impl GovernanceConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// an explicit `path`, else `$WARDEN_CONFIG`, else `./warden.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when resolution, reading, parsing, or
    /// validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.approval.validate()?;
        self.governor.validate()?;
        self.store.validate()?;
        self.event_stream.validate()?;
        Ok(())
    }

    /// Builds the runtime [`GovernorPolicy`] this configuration describes.
    #[must_use]
    pub fn governor_policy(&self) -> GovernorPolicy {
        self.governor.to_policy(self.budget)
    }
}

/// Approval ledger TTL and cleanup policy (§4.D).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalConfig {
    /// Default TTL, in seconds, applied when a caller creates an approval
    /// without specifying its own.
    #[serde(default = "default_approval_ttl_s")]
    pub default_ttl_seconds: i64,
    /// Interval, in seconds, at which `cleanup_expired` sweeps are run by an
    /// operator-scheduled task (§4.D: "no-op when TTL is enforced by the
    /// store").
    #[serde(default = "default_approval_cleanup_interval_s")]
    pub cleanup_interval_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_approval_ttl_s(),
            cleanup_interval_seconds: default_approval_cleanup_interval_s(),
        }
    }
}

impl ApprovalConfig {
    /// Validates TTL and cleanup interval bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_seconds < MIN_APPROVAL_TTL_S || self.default_ttl_seconds > MAX_APPROVAL_TTL_S {
            return Err(ConfigError::Invalid(format!(
                "approval.default_ttl_seconds must be between {MIN_APPROVAL_TTL_S} and {MAX_APPROVAL_TTL_S}"
            )));
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "approval.cleanup_interval_seconds must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde default for `approval.default_ttl_seconds`.
const fn default_approval_ttl_s() -> i64 {
    DEFAULT_APPROVAL_TTL_S
}

/// Serde default for `approval.cleanup_interval_seconds`.
const fn default_approval_cleanup_interval_s() -> u64 {
    DEFAULT_APPROVAL_CLEANUP_INTERVAL_S
}

/// TOML-facing mirror of [`GovernorPolicy`] (§4.F), resolved into the
/// runtime type via [`GovernorConfig::to_policy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernorConfig {
    /// When `false` (the default), dry-run node checks skip budget/approval
    /// enforcement entirely (§4.F step 1).
    #[serde(default)]
    pub dry_run_respects_limits: bool,
    /// Whether soft-limit breaches may degrade (skip) eligible nodes.
    #[serde(default)]
    pub allow_soft_degradation: bool,
    /// Fraction of a soft limit (0.0-1.0) at which degradation triggers.
    #[serde(default = "default_soft_degradation_threshold")]
    pub soft_degradation_threshold: f64,
    /// Node ids that are never degraded or skipped, even under soft limits.
    #[serde(default)]
    pub critical_nodes: Vec<NodeId>,
    /// Node type strings eligible to be skipped under soft-limit pressure.
    #[serde(default)]
    pub skip_on_soft_limit: Vec<String>,
    /// Specific node ids that always require a governor-level approval.
    #[serde(default)]
    pub required_approval_nodes: Vec<NodeId>,
    /// Node type strings that always require a governor-level approval.
    #[serde(default)]
    pub required_approval_node_types: Vec<String>,
    /// TTL, in seconds, for a governor node-approval request.
    #[serde(default = "default_node_approval_ttl_s")]
    pub node_approval_ttl_s: i64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            dry_run_respects_limits: false,
            allow_soft_degradation: false,
            soft_degradation_threshold: default_soft_degradation_threshold(),
            critical_nodes: Vec::new(),
            skip_on_soft_limit: Vec::new(),
            required_approval_nodes: Vec::new(),
            required_approval_node_types: Vec::new(),
            node_approval_ttl_s: default_node_approval_ttl_s(),
        }
    }
}

impl GovernorConfig {
    /// Validates the soft-degradation threshold and TTL bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 ..= 1.0).contains(&self.soft_degradation_threshold) {
            return Err(ConfigError::Invalid(
                "governor.soft_degradation_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.node_approval_ttl_s < MIN_APPROVAL_TTL_S {
            return Err(ConfigError::Invalid(
                "governor.node_approval_ttl_s must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves this configuration into a runtime [`GovernorPolicy`] bound
    /// to `budget`.
    #[must_use]
    pub fn to_policy(&self, budget: Budget) -> GovernorPolicy {
        GovernorPolicy {
            budget,
            dry_run_respects_limits: self.dry_run_respects_limits,
            allow_soft_degradation: self.allow_soft_degradation,
            soft_degradation_threshold: self.soft_degradation_threshold,
            critical_nodes: self.critical_nodes.iter().cloned().collect::<HashSet<_>>(),
            skip_on_soft_limit: self.skip_on_soft_limit.iter().cloned().collect::<HashSet<_>>(),
            required_approval_nodes: self.required_approval_nodes.iter().cloned().collect::<HashSet<_>>(),
            required_approval_node_types: self
                .required_approval_node_types
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
            node_approval_ttl_s: self.node_approval_ttl_s,
        }
    }
}

/// Serde default for `governor.soft_degradation_threshold`.
const fn default_soft_degradation_threshold() -> f64 {
    DEFAULT_SOFT_DEGRADATION_THRESHOLD
}

/// Serde default for `governor.node_approval_ttl_s`.
const fn default_node_approval_ttl_s() -> i64 {
    DEFAULT_NODE_APPROVAL_TTL_S
}

/// Durable store backend selection for the approval ledger and event-stream
/// dedup table (§4.D, §4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local, non-durable store. Suitable for a single-instance
    /// deployment or tests.
    InMemory,
    /// `SQLite`-backed durable store, used when horizontal scaling or
    /// restart-survival is required.
    Sqlite,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory
    }
}

/// Store backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: StoreBackend,
    /// `SQLite` settings, required when `backend = "sqlite"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteBackendConfig>,
}

impl StoreConfig {
    /// Validates that a `sqlite` backend selection carries a usable
    /// `[store.sqlite]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `backend = "sqlite"` but
    /// `sqlite` is absent, or when the configured path fails validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.backend, &self.sqlite) {
            (StoreBackend::Sqlite, None) => {
                Err(ConfigError::Invalid("store.sqlite is required when backend = \"sqlite\"".to_string()))
            }
            (StoreBackend::Sqlite, Some(sqlite)) => sqlite.validate(),
            (StoreBackend::InMemory, _) => Ok(()),
        }
    }

    /// Builds a [`SqliteStoreConfig`] from this configuration, if the
    /// backend is `sqlite`.
    #[must_use]
    pub fn to_sqlite_config(&self) -> Option<SqliteStoreConfig> {
        self.sqlite.as_ref().map(SqliteBackendConfig::to_store_config)
    }
}

/// `SQLite` backend settings (§9: "`rusqlite` with a dedicated writer
/// thread plus `std::sync::mpsc` batching").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteBackendConfig {
    /// Path to the `SQLite` database file.
    pub path: String,
    /// Busy timeout applied to every connection, in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Number of read-only connections in the read pool.
    #[serde(default = "default_store_read_pool_size")]
    pub read_pool_size: usize,
    /// Writer command queue capacity.
    #[serde(default = "default_store_writer_queue_capacity")]
    pub writer_queue_capacity: usize,
}

impl SqliteBackendConfig {
    /// Validates the configured path and pool sizing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path or pool sizes are
    /// unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.sqlite.path", &self.path)?;
        if self.read_pool_size == 0 {
            return Err(ConfigError::Invalid("store.sqlite.read_pool_size must be non-zero".to_string()));
        }
        if self.writer_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "store.sqlite.writer_queue_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts this configuration into the runtime [`SqliteStoreConfig`].
    #[must_use]
    pub fn to_store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: PathBuf::from(&self.path),
            busy_timeout_ms: self.busy_timeout_ms,
            read_pool_size: self.read_pool_size,
            writer_queue_capacity: self.writer_queue_capacity,
        }
    }
}

/// Serde default for `store.sqlite.busy_timeout_ms`.
const fn default_store_busy_timeout_ms() -> u64 {
    warden_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS
}

/// Serde default for `store.sqlite.read_pool_size`.
const fn default_store_read_pool_size() -> usize {
    warden_store_sqlite::DEFAULT_READ_POOL_SIZE
}

/// Serde default for `store.sqlite.writer_queue_capacity`.
const fn default_store_writer_queue_capacity() -> usize {
    warden_store_sqlite::DEFAULT_WRITER_QUEUE_CAPACITY
}

/// Event stream retention and consumer batching (§4.I).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventStreamConfig {
    /// Retention cap per channel (§4.I: "last 10 000 events").
    #[serde(default = "default_event_stream_max_len")]
    pub max_len: usize,
    /// Maximum number of records a consumer batch reads at once.
    #[serde(default = "default_event_stream_batch_size")]
    pub batch_size: usize,
    /// How long a consumer blocks waiting for a batch, in milliseconds.
    #[serde(default = "default_event_stream_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            max_len: default_event_stream_max_len(),
            batch_size: default_event_stream_batch_size(),
            poll_interval_ms: default_event_stream_poll_interval_ms(),
        }
    }
}

impl EventStreamConfig {
    /// Validates retention and batching bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is zero or the batch
    /// size exceeds the retention cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_len == 0 {
            return Err(ConfigError::Invalid("event_stream.max_len must be non-zero".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("event_stream.batch_size must be non-zero".to_string()));
        }
        if self.batch_size > self.max_len {
            return Err(ConfigError::Invalid(
                "event_stream.batch_size must not exceed event_stream.max_len".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("event_stream.poll_interval_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Serde default for `event_stream.max_len`.
const fn default_event_stream_max_len() -> usize {
    DEFAULT_EVENT_STREAM_MAX_LEN
}

/// Serde default for `event_stream.batch_size`.
const fn default_event_stream_batch_size() -> usize {
    DEFAULT_EVENT_STREAM_BATCH_SIZE
}

/// Serde default for `event_stream.poll_interval_ms`.
const fn default_event_stream_poll_interval_ms() -> u64 {
    DEFAULT_EVENT_STREAM_POLL_INTERVAL_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised loading or validating a [`GovernanceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument or environment
/// default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string field against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use warden_governor::LimitType;

    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GovernanceConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_minimal_toml() {
        let config: GovernanceConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.approval.default_ttl_seconds, DEFAULT_APPROVAL_TTL_S);
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let result: Result<GovernanceConfig, _> = toml::from_str("unknown_field = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_approval_field() {
        let result: Result<GovernanceConfig, _> =
            toml::from_str("[approval]\ndefault_ttl_seconds = 60\nbogus = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_approval_ttl() {
        let mut config = GovernanceConfig::default();
        config.approval.default_ttl_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_soft_degradation_threshold() {
        let mut config = GovernanceConfig::default();
        config.governor.soft_degradation_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn sqlite_backend_requires_sqlite_section() {
        let mut config = GovernanceConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn sqlite_backend_with_section_validates() {
        let mut config = GovernanceConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite = Some(SqliteBackendConfig {
            path: "warden.db".to_string(),
            busy_timeout_ms: 5_000,
            read_pool_size: 4,
            writer_queue_capacity: 1_024,
        });
        assert!(config.validate().is_ok());
        assert!(config.store.to_sqlite_config().is_some());
    }

    #[test]
    fn event_stream_batch_size_cannot_exceed_max_len() {
        let mut config = GovernanceConfig::default();
        config.event_stream.max_len = 10;
        config.event_stream.batch_size = 20;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn governor_policy_carries_budget_through() {
        let mut config = GovernanceConfig::default();
        config.budget.max_steps = Some(5);
        config.budget.steps_limit_type = LimitType::Hard;
        let policy = config.governor_policy();
        assert_eq!(policy.budget.max_steps, Some(5));
    }

    #[test]
    fn toml_round_trips_through_example() {
        let example = crate::examples::config_toml_example();
        let config: GovernanceConfig = toml::from_str(&example).unwrap();
        assert!(config.validate().is_ok());
    }
}
