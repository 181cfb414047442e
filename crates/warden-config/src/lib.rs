// crates/warden-config/src/lib.rs
// ============================================================================
// Crate: warden-config
// Description: Canonical configuration model, loading, schema, and docs
//              generation for the governance kernel (ambient config surface
//              named in §6: "a single TOML file ... validated with
//              serde(deny_unknown_fields)").
// ============================================================================

//! # warden-config
//!
//! Every other component in this workspace is handed its configuration
//! rather than reading the environment itself: [`GovernanceConfig`] is
//! loaded and validated once, then its sections are converted into the
//! runtime types each crate actually consumes (`warden_governor::Budget`,
//! `GovernorPolicy`, `warden_store_sqlite::SqliteStoreConfig`).
//!
//! - [`config`] — [`GovernanceConfig`] and its section types, loading, and
//!   validation.
//! - [`schema`] — [`schema::config_schema`], a machine-readable description
//!   of the TOML shape for external tooling.
//! - [`docs`] — [`docs::config_docs_markdown`] and drift-checked doc
//!   generation.
//! - [`examples`] — [`examples::config_toml_example`], a canonical example
//!   document used by tests and operators alike.

pub mod config;
pub mod docs;
pub mod examples;
pub mod schema;

pub use config::ApprovalConfig;
pub use config::ConfigError;
pub use config::EventStreamConfig;
pub use config::GovernanceConfig;
pub use config::GovernorConfig;
pub use config::SqliteBackendConfig;
pub use config::StoreBackend;
pub use config::StoreConfig;
pub use docs::DocsError;
pub use docs::config_docs_markdown;
pub use docs::verify_config_docs;
pub use docs::write_config_docs;
pub use examples::config_toml_example;
pub use schema::config_schema;
