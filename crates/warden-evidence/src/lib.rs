// crates/warden-evidence/src/lib.rs
// ============================================================================
// Crate: warden-evidence
// Description: Canonical, hash-stamped evidence pack builder and its storage
//              contract (§4.J).
// ============================================================================

//! # warden-evidence
//!
//! Closes the loop on a governed execution: every run produces one
//! [`EvidencePack`] binding the graph spec, its result, the audit events it
//! emitted, and (when IR governance was in play) a summary of that
//! decision, under a single `content_hash`.
//!
//! - [`pack`] — [`EvidencePack`], [`build_pack`], [`verify_pack`].
//! - [`sink`] — the pluggable [`EvidenceSink`]/[`EvidenceReader`] contract,
//!   plus [`InMemorySink`] and [`FileSink`].

pub mod pack;
pub mod sink;

pub use pack::EvidencePack;
pub use pack::IrSummary;
pub use pack::build_pack;
pub use pack::verify_pack;
pub use sink::EvidenceReader;
pub use sink::EvidenceSink;
pub use sink::FileSink;
pub use sink::InMemorySink;
pub use sink::SinkError;
