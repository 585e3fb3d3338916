//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into palace and quiz use cases.
//! - Enforce snapshot invariants before anything reaches storage.

pub mod palace_service;
pub mod quiz_service;
mod snapshot_rules;

pub use snapshot_rules::PruneReport;
