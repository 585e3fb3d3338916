//! Palace domain model.
//!
//! # Responsibility
//! - Define the records exchanged between editor, storage and quiz layers.
//! - Keep element kind/variant as structured fields, never parsed out of ids.
//!
//! # Invariants
//! - Every spatial element is identified by a stable `ElementId`.
//! - Deletion is represented by closing validity, not by hard delete.

pub mod connection;
pub mod element;
pub mod palace;
