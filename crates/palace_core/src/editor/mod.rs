//! Interactive palace editing.
//!
//! # Responsibility
//! - Own the in-memory palace for one editing session.
//! - Validate and apply insert/move/delete and connection edits.
//!
//! # Invariants
//! - Active rooms never overlap and always sit on the grid.
//! - Rejected placements leave the session state untouched.
//! - Deleting a container removes everything nested inside it.

mod error;
mod session;

pub use error::EditorError;
pub use session::{InteractionState, PalaceEditor, PlacementOutcome, RejectReason};
