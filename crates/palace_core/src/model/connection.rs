//! Anchor connection and study payload model.
//!
//! # Invariants
//! - A connection never points from an anchor to itself.
//! - An anchor is the source of at most one active connection.
//! - Anchor info is keyed by anchor id; at most one active version exists.

use crate::model::element::ElementId;
use serde::{Deserialize, Serialize};

/// Directed "next anchor" edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    #[serde(rename = "from_id")]
    pub from: ElementId,
    #[serde(rename = "to_id")]
    pub to: ElementId,
}

impl Connection {
    pub fn new(from: ElementId, to: ElementId) -> Self {
        Self { from, to }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Returns whether `anchor_id` is either endpoint.
    pub fn touches(&self, anchor_id: ElementId) -> bool {
        self.from == anchor_id || self.to == anchor_id
    }
}

/// Study material attached to one anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorInfo {
    pub anchor_id: ElementId,
    pub title: String,
    pub material: String,
}

impl AnchorInfo {
    pub fn new(
        anchor_id: ElementId,
        title: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            anchor_id,
            title: title.into(),
            material: material.into(),
        }
    }
}
