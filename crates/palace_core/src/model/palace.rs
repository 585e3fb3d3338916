//! Palace header and save snapshot model.
//!
//! # Invariants
//! - Palaces are never hard-deleted; `is_active=false` is the tombstone.
//! - A snapshot is the complete desired state: absence means removal.

use crate::model::connection::{AnchorInfo, Connection};
use crate::model::element::{Element, ElementKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable palace identifier.
pub type PalaceId = Uuid;

/// Palace header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palace {
    pub palace_uuid: PalaceId,
    /// Opaque authenticated user id supplied by the caller.
    pub owner_id: String,
    pub name: String,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
    pub is_active: bool,
}

/// Full editor state handed to the save path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PalaceSnapshot {
    pub name: String,
    pub rooms: Vec<Element>,
    pub objects: Vec<Element>,
    pub anchors: Vec<Element>,
    pub connections: Vec<Connection>,
    /// Per-anchor title/material, keyed by anchor id.
    pub infos: Vec<AnchorInfo>,
}

impl PalaceSnapshot {
    /// Creates an empty snapshot for `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sorts elements into the per-kind lists.
    pub fn push_element(&mut self, element: Element) {
        match element.kind {
            ElementKind::Room => self.rooms.push(element),
            ElementKind::Object => self.objects.push(element),
            ElementKind::Anchor => self.anchors.push(element),
        }
    }

    /// Iterates all elements: rooms, then objects, then anchors.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.rooms
            .iter()
            .chain(self.objects.iter())
            .chain(self.anchors.iter())
    }

    pub fn element_count(&self) -> usize {
        self.rooms.len() + self.objects.len() + self.anchors.len()
    }
}
