//! Spatial element model.
//!
//! # Responsibility
//! - Define the structured record for rooms, objects and anchors.
//! - Keep kind and variant as explicit fields instead of encoding them in ids.
//!
//! # Invariants
//! - `id` is assigned once at creation and never reused for another element.
//! - Rooms never have a parent.
//! - Anchors are leaves: nothing may name an anchor as its parent.
//! - `position` is relative to `parent` when set, absolute otherwise.

use crate::spatial::geometry::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for rooms, objects and anchors.
pub type ElementId = Uuid;

/// Catalog reference for the concrete room/object/anchor variant.
pub type VariantId = i64;

/// Element category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Grid-aligned, non-nestable container.
    Room,
    /// Container that can sit in a room or another object.
    Object,
    /// Leaf carrying study material.
    Anchor,
}

impl ElementKind {
    /// Returns whether elements of this kind may contain other elements.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Room | Self::Object)
    }

    /// Returns whether elements of this kind may have a parent.
    pub fn can_be_nested(self) -> bool {
        matches!(self, Self::Object | Self::Anchor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Object => "object",
            Self::Anchor => "anchor",
        }
    }
}

/// One room, object or anchor in a palace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub variant: VariantId,
    /// Relative to `parent` when set, otherwise absolute.
    pub position: Point,
    pub size: Size,
    /// Containing room or object.
    pub parent: Option<ElementId>,
}

impl Element {
    /// Creates a parentless element with a generated id.
    pub fn new(kind: ElementKind, variant: VariantId, position: Point, size: Size) -> Self {
        Self::with_id(Uuid::new_v4(), kind, variant, position, size)
    }

    /// Creates a parentless element with a caller-provided id.
    ///
    /// Used by load paths where identity already exists in storage.
    pub fn with_id(
        id: ElementId,
        kind: ElementKind,
        variant: VariantId,
        position: Point,
        size: Size,
    ) -> Self {
        Self {
            id,
            kind,
            variant,
            position,
            size,
            parent: None,
        }
    }

    /// Builder-style parent assignment.
    pub fn within(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_room(&self) -> bool {
        self.kind == ElementKind::Room
    }
}
