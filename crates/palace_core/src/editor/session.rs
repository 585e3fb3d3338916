//! Editing session state machine.
//!
//! One drag interaction moves through `Idle -> Dragging -> {Committed |
//! Reverted}` and always ends back in `Idle`. Inserts go straight from
//! `Idle` to an outcome.

use crate::config::PalaceConfig;
use crate::editor::error::EditorError;
use crate::model::connection::{AnchorInfo, Connection};
use crate::model::element::{Element, ElementId, ElementKind, VariantId};
use crate::model::palace::PalaceSnapshot;
use crate::spatial::containment::ElementIndex;
use crate::spatial::geometry::{
    point_in_rectangle, rectangles_overlap, snap_to_grid, Point, Rect, Size,
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Why a placement was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Room footprint intersects another room.
    Overlap,
    /// Drop landed outside the canvas.
    OutOfBounds,
}

impl RejectReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Overlap => "overlap",
            Self::OutOfBounds => "out_of_bounds",
        }
    }
}

/// Result of one insert or drag interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Change applied; carries the affected element id.
    Committed(ElementId),
    /// Change discarded; prior state preserved.
    Reverted(RejectReason),
}

impl PlacementOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Current drag state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Dragging {
        element: ElementId,
        /// Absolute position at drag start.
        origin: Point,
    },
}

/// In-memory palace owned by one editing session.
#[derive(Debug, Clone)]
pub struct PalaceEditor {
    config: PalaceConfig,
    name: String,
    elements: Vec<Element>,
    connections: Vec<Connection>,
    infos: HashMap<ElementId, AnchorInfo>,
    interaction: InteractionState,
}

impl PalaceEditor {
    /// Creates an empty session.
    pub fn new(config: PalaceConfig) -> Self {
        Self {
            config,
            name: String::new(),
            elements: Vec::new(),
            connections: Vec::new(),
            infos: HashMap::new(),
            interaction: InteractionState::Idle,
        }
    }

    /// Rebuilds a session from a saved snapshot.
    ///
    /// # Errors
    /// - Returns `EditorError::Containment` when the snapshot has cyclic or
    ///   dangling parent references.
    pub fn from_snapshot(
        config: PalaceConfig,
        snapshot: PalaceSnapshot,
    ) -> Result<Self, EditorError> {
        let PalaceSnapshot {
            name,
            rooms,
            objects,
            anchors,
            connections,
            infos,
        } = snapshot;

        let mut elements = Vec::with_capacity(rooms.len() + objects.len() + anchors.len());
        elements.extend(rooms);
        elements.extend(objects);
        elements.extend(anchors);

        {
            let index = ElementIndex::new(&elements);
            for element in &elements {
                index.absolute_position(element.id)?;
            }
        }

        let mut editor = Self::new(config);
        editor.name = name;
        editor.elements = elements;
        for info in infos {
            editor.infos.insert(info.anchor_id, info);
        }
        for connection in connections {
            // Replays through the same checks as interactive edits.
            if let Err(err) = editor.connect(connection.from, connection.to) {
                debug!(
                    "event=connection_skipped module=editor status=rejected from={} to={} reason={}",
                    connection.from, connection.to, err
                );
            }
        }
        Ok(editor)
    }

    pub fn config(&self) -> &PalaceConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn anchor_info(&self, anchor_id: ElementId) -> Option<&AnchorInfo> {
        self.infos.get(&anchor_id)
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction
    }

    /// Resolves the absolute canvas position of one element.
    pub fn absolute_position(&self, id: ElementId) -> Result<Point, EditorError> {
        Ok(ElementIndex::new(&self.elements).absolute_position(id)?)
    }

    /// Drops a new room of `variant` at `drop_point`.
    ///
    /// The point is snapped to the grid; the room is discarded when it leaves
    /// the canvas or overlaps another room.
    pub fn insert_room(&mut self, variant: VariantId, drop_point: Point) -> PlacementOutcome {
        let origin = snap_to_grid(drop_point, self.config.grid_size);
        let size = self.config.room_size(variant);
        let rect = Rect::from_origin_size(origin, size);

        if !self.config.canvas.rect().contains_rect(&rect) {
            return self.reject(ElementKind::Room, "insert", RejectReason::OutOfBounds);
        }
        if self.overlaps_room(&rect, None) {
            return self.reject(ElementKind::Room, "insert", RejectReason::Overlap);
        }

        let room = Element::new(ElementKind::Room, variant, origin, size);
        let id = room.id;
        self.elements.push(room);
        debug!("event=placement module=editor status=ok action=insert kind=room element={id}");
        PlacementOutcome::Committed(id)
    }

    /// Drops a new object at `drop_point`, nesting it in the container under the point.
    pub fn insert_object(
        &mut self,
        variant: VariantId,
        drop_point: Point,
    ) -> Result<PlacementOutcome, EditorError> {
        self.insert_nested(ElementKind::Object, variant, drop_point)
    }

    /// Drops a new anchor at `drop_point`, nesting it in the container under the point.
    pub fn insert_anchor(
        &mut self,
        variant: VariantId,
        drop_point: Point,
    ) -> Result<PlacementOutcome, EditorError> {
        self.insert_nested(ElementKind::Anchor, variant, drop_point)
    }

    /// Starts dragging `id`.
    pub fn begin_drag(&mut self, id: ElementId) -> Result<(), EditorError> {
        if let InteractionState::Dragging { element, .. } = self.interaction {
            return Err(EditorError::AlreadyDragging(element));
        }
        if self.element(id).is_none() {
            return Err(EditorError::UnknownElement(id));
        }
        let origin = self.absolute_position(id)?;
        self.interaction = InteractionState::Dragging {
            element: id,
            origin,
        };
        Ok(())
    }

    /// Abandons the current drag. Returns the element that was being dragged.
    pub fn cancel_drag(&mut self) -> Option<ElementId> {
        match std::mem::replace(&mut self.interaction, InteractionState::Idle) {
            InteractionState::Dragging { element, .. } => Some(element),
            InteractionState::Idle => None,
        }
    }

    /// Finishes the current drag with the element's new absolute top-left corner.
    pub fn end_drag(&mut self, target: Point) -> Result<PlacementOutcome, EditorError> {
        let InteractionState::Dragging { element, .. } =
            std::mem::replace(&mut self.interaction, InteractionState::Idle)
        else {
            return Err(EditorError::NotDragging);
        };
        self.apply_move(element, target)
    }

    /// Finishes the current drag by offsetting the drag origin with `delta`.
    pub fn end_drag_by(&mut self, delta: Point) -> Result<PlacementOutcome, EditorError> {
        let InteractionState::Dragging { origin, .. } = self.interaction else {
            return Err(EditorError::NotDragging);
        };
        self.end_drag(origin.offset_by(delta))
    }

    /// One-shot move: `begin_drag` followed by `end_drag`.
    pub fn move_element(
        &mut self,
        id: ElementId,
        target: Point,
    ) -> Result<PlacementOutcome, EditorError> {
        self.begin_drag(id)?;
        self.end_drag(target)
    }

    /// Deletes `id` and everything nested inside it.
    ///
    /// Connections touching a removed anchor and infos of removed anchors are
    /// dropped as well. Returns removed element ids, `id` first.
    pub fn delete_element(&mut self, id: ElementId) -> Result<Vec<ElementId>, EditorError> {
        if self.element(id).is_none() {
            return Err(EditorError::UnknownElement(id));
        }
        let mut removed = vec![id];
        removed.extend(ElementIndex::new(&self.elements).descendants(id));
        let removed_set: HashSet<ElementId> = removed.iter().copied().collect();

        self.elements
            .retain(|element| !removed_set.contains(&element.id));
        self.connections.retain(|connection| {
            !removed_set.contains(&connection.from) && !removed_set.contains(&connection.to)
        });
        self.infos
            .retain(|anchor_id, _| !removed_set.contains(anchor_id));

        if let InteractionState::Dragging { element, .. } = self.interaction {
            if removed_set.contains(&element) {
                self.interaction = InteractionState::Idle;
            }
        }

        debug!(
            "event=element_delete module=editor status=ok element={} removed_count={}",
            id,
            removed.len()
        );
        Ok(removed)
    }

    /// Adds a `from -> to` connection between two anchors.
    ///
    /// # Errors
    /// - Either endpoint unknown or not an anchor.
    /// - `from == to`.
    /// - `from` already has an outgoing connection.
    pub fn connect(&mut self, from: ElementId, to: ElementId) -> Result<(), EditorError> {
        self.require_kind(from, ElementKind::Anchor)?;
        self.require_kind(to, ElementKind::Anchor)?;
        if from == to {
            return Err(EditorError::SelfConnection(from));
        }
        if self.connections.iter().any(|connection| connection.from == from) {
            return Err(EditorError::SourceAlreadyConnected(from));
        }
        self.connections.push(Connection::new(from, to));
        Ok(())
    }

    /// Removes the outgoing connection of `from`, if any.
    pub fn disconnect(&mut self, from: ElementId) -> Option<Connection> {
        let position = self
            .connections
            .iter()
            .position(|connection| connection.from == from)?;
        Some(self.connections.remove(position))
    }

    pub fn clear_connections(&mut self) {
        self.connections.clear();
    }

    /// Sets title/material of one anchor, replacing any previous value.
    pub fn set_anchor_info(
        &mut self,
        anchor_id: ElementId,
        title: impl Into<String>,
        material: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.require_kind(anchor_id, ElementKind::Anchor)?;
        self.infos
            .insert(anchor_id, AnchorInfo::new(anchor_id, title, material));
        Ok(())
    }

    /// Produces the full save snapshot of this session.
    pub fn snapshot(&self) -> PalaceSnapshot {
        let mut snapshot = PalaceSnapshot::named(self.name.clone());
        for element in &self.elements {
            snapshot.push_element(element.clone());
        }
        snapshot.connections = self.connections.clone();
        snapshot.infos = snapshot
            .anchors
            .iter()
            .filter_map(|anchor| self.infos.get(&anchor.id).cloned())
            .collect();
        snapshot
    }

    fn insert_nested(
        &mut self,
        kind: ElementKind,
        variant: VariantId,
        drop_point: Point,
    ) -> Result<PlacementOutcome, EditorError> {
        if !point_in_rectangle(drop_point, &self.config.canvas.rect()) {
            return Ok(self.reject(kind, "insert", RejectReason::OutOfBounds));
        }

        let placement = self.nest_at(drop_point, &HashSet::new())?;
        let mut element = Element::new(kind, variant, placement.position, self.config.element_size());
        element.parent = placement.parent;
        let id = element.id;
        self.elements.push(element);
        debug!(
            "event=placement module=editor status=ok action=insert kind={} element={} nested={}",
            kind.as_str(),
            id,
            placement.parent.is_some()
        );
        Ok(PlacementOutcome::Committed(id))
    }

    fn apply_move(&mut self, id: ElementId, target: Point) -> Result<PlacementOutcome, EditorError> {
        let (kind, size) = self
            .element(id)
            .map(|element| (element.kind, element.size))
            .ok_or(EditorError::UnknownElement(id))?;
        match kind {
            ElementKind::Room => Ok(self.move_room(id, size, target)),
            ElementKind::Object | ElementKind::Anchor => self.move_nested(id, size, target),
        }
    }

    fn move_room(&mut self, id: ElementId, size: Size, target: Point) -> PlacementOutcome {
        let snapped = snap_to_grid(target, self.config.grid_size);
        let origin = clamp_to_canvas(snapped, size, &self.config);
        let rect = Rect::from_origin_size(origin, size);

        if self.overlaps_room(&rect, Some(id)) {
            return self.reject(ElementKind::Room, "move", RejectReason::Overlap);
        }
        if let Some(room) = self.elements.iter_mut().find(|element| element.id == id) {
            room.position = origin;
        }
        debug!("event=placement module=editor status=ok action=move kind=room element={id}");
        PlacementOutcome::Committed(id)
    }

    fn move_nested(
        &mut self,
        id: ElementId,
        size: Size,
        target: Point,
    ) -> Result<PlacementOutcome, EditorError> {
        let mut excluded: HashSet<ElementId> = ElementIndex::new(&self.elements)
            .descendants(id)
            .into_iter()
            .collect();
        excluded.insert(id);

        let mut placement = self.nest_at(target, &excluded)?;
        if placement.parent.is_none() {
            placement.position = clamp_to_canvas(target, size, &self.config);
        }
        if let Some(element) = self.elements.iter_mut().find(|element| element.id == id) {
            element.position = placement.position;
            element.parent = placement.parent;
        }
        debug!(
            "event=placement module=editor status=ok action=move element={} nested={}",
            id,
            placement.parent.is_some()
        );
        Ok(PlacementOutcome::Committed(id))
    }

    fn nest_at(
        &self,
        absolute: Point,
        excluded: &HashSet<ElementId>,
    ) -> Result<Placement, EditorError> {
        let index = ElementIndex::new(&self.elements);
        match index.container_at(absolute, excluded)? {
            Some(container) => {
                let container_origin = index.absolute_position(container.id)?;
                Ok(Placement {
                    position: absolute.relative_to(container_origin),
                    parent: Some(container.id),
                })
            }
            None => Ok(Placement {
                position: absolute,
                parent: None,
            }),
        }
    }

    fn overlaps_room(&self, rect: &Rect, ignore: Option<ElementId>) -> bool {
        self.elements
            .iter()
            .filter(|element| element.is_room() && Some(element.id) != ignore)
            .any(|room| rectangles_overlap(rect, &Rect::from_origin_size(room.position, room.size)))
    }

    fn require_kind(&self, id: ElementId, expected: ElementKind) -> Result<(), EditorError> {
        let element = self.element(id).ok_or(EditorError::UnknownElement(id))?;
        if element.kind != expected {
            return Err(EditorError::WrongKind {
                id,
                expected,
                actual: element.kind,
            });
        }
        Ok(())
    }

    fn reject(&self, kind: ElementKind, action: &str, reason: RejectReason) -> PlacementOutcome {
        debug!(
            "event=placement module=editor status=rejected action={} kind={} reason={}",
            action,
            kind.as_str(),
            reason.as_str()
        );
        PlacementOutcome::Reverted(reason)
    }
}

struct Placement {
    position: Point,
    parent: Option<ElementId>,
}

fn clamp_to_canvas(point: Point, size: Size, config: &PalaceConfig) -> Point {
    let max_x = (config.canvas.width - size.width).max(0.0);
    let max_y = (config.canvas.height - size.height).max(0.0);
    Point::new(point.x.clamp(0.0, max_x), point.y.clamp(0.0, max_y))
}
