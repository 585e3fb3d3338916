//! Save-time normalization of palace snapshots.
//!
//! # Responsibility
//! - Reject snapshots that would persist corrupted structure (cyclic
//!   containment, overlapping rooms).
//! - Prune records that reference something the snapshot does not contain.
//!
//! # Invariants
//! - Output elements form acyclic parent chains ending at a present
//!   container or at no parent.
//! - Output connections are anchor-to-anchor, not self loops, and unique per
//!   source; output infos are unique per present anchor.
//! - Where a key repeats, the first occurrence wins.

use super::palace_service::PalaceServiceError;
use crate::model::connection::{AnchorInfo, Connection};
use crate::model::element::{Element, ElementId, ElementKind};
use crate::model::palace::PalaceSnapshot;
use crate::spatial::containment::{ContainmentError, ElementIndex};
use crate::spatial::geometry::{rectangles_overlap, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Records dropped while preparing a snapshot for storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Elements dropped as duplicates or because their parent is absent.
    pub elements: Vec<ElementId>,
    pub connections: usize,
    pub infos: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.connections == 0 && self.infos == 0
    }
}

/// Returns the storable form of `snapshot` and what was dropped from it.
pub(crate) fn prepare_snapshot(
    snapshot: &PalaceSnapshot,
    name: String,
) -> Result<(PalaceSnapshot, PruneReport), PalaceServiceError> {
    let mut pruned = PruneReport::default();

    let mut seen = HashSet::new();
    let mut elements: Vec<Element> = Vec::with_capacity(snapshot.element_count());
    for element in snapshot.elements() {
        if !seen.insert(element.id) {
            pruned.elements.push(element.id);
            continue;
        }
        let mut element = element.clone();
        if !element.kind.can_be_nested() {
            element.parent = None;
        }
        elements.push(element);
    }

    let (elements, orphans) = drop_orphans(elements);
    pruned.elements.extend(orphans);

    ensure_acyclic(&elements)?;
    ensure_rooms_disjoint(&elements)?;

    let mut prepared = PalaceSnapshot::named(name);
    for element in elements {
        prepared.push_element(element);
    }

    let anchors: HashSet<ElementId> = prepared.anchors.iter().map(|anchor| anchor.id).collect();
    let (connections, dropped) = keep_valid_connections(&snapshot.connections, &anchors);
    prepared.connections = connections;
    pruned.connections = dropped;

    let (infos, dropped) = keep_valid_infos(&snapshot.infos, &anchors);
    prepared.infos = infos;
    pruned.infos = dropped;

    Ok((prepared, pruned))
}

/// Drops elements whose parent is missing or cannot contain them, until no
/// such element remains.
fn drop_orphans(mut elements: Vec<Element>) -> (Vec<Element>, Vec<ElementId>) {
    let mut dropped = Vec::new();
    loop {
        let kinds: HashMap<ElementId, ElementKind> = elements
            .iter()
            .map(|element| (element.id, element.kind))
            .collect();
        let before = elements.len();
        elements.retain(|element| match element.parent {
            None => true,
            Some(parent) => {
                let valid = kinds.get(&parent).is_some_and(|kind| kind.is_container());
                if !valid {
                    dropped.push(element.id);
                }
                valid
            }
        });
        if elements.len() == before {
            return (elements, dropped);
        }
    }
}

fn ensure_acyclic(elements: &[Element]) -> Result<(), PalaceServiceError> {
    let index = ElementIndex::new(elements);
    for element in elements {
        match index.absolute_position(element.id) {
            Ok(_) => {}
            Err(ContainmentError::CyclicContainment(id)) => {
                return Err(PalaceServiceError::CyclicContainment(id));
            }
            Err(err) => return Err(PalaceServiceError::Containment(err)),
        }
    }
    Ok(())
}

fn ensure_rooms_disjoint(elements: &[Element]) -> Result<(), PalaceServiceError> {
    let rooms: Vec<(ElementId, Rect)> = elements
        .iter()
        .filter(|element| element.is_room())
        .map(|room| (room.id, Rect::from_origin_size(room.position, room.size)))
        .collect();
    for (index, (first, first_rect)) in rooms.iter().enumerate() {
        for (second, second_rect) in &rooms[index + 1..] {
            if rectangles_overlap(first_rect, second_rect) {
                return Err(PalaceServiceError::OverlappingRooms {
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Ok(())
}

fn keep_valid_connections(
    connections: &[Connection],
    anchors: &HashSet<ElementId>,
) -> (Vec<Connection>, usize) {
    let mut sources = HashSet::new();
    let kept: Vec<Connection> = connections
        .iter()
        .filter(|edge| {
            !edge.is_self_loop()
                && anchors.contains(&edge.from)
                && anchors.contains(&edge.to)
                && sources.insert(edge.from)
        })
        .copied()
        .collect();
    let dropped = connections.len() - kept.len();
    (kept, dropped)
}

fn keep_valid_infos(infos: &[AnchorInfo], anchors: &HashSet<ElementId>) -> (Vec<AnchorInfo>, usize) {
    let mut keyed = HashSet::new();
    let kept: Vec<AnchorInfo> = infos
        .iter()
        .filter(|info| anchors.contains(&info.anchor_id) && keyed.insert(info.anchor_id))
        .cloned()
        .collect();
    let dropped = infos.len() - kept.len();
    (kept, dropped)
}
