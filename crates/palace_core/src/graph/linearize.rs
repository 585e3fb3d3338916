//! Connection graph linearization.
//!
//! # Responsibility
//! - Turn "next anchor" edges into one deterministic presentation order.
//!
//! # Invariants
//! - Output is always a permutation of the input anchors.
//! - Malformed input (branching, cycles, dangling edges) never fails; hops
//!   that cannot be resolved are skipped.
//! - With no connections, input order is returned unchanged.

use crate::model::connection::Connection;
use crate::model::element::ElementId;
use std::collections::{HashMap, HashSet};

/// Anything that can be ordered by the linearizer.
pub trait Linearizable {
    fn anchor_id(&self) -> ElementId;
}

impl Linearizable for ElementId {
    fn anchor_id(&self) -> ElementId {
        *self
    }
}

impl Linearizable for crate::model::element::Element {
    fn anchor_id(&self) -> ElementId {
        self.id
    }
}

/// Maps each source anchor to its successor.
///
/// With duplicate sources the last edge wins.
pub fn build_successor_map(connections: &[Connection]) -> HashMap<ElementId, ElementId> {
    let mut successors = HashMap::with_capacity(connections.len());
    for connection in connections {
        successors.insert(connection.from, connection.to);
    }
    successors
}

/// Returns every anchor id that is the target of some edge.
pub fn destination_set(connections: &[Connection]) -> HashSet<ElementId> {
    connections.iter().map(|connection| connection.to).collect()
}

/// Orders `anchors` by following connections from a chain head.
///
/// The walk starts at the first anchor (input order) that is no edge's
/// destination, or at the first anchor when every anchor is one. Anchors the
/// walk never reaches are appended in input order.
pub fn linearize<T>(anchors: Vec<T>, connections: &[Connection]) -> Vec<T>
where
    T: Linearizable,
{
    if connections.is_empty() || anchors.is_empty() {
        return anchors;
    }

    let successors = build_successor_map(connections);
    let destinations = destination_set(connections);
    let positions: HashMap<ElementId, usize> = anchors
        .iter()
        .enumerate()
        .map(|(index, anchor)| (anchor.anchor_id(), index))
        .rev()
        .collect();

    let start = anchors
        .iter()
        .map(Linearizable::anchor_id)
        .find(|id| !destinations.contains(id))
        .unwrap_or_else(|| anchors[0].anchor_id());

    let mut order = Vec::with_capacity(anchors.len());
    let mut visited = HashSet::new();
    let mut cursor = Some(start);
    while let Some(current) = cursor {
        let Some(&index) = positions.get(&current) else {
            break;
        };
        if !visited.insert(current) {
            break;
        }
        order.push(index);
        cursor = successors.get(&current).copied();
    }

    let mut slots: Vec<Option<T>> = anchors.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(slots.len());
    for index in order {
        if let Some(anchor) = slots[index].take() {
            result.push(anchor);
        }
    }
    result.extend(slots.into_iter().flatten());
    result
}
