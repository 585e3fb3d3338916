//! Containment resolver.
//!
//! # Responsibility
//! - Derive absolute positions by walking parent chains.
//! - Find which room or object a canvas point falls into.
//!
//! # Invariants
//! - Resolution always terminates; a parent chain that revisits an element
//!   fails with `CyclicContainment` instead of looping.
//! - A parentless element resolves to its stored position unchanged.
//! - Container lookup order is stable: objects before rooms, and within one
//!   kind the most recently added element first.

use crate::model::element::{Element, ElementId, ElementKind};
use crate::spatial::geometry::{point_in_rectangle, Point, Rect};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised while resolving containment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainmentError {
    /// Parent chain loops back; carries the element seen twice.
    CyclicContainment(ElementId),
    /// Element names a parent that is not part of the element set.
    DanglingParent {
        element: ElementId,
        parent: ElementId,
    },
    /// Requested element is not part of the element set.
    UnknownElement(ElementId),
}

impl Display for ContainmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CyclicContainment(id) => {
                write!(f, "cyclic containment detected at element {id}")
            }
            Self::DanglingParent { element, parent } => {
                write!(f, "element {element} references missing parent {parent}")
            }
            Self::UnknownElement(id) => write!(f, "unknown element: {id}"),
        }
    }
}

impl Error for ContainmentError {}

pub type ContainmentResult<T> = Result<T, ContainmentError>;

/// Read-only lookup over one set of elements.
pub struct ElementIndex<'a> {
    ordered: Vec<&'a Element>,
    by_id: HashMap<ElementId, &'a Element>,
    children: HashMap<ElementId, Vec<ElementId>>,
}

impl<'a> ElementIndex<'a> {
    /// Indexes elements in the given (insertion) order.
    pub fn new<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = &'a Element>,
    {
        let ordered: Vec<&'a Element> = elements.into_iter().collect();
        let mut by_id = HashMap::with_capacity(ordered.len());
        let mut children: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        for element in &ordered {
            by_id.insert(element.id, *element);
            if let Some(parent) = element.parent {
                children.entry(parent).or_default().push(element.id);
            }
        }
        Self {
            ordered,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&'a Element> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Resolves the absolute position of `id` by summing offsets up the chain.
    pub fn absolute_position(&self, id: ElementId) -> ContainmentResult<Point> {
        let mut current = self.get(id).ok_or(ContainmentError::UnknownElement(id))?;
        let mut absolute = current.position;
        let mut visited = HashSet::from([current.id]);

        while let Some(parent_id) = current.parent {
            if !visited.insert(parent_id) {
                return Err(ContainmentError::CyclicContainment(parent_id));
            }
            let parent = self.get(parent_id).ok_or(ContainmentError::DanglingParent {
                element: current.id,
                parent: parent_id,
            })?;
            absolute = absolute.offset_by(parent.position);
            current = parent;
        }

        Ok(absolute)
    }

    /// Resolves the absolute bounding rectangle of `id`.
    pub fn absolute_rect(&self, id: ElementId) -> ContainmentResult<Rect> {
        let element = self.get(id).ok_or(ContainmentError::UnknownElement(id))?;
        let origin = self.absolute_position(id)?;
        Ok(Rect::from_origin_size(origin, element.size))
    }

    /// Returns the ids of the parent chain of `id`, nearest parent first.
    pub fn ancestors(&self, id: ElementId) -> ContainmentResult<Vec<ElementId>> {
        let mut current = self.get(id).ok_or(ContainmentError::UnknownElement(id))?;
        let mut visited = HashSet::from([current.id]);
        let mut chain = Vec::new();
        while let Some(parent_id) = current.parent {
            if !visited.insert(parent_id) {
                return Err(ContainmentError::CyclicContainment(parent_id));
            }
            chain.push(parent_id);
            current = self.get(parent_id).ok_or(ContainmentError::DanglingParent {
                element: current.id,
                parent: parent_id,
            })?;
        }
        Ok(chain)
    }

    /// Returns the outermost room enclosing `id`, if any.
    pub fn enclosing_room(&self, id: ElementId) -> ContainmentResult<Option<ElementId>> {
        let chain = self.ancestors(id)?;
        Ok(chain
            .into_iter()
            .filter(|ancestor| self.get(*ancestor).is_some_and(Element::is_room))
            .last())
    }

    /// Returns every element whose parent chain passes through `id`.
    ///
    /// Order is breadth-first; `id` itself is not included.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut visited = HashSet::from([id]);
        let mut frontier = vec![id];
        let mut result = Vec::new();
        while let Some(current) = frontier.pop() {
            let Some(children) = self.children.get(&current) else {
                continue;
            };
            for child in children {
                if visited.insert(*child) {
                    result.push(*child);
                    frontier.insert(0, *child);
                }
            }
        }
        result
    }

    /// Candidate containers in lookup order.
    pub fn containers(&self) -> impl Iterator<Item = &'a Element> + '_ {
        let objects = self
            .ordered
            .iter()
            .rev()
            .filter(|element| element.kind == ElementKind::Object);
        let rooms = self
            .ordered
            .iter()
            .rev()
            .filter(|element| element.kind == ElementKind::Room);
        objects.chain(rooms).copied()
    }

    /// Finds the first container whose absolute rectangle contains `point`.
    ///
    /// Elements listed in `excluded` are skipped; used to keep a dragged
    /// element from landing inside itself or its own descendants.
    pub fn container_at(
        &self,
        point: Point,
        excluded: &HashSet<ElementId>,
    ) -> ContainmentResult<Option<&'a Element>> {
        for candidate in self.containers() {
            if excluded.contains(&candidate.id) {
                continue;
            }
            if point_in_rectangle(point, &self.absolute_rect(candidate.id)?) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// Resolves the absolute position of `element` within `all`.
pub fn resolve_absolute_position(
    element: &Element,
    all: &[Element],
) -> ContainmentResult<Point> {
    if element.parent.is_none() {
        return Ok(element.position);
    }
    let index = ElementIndex::new(all.iter().chain(std::iter::once(element)));
    index.absolute_position(element.id)
}

/// Returns the container under `point`, or `None` for a free-floating drop.
pub fn find_container_at_point(
    point: Point,
    candidates: &[Element],
) -> ContainmentResult<Option<&Element>> {
    ElementIndex::new(candidates).container_at(point, &HashSet::new())
}

#[cfg(test)]
mod tests {
    use super::{find_container_at_point, resolve_absolute_position, ContainmentError, ElementIndex};
    use crate::model::element::{Element, ElementKind};
    use crate::spatial::geometry::{Point, Size};
    use std::collections::HashSet;

    fn room(x: f64, y: f64) -> Element {
        Element::new(ElementKind::Room, 1, Point::new(x, y), Size::square(100.0))
    }

    fn object(x: f64, y: f64) -> Element {
        Element::new(ElementKind::Object, 1, Point::new(x, y), Size::square(32.0))
    }

    #[test]
    fn parentless_element_resolves_to_stored_position() {
        let free = object(42.0, 7.0);
        let absolute = resolve_absolute_position(&free, &[]).unwrap();
        assert_eq!(absolute, Point::new(42.0, 7.0));
    }

    #[test]
    fn cycle_is_reported_instead_of_recursing() {
        let mut first = object(1.0, 1.0);
        let mut second = object(2.0, 2.0);
        first.parent = Some(second.id);
        second.parent = Some(first.id);
        let all = vec![first.clone(), second.clone()];

        let err = resolve_absolute_position(&first, &all).unwrap_err();
        assert_eq!(err, ContainmentError::CyclicContainment(first.id));
    }

    #[test]
    fn self_parent_is_cyclic() {
        let mut looped = object(0.0, 0.0);
        looped.parent = Some(looped.id);
        let index = ElementIndex::new([&looped]);
        assert!(matches!(
            index.absolute_position(looped.id),
            Err(ContainmentError::CyclicContainment(id)) if id == looped.id
        ));
    }

    #[test]
    fn dangling_parent_is_reported() {
        let orphan_parent = room(0.0, 0.0);
        let child = object(5.0, 5.0).within(orphan_parent.id);
        let err = resolve_absolute_position(&child, &[]).unwrap_err();
        assert_eq!(
            err,
            ContainmentError::DanglingParent {
                element: child.id,
                parent: orphan_parent.id
            }
        );
    }

    #[test]
    fn objects_are_found_before_their_room() {
        let hall = room(0.0, 0.0);
        let desk = object(10.0, 10.0).within(hall.id);
        let all = vec![hall.clone(), desk.clone()];

        let hit = find_container_at_point(Point::new(20.0, 20.0), &all)
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, desk.id);

        let hit = find_container_at_point(Point::new(80.0, 80.0), &all)
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, hall.id);

        assert!(find_container_at_point(Point::new(500.0, 500.0), &all)
            .unwrap()
            .is_none());
    }

    #[test]
    fn excluded_containers_are_skipped() {
        let hall = room(0.0, 0.0);
        let desk = object(10.0, 10.0).within(hall.id);
        let all = vec![hall.clone(), desk.clone()];
        let index = ElementIndex::new(&all);

        let hit = index
            .container_at(Point::new(20.0, 20.0), &HashSet::from([desk.id]))
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, hall.id);
    }

    #[test]
    fn descendants_are_transitive() {
        let hall = room(0.0, 0.0);
        let desk = object(10.0, 10.0).within(hall.id);
        let drawer = object(1.0, 1.0).within(desk.id);
        let anchor = Element::new(ElementKind::Anchor, 1, Point::new(2.0, 2.0), Size::square(32.0))
            .within(drawer.id);
        let all = vec![hall.clone(), desk.clone(), drawer.clone(), anchor.clone()];
        let index = ElementIndex::new(&all);

        assert_eq!(index.descendants(hall.id), vec![desk.id, drawer.id, anchor.id]);
        assert_eq!(index.enclosing_room(anchor.id).unwrap(), Some(hall.id));
        assert!(index.descendants(anchor.id).is_empty());
    }
}
