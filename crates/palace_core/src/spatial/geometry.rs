//! Spatial primitives shared by placement and containment.
//!
//! # Invariants
//! - All functions are pure and never fail.
//! - Rectangles that only touch along an edge do not overlap.
//! - Point containment is inclusive on every edge.

use serde::{Deserialize, Serialize};

/// Point in palace canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum, used to stack relative offsets onto a parent.
    pub fn offset_by(self, other: Point) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference, used to express a point relative to a container.
    pub fn relative_to(self, origin: Point) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn square(side: f64) -> Self {
        Self::new(side, side)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns whether `inner` lies completely within this rectangle.
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }
}

/// Rounds each coordinate to the nearest multiple of `grid_size`.
///
/// A non-positive grid size leaves the point untouched.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    if grid_size <= 0.0 {
        return point;
    }
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// True unless one rectangle lies entirely left/right/above/below the other.
pub fn rectangles_overlap(a: &Rect, b: &Rect) -> bool {
    !(a.right() <= b.x || a.x >= b.right() || a.bottom() <= b.y || a.y >= b.bottom())
}

/// Inclusive bounds test.
pub fn point_in_rectangle(point: Point, rect: &Rect) -> bool {
    point.x >= rect.x && point.x <= rect.right() && point.y >= rect.y && point.y <= rect.bottom()
}

#[cfg(test)]
mod tests {
    use super::{point_in_rectangle, rectangles_overlap, snap_to_grid, Point, Rect};

    #[test]
    fn snap_rounds_to_nearest_grid_line() {
        assert_eq!(snap_to_grid(Point::new(149.0, 151.0), 100.0), Point::new(100.0, 200.0));
        assert_eq!(snap_to_grid(Point::new(-49.0, 50.0), 100.0), Point::new(0.0, 100.0));
    }

    #[test]
    fn snap_with_non_positive_grid_is_identity() {
        let point = Point::new(13.5, 7.25);
        assert_eq!(snap_to_grid(point, 0.0), point);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let left = Rect::new(0.0, 0.0, 100.0, 100.0);
        let right = Rect::new(100.0, 0.0, 100.0, 100.0);
        let below = Rect::new(0.0, 100.0, 100.0, 100.0);
        assert!(!rectangles_overlap(&left, &right));
        assert!(!rectangles_overlap(&left, &below));
    }

    #[test]
    fn partial_and_nested_rectangles_overlap() {
        let outer = Rect::new(0.0, 0.0, 200.0, 200.0);
        let partial = Rect::new(150.0, 150.0, 100.0, 100.0);
        let nested = Rect::new(50.0, 50.0, 10.0, 10.0);
        assert!(rectangles_overlap(&outer, &partial));
        assert!(rectangles_overlap(&partial, &outer));
        assert!(rectangles_overlap(&outer, &nested));
    }

    #[test]
    fn point_containment_is_inclusive() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(point_in_rectangle(Point::new(10.0, 10.0), &rect));
        assert!(point_in_rectangle(Point::new(30.0, 30.0), &rect));
        assert!(!point_in_rectangle(Point::new(30.5, 30.0), &rect));
        assert!(!point_in_rectangle(Point::new(9.9, 15.0), &rect));
    }
}
