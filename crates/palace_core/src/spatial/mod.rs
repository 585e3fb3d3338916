//! Spatial primitives and containment resolution.

pub mod containment;
pub mod geometry;
