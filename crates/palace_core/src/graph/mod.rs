//! Anchor connection graph.

pub mod linearize;
