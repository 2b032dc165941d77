//! Geometry kernel for the scenery renderer: bounding boxes, view frusta and
//! convex polyhedra used to fit shadow volumes.

mod aabb;
mod frustum;
mod plane;
mod polyhedron;

pub use aabb::{Aabb, Corner};
pub use frustum::{CameraPose, Frustum, FrustumCorner};
pub use plane::Plane;
pub use polyhedron::{Polygon, Polyhedron};

/// Distance below which two vertices are considered the same point.
pub const MERGE_EPSILON: f32 = 1.0e-4;
