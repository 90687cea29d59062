//! # voxel_math - Geometry primitives for voxel physics
//!
//! Double-precision vectors, integer voxel coordinates, axis-aligned boxes,
//! rays and the slab intersection test shared by the raycaster and the
//! swept collision resolver.

pub mod vector;
pub mod bounds;
pub mod ray;
pub mod intersect;

pub use vector::*;
pub use bounds::*;
pub use ray::*;
pub use intersect::*;

/// Common math constants
pub mod consts {
    /// Tolerance used when comparing physical quantities against zero
    pub const EPSILON: f64 = 1e-5;
}

/// Approximate equality within [`consts::EPSILON`]
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < consts::EPSILON
}

pub mod prelude {
    pub use crate::vector::{Axis, IVec3, Vec3};
    pub use crate::bounds::AABB;
    pub use crate::ray::Ray;
    pub use crate::intersect::ray_aabb;
    pub use crate::approx_eq;
}
