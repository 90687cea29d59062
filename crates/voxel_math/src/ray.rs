//! 3D Ray for intersection testing

use crate::vector::Vec3;

/// 3D ray for intersection testing
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    /// Ray origin point
    pub origin: Vec3,
    /// Ray direction (unit length unless the ray is invalid)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray with normalized direction
    ///
    /// A zero direction gives an invalid ray; use [`Ray::try_new`] to catch that.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray, or `None` if `direction` has zero length or is not finite
    #[inline]
    pub fn try_new(origin: Vec3, direction: Vec3) -> Option<Self> {
        direction.try_normalize().map(|direction| Self { origin, direction })
    }

    /// Create a ray from two points
    #[inline]
    pub fn from_points(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Get a point at distance t along the ray
    #[inline]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Check if the ray direction is valid (non-zero length)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.direction.length_squared() > 1e-20
    }
}
