//! Axis-aligned bounding boxes

use crate::vector::{Axis, Vec3};

/// Axis-Aligned Bounding Box
///
/// Stored as its minimum and maximum corners. Every mutating operation keeps
/// `min <= max` on each axis as long as its inputs do; a box that starts out
/// inverted is the caller's problem.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// A whole voxel, `[0, 1]` on every axis
    pub const UNIT: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ONE,
    };

    /// Create from min and max points
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create from the six bounds
    #[inline]
    pub const fn from_bounds(
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
    ) -> Self {
        Self {
            min: Vec3::new(min_x, min_y, min_z),
            max: Vec3::new(max_x, max_y, max_z),
        }
    }

    /// Create from a minimum corner and a size
    #[inline]
    pub fn from_position_size(position: Vec3, size: Vec3) -> Self {
        Self {
            min: position,
            max: position + size,
        }
    }

    /// Create from center and half-extents
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn min_on(&self, axis: Axis) -> f64 {
        self.min[axis]
    }

    #[inline]
    pub fn max_on(&self, axis: Axis) -> f64 {
        self.max[axis]
    }

    /// Extent along `axis`
    #[inline]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.max[axis] - self.min[axis]
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.extent(Axis::X)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.extent(Axis::Y)
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.extent(Axis::Z)
    }

    /// Get the size (full extents)
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the center point
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Check if the AABB is valid (min <= max)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Shift both corners by `offset`
    #[inline]
    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        self.min += offset;
        self.max += offset;
        self
    }

    /// Shift both faces on one axis
    #[inline]
    pub fn translate_axis(&mut self, axis: Axis, delta: f64) -> &mut Self {
        self.min[axis] += delta;
        self.max[axis] += delta;
        self
    }

    /// Translated copy
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Move the minimum corner to `position`, keeping the size
    #[inline]
    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        let size = self.size();
        self.min = position;
        self.max = position + size;
        self
    }

    /// Move the minimum face on `axis`, changing the size
    #[inline]
    pub fn set_min(&mut self, axis: Axis, value: f64) -> &mut Self {
        self.min[axis] = value;
        self
    }

    /// Move the maximum face on `axis`, changing the size
    #[inline]
    pub fn set_max(&mut self, axis: Axis, value: f64) -> &mut Self {
        self.max[axis] = value;
        self
    }

    /// Union of two AABBs
    #[inline]
    pub fn union(&self, other: &AABB) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Overlapping region, or `None` if the boxes are disjoint or only touch
    pub fn intersection(&self, other: &AABB) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }

    /// Check if two AABBs overlap with positive volume
    ///
    /// Boxes sharing only a face are not intersecting; a body resting on a
    /// voxel touches it without overlapping it.
    #[inline]
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y &&
        self.min.z < other.max.z && self.max.z > other.min.z
    }

    /// Check if a point is inside (boundary inclusive)
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::UNIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = AABB::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_aabb_intersects() {
        let a = AABB::new(Vec3::ZERO, Vec3::ONE);
        let b = AABB::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.5, 1.5, 1.5));
        let c = AABB::new(Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0));
        let touching = AABB::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&touching));
    }

    #[test]
    fn test_translate_round_trip() {
        let original = AABB::from_bounds(-1.25, 0.5, 3.0, 0.75, 2.5, 4.0);
        let offset = Vec3::new(0.5, -3.25, 8.0);

        let mut moved = original;
        moved.translate(offset).translate(-offset);

        assert_eq!(moved, original);
        assert_eq!(original.translated(offset).translated(-offset), original);
    }

    #[test]
    fn test_set_position_keeps_size() {
        let mut aabb = AABB::from_bounds(0.0, 0.0, 0.0, 0.8, 1.8, 0.8);
        aabb.set_position(Vec3::new(10.0, 30.0, -5.0));

        assert_eq!(aabb.min, Vec3::new(10.0, 30.0, -5.0));
        assert!((aabb.height() - 1.8).abs() < 1e-12);
        assert!((aabb.width() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_set_face_changes_size() {
        let mut aabb = AABB::UNIT;
        aabb.set_max(Axis::Y, 3.0).set_min(Axis::X, -1.0);

        assert_eq!(aabb.height(), 3.0);
        assert_eq!(aabb.width(), 2.0);
        assert_eq!(aabb.min_on(Axis::X), -1.0);
        assert_eq!(aabb.max_on(Axis::Y), 3.0);
    }

    #[test]
    fn test_intersection_and_union() {
        let a = AABB::from_bounds(0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = AABB::from_bounds(1.0, 1.0, 1.0, 3.0, 3.0, 3.0);

        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, AABB::from_bounds(1.0, 1.0, 1.0, 2.0, 2.0, 2.0));
        assert_eq!(a.union(&b), AABB::from_bounds(0.0, 0.0, 0.0, 3.0, 3.0, 3.0));
        assert!(a.intersection(&AABB::UNIT.translated(Vec3::splat(5.0))).is_none());
    }
}
