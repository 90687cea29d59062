//! Voxel raycasting
//!
//! Rays are marched cell by cell with a 3D DDA (Amanatides & Woo). Each
//! visited cell's solid boxes are tested with the slab test, so partial
//! blocks are hit on their real surface rather than on the cell boundary.

use crate::error::{PhysicsError, Result};
use serde::{Deserialize, Serialize};
use voxel_math::{ray_aabb, Axis, IVec3, Ray, Vec3, AABB};

/// Which hit wins when several boxes in one cell are hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HitSelection {
    /// Smallest distance
    #[default]
    Nearest,
    /// Last box hit, in the order the world listed them
    LastChecked,
}

/// Options for raycast queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastOptions {
    /// Maximum distance for the ray; must be finite
    pub max_distance: f64,
    /// Tie-break between boxes of one cell
    pub hit_selection: HitSelection,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            hit_selection: HitSelection::Nearest,
        }
    }
}

impl RaycastOptions {
    /// Set maximum distance
    pub fn with_max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }

    /// Set the tie-break between boxes of one cell
    pub fn with_hit_selection(mut self, selection: HitSelection) -> Self {
        self.hit_selection = selection;
        self
    }
}

/// Result of a raycast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Hit point in world space
    pub point: Vec3,
    /// Face normal: the reverse of the last DDA step, zero when the ray
    /// starts in the cell it hits
    pub normal: Vec3,
    /// Cell containing the box that was hit
    pub voxel: IVec3,
    /// Distance from ray origin
    pub distance: f64,
}

/// Cast a ray through voxel geometry
///
/// `geometry` returns the solid boxes of a cell in cell-local coordinates.
/// Fails if `direction` is zero or not finite. A non-finite origin or
/// max distance never hits.
pub fn raycast<G>(mut geometry: G, origin: Vec3, direction: Vec3, options: RaycastOptions) -> Result<Option<RaycastHit>>
where
    G: FnMut(IVec3) -> Vec<AABB>,
{
    let ray = Ray::try_new(origin, direction).ok_or(PhysicsError::ZeroDirection)?;
    let max_distance = options.max_distance;
    if !origin.is_finite() || !max_distance.is_finite() {
        return Ok(None);
    }

    let dir = ray.direction;
    let mut cell = origin.floor();
    let mut step = IVec3::ZERO;
    let mut t_delta = Vec3::ZERO;
    let mut t_max = Vec3::ZERO;

    for axis in Axis::ALL {
        let d = dir[axis];
        step[axis] = if d > 0.0 { 1 } else { -1 };
        if d == 0.0 {
            t_delta[axis] = f64::INFINITY;
            t_max[axis] = f64::INFINITY;
        } else {
            t_delta[axis] = (1.0 / d).abs();
            let boundary = if d > 0.0 {
                (cell[axis] + 1) as f64
            } else {
                cell[axis] as f64
            };
            t_max[axis] = (boundary - origin[axis]) / d;
        }
    }

    let mut stepped: Option<Axis> = None;
    let mut t = 0.0;

    while t <= max_distance {
        let mut best: Option<f64> = None;
        for local in geometry(cell) {
            let solid = local.translated(cell.as_vec3());
            if let Some(distance) = ray_aabb(&ray, &solid, max_distance) {
                best = match (options.hit_selection, best) {
                    (HitSelection::Nearest, Some(current)) => Some(current.min(distance)),
                    _ => Some(distance),
                };
            }
        }

        if let Some(distance) = best {
            let normal = match stepped {
                Some(axis) => Vec3::axis(axis, -step[axis] as f64),
                None => Vec3::ZERO,
            };
            return Ok(Some(RaycastHit {
                point: ray.at(distance),
                normal,
                voxel: cell,
                distance,
            }));
        }

        let axis = if t_max.x < t_max.y {
            if t_max.x < t_max.z { Axis::X } else { Axis::Z }
        } else if t_max.y < t_max.z {
            Axis::Y
        } else {
            Axis::Z
        };
        t = t_max[axis];
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        stepped = Some(axis);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid_at(target: IVec3) -> impl FnMut(IVec3) -> Vec<AABB> {
        move |pos| if pos == target { vec![AABB::UNIT] } else { Vec::new() }
    }

    #[test]
    fn test_zero_direction_fails() {
        let err = raycast(|_| Vec::new(), Vec3::ZERO, Vec3::ZERO, RaycastOptions::default()).unwrap_err();
        assert!(matches!(err, PhysicsError::ZeroDirection));

        let nan = Vec3::new(f64::NAN, 0.0, 1.0);
        assert!(raycast(|_| Vec::new(), Vec3::ZERO, nan, RaycastOptions::default()).is_err());
    }

    #[test]
    fn test_empty_world_misses() {
        let hit = raycast(|_| Vec::new(), Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), RaycastOptions::default()).unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn test_hits_box_straddling_cells() {
        // Box (-1..1) moved to z = 3 is reported by the cell it starts in
        let target = IVec3::new(0, 0, 2);
        let geometry = |pos: IVec3| {
            if pos == target {
                let mut aabb = AABB::from_bounds(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0);
                aabb.translate(Vec3::new(0.0, 0.0, 1.0));
                vec![aabb]
            } else {
                Vec::new()
            }
        };

        let hit = raycast(geometry, Vec3::ZERO, Vec3::Z, RaycastOptions::default())
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit.distance, 2.0);
        assert_eq!(hit.voxel, target);
    }

    #[test]
    fn test_hit_point_normal_and_voxel() {
        let origin = Vec3::new(0.5, 0.5, 0.5);
        let hit = raycast(solid_at(IVec3::new(4, 0, 0)), origin, Vec3::X, RaycastOptions::default())
            .unwrap()
            .unwrap();

        assert_relative_eq!(hit.distance, 3.5);
        assert_relative_eq!(hit.point.x, 4.0);
        assert_eq!(hit.normal, Vec3::NEG_X);
        assert_eq!(hit.voxel, IVec3::new(4, 0, 0));
    }

    #[test]
    fn test_negative_direction_normal() {
        let origin = Vec3::new(0.5, 5.5, 0.5);
        let hit = raycast(
            |pos: IVec3| if pos.y < 0 { vec![AABB::UNIT] } else { Vec::new() },
            origin,
            Vec3::NEG_Y,
            RaycastOptions::default(),
        )
        .unwrap()
        .unwrap();

        assert_relative_eq!(hit.distance, 5.5);
        assert_eq!(hit.normal, Vec3::Y);
        assert_eq!(hit.voxel, IVec3::new(0, -1, 0));
    }

    #[test]
    fn test_max_distance() {
        let options = RaycastOptions::default().with_max_distance(3.0);
        let hit = raycast(solid_at(IVec3::new(0, 0, 5)), Vec3::splat(0.5), Vec3::Z, options).unwrap();
        assert!(hit.is_none());

        let options = RaycastOptions::default().with_max_distance(4.5);
        let hit = raycast(solid_at(IVec3::new(0, 0, 5)), Vec3::splat(0.5), Vec3::Z, options).unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn test_diagonal_ray_does_not_skip_cells() {
        let mut visited = Vec::new();
        let options = RaycastOptions::default().with_max_distance(5.0);
        let hit = raycast(
            |pos: IVec3| {
                visited.push(pos);
                Vec::new()
            },
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(1.0, 1.0, 0.0),
            options,
        )
        .unwrap();

        assert!(hit.is_none());
        // Each step changes exactly one coordinate by one
        for pair in visited.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let moved = (b.x - a.x).abs() + (b.y - a.y).abs() + (b.z - a.z).abs();
            assert_eq!(moved, 1);
        }
    }

    #[test]
    fn test_partial_box_surface() {
        let slab = AABB::from_bounds(0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
        let geometry = |pos: IVec3| if pos == IVec3::ZERO { vec![slab] } else { Vec::new() };

        let hit = raycast(geometry, Vec3::new(0.5, 3.0, 0.5), Vec3::NEG_Y, RaycastOptions::default())
            .unwrap()
            .unwrap();

        assert_relative_eq!(hit.point.y, 0.5);
        assert_relative_eq!(hit.distance, 2.5);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_hit_selection() {
        // Two boxes in one cell: the far one is listed last
        let near = AABB::from_bounds(0.0, 0.0, 0.0, 1.0, 1.0, 0.25);
        let far = AABB::from_bounds(0.0, 0.0, 0.75, 1.0, 1.0, 1.0);
        let geometry = move |pos: IVec3| {
            if pos == IVec3::new(0, 0, 2) {
                vec![near, far]
            } else {
                Vec::new()
            }
        };
        let origin = Vec3::new(0.5, 0.5, 0.5);

        let nearest = raycast(geometry, origin, Vec3::Z, RaycastOptions::default())
            .unwrap()
            .unwrap();
        assert_relative_eq!(nearest.distance, 1.5);

        let options = RaycastOptions::default().with_hit_selection(HitSelection::LastChecked);
        let last = raycast(geometry, origin, Vec3::Z, options).unwrap().unwrap();
        assert_relative_eq!(last.distance, 2.25);
    }

    #[test]
    fn test_hit_in_start_cell_has_zero_normal() {
        let slab = AABB::from_bounds(0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
        let geometry = |pos: IVec3| if pos == IVec3::ZERO { vec![slab] } else { Vec::new() };

        let hit = raycast(geometry, Vec3::new(0.5, 0.9, 0.5), Vec3::NEG_Y, RaycastOptions::default())
            .unwrap()
            .unwrap();

        assert_relative_eq!(hit.distance, 0.4);
        assert_eq!(hit.normal, Vec3::ZERO);
    }
}
