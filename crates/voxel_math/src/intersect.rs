//! Ray intersection tests

use crate::bounds::AABB;
use crate::ray::Ray;
use crate::vector::Axis;

/// Ray-AABB intersection using the slab method
///
/// Returns the distance along the ray to the first surface crossing within
/// `max_distance`, or `None`. If the origin is inside the box the exit
/// distance is returned. `Some(0.0)` is a real hit at the origin.
///
/// Direction components that are exactly zero are handled without dividing:
/// the ray is parallel to that slab and either always inside it or never.
pub fn ray_aabb(ray: &Ray, aabb: &AABB, max_distance: f64) -> Option<f64> {
    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;

    for axis in Axis::ALL {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

        if dir == 0.0 {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let t1 = (lo - origin) * inv;
        let t2 = (hi - origin) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    // Behind the origin, or the slabs never overlap
    if t_max < 0.0 || t_min > t_max {
        return None;
    }

    let t = if t_min < 0.0 { t_max } else { t_min };
    if t <= max_distance {
        Some(t)
    } else {
        None
    }
}
