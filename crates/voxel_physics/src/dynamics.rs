//! Per-body steps of the engine tick
//!
//! Everything here works on one body against the voxel world; the engine
//! decides the order and owns the bookkeeping around it.

use crate::body::RigidBody;
use crate::config::EngineConfig;
use crate::sweep::{sweep_geometry, SweepOptions, SweepResponse};
use crate::voxel::VoxelWorld;
use voxel_math::{approx_eq, Axis, Vec3, AABB};

/// Cells covered by `[min, max)` on one axis, at least one
fn cell_span(min: f64, max: f64) -> (i32, i32) {
    let lo = min.floor() as i32;
    let hi = (max.ceil() as i32 - 1).max(lo);
    (lo, hi)
}

/// Move `aabb` by `displacement`, sliding along anything it hits
///
/// `resting` is reset and then records, per axis, the direction of every
/// face that made contact.
pub(crate) fn process_collisions<W: VoxelWorld>(
    world: &W,
    aabb: &mut AABB,
    displacement: Vec3,
    resting: &mut [i8; 3],
    epsilon: f64,
) {
    *resting = [0; 3];
    sweep_geometry(
        |pos| world.voxel_aabbs(pos),
        aabb,
        displacement,
        |collision| {
            resting[collision.axis.index()] = collision.direction;
            SweepResponse::Continue(collision.slide())
        },
        SweepOptions::default().with_epsilon(epsilon),
    );
}

/// Whether a body whose countdown has run out stays asleep
///
/// Under gravity the body only sleeps while something still holds it up:
/// half a tick of free fall is swept and has to hit.
pub(crate) fn body_asleep<W: VoxelWorld>(
    world: &W,
    body: &RigidBody,
    gravity: Vec3,
    dt: f64,
    epsilon: f64,
    no_gravity: bool,
) -> bool {
    if body.sleep_frame_count > 0 {
        return false;
    }
    if no_gravity {
        return true;
    }

    let fall = gravity * (0.5 * dt * dt * body.gravity_multiplier);
    let mut probe = body.aabb;
    let mut supported = false;
    sweep_geometry(
        |pos| world.voxel_aabbs(pos),
        &mut probe,
        fall,
        |_| {
            supported = true;
            SweepResponse::Stop
        },
        SweepOptions::probe().with_epsilon(epsilon),
    );
    supported
}

/// Update the body's fluid state and add buoyancy to its forces
///
/// The body is in fluid when any cell of its footprint on its bottom layer
/// is fluid. The fluid surface is found by walking up those columns as far
/// as they stay fluid, up to the body's top layer.
pub(crate) fn apply_fluid_forces<W: VoxelWorld>(world: &W, body: &mut RigidBody, gravity: Vec3, fluid_density: f64) {
    let aabb = body.aabb;
    let (x0, x1) = cell_span(aabb.min.x, aabb.max.x);
    let (z0, z1) = cell_span(aabb.min.z, aabb.max.z);
    let y0 = aabb.min.y.floor() as i32;
    let y1 = aabb.max.y.floor() as i32;

    let mut fluid_level: Option<i32> = None;
    for x in x0..=x1 {
        for z in z0..=z1 {
            if !world.is_fluid([x, y0, z].into()) {
                continue;
            }
            let mut top = y0 + 1;
            while top <= y1 && world.is_fluid([x, top, z].into()) {
                top += 1;
            }
            fluid_level = Some(fluid_level.map_or(top, |level| level.max(top)));
        }
    }

    let Some(level) = fluid_level else {
        body.in_fluid = false;
        body.ratio_in_fluid = 0.0;
        return;
    };

    let height = aabb.height();
    let ratio = if height > 0.0 {
        ((level as f64 - aabb.min.y) / height).min(1.0)
    } else {
        1.0
    };
    let displaced = aabb.volume() * ratio;

    // Buoyancy pushes against gravity, scaled by displaced volume
    body.forces += gravity * (-fluid_density * displaced);
    body.in_fluid = true;
    body.ratio_in_fluid = ratio;
}

/// Slow the body's movement across a surface it rests on along `axis`
///
/// The normal force is approximated by this tick's velocity change into the
/// surface, so friction takes at most `|friction * dv|` off the tangential
/// speed and never reverses it.
pub(crate) fn apply_friction_by_axis(axis: Axis, body: &mut RigidBody, dv: Vec3) {
    let rest_dir = body.resting[axis.index()] as f64;
    let v_normal = dv[axis];
    if rest_dir == 0.0 || rest_dir * v_normal <= 0.0 {
        return;
    }

    let mut lateral = body.velocity;
    lateral[axis] = 0.0;
    let v_curr = lateral.length();
    if approx_eq(v_curr, 0.0) {
        return;
    }

    let dv_max = (body.friction * v_normal).abs();
    let scale = if v_curr > dv_max {
        (v_curr - dv_max) / v_curr
    } else {
        0.0
    };
    for other in axis.others() {
        body.velocity[other] *= scale;
    }
}

/// Damp velocity with air drag, or with fluid drag when submerged
pub(crate) fn apply_drag(body: &mut RigidBody, config: &EngineConfig, dt: f64) {
    let drag = if body.in_fluid {
        let fluid_drag = body.fluid_drag.unwrap_or(config.fluid_drag);
        let dry = 1.0 - body.ratio_in_fluid;
        fluid_drag * (1.0 - dry * dry)
    } else {
        body.air_drag.unwrap_or(config.air_drag)
    };

    let mult = (1.0 - drag * dt / body.mass).max(0.0);
    body.velocity *= mult;
}

/// Try to climb the ledge that blocked this tick's horizontal movement
///
/// `old` is the body's box before this tick's move and `dx` the move that
/// was attempted. On success the body's box is replaced by the stepped one,
/// its horizontal resting flags by the stepped sweep's, and true is
/// returned.
pub(crate) fn try_auto_step<W: VoxelWorld>(
    world: &W,
    body: &mut RigidBody,
    mut old: AABB,
    dx: Vec3,
    cutoff: f64,
    epsilon: f64,
) -> bool {
    if body.resting[Axis::Y.index()] >= 0 && !body.in_fluid {
        return false;
    }

    let x_blocked = body.resting[Axis::X.index()] != 0;
    let z_blocked = body.resting[Axis::Z.index()] != 0;
    if !(x_blocked || z_blocked) {
        return false;
    }

    // Only step when heading mostly into the obstruction
    let ratio = (dx.x / dx.z).abs();
    if !x_blocked && ratio > cutoff {
        return false;
    }
    if !z_blocked && ratio < 1.0 / cutoff {
        return false;
    }

    let target = old.min + dx;
    let options = SweepOptions::default().with_epsilon(epsilon);

    // Up to the first horizontal contact, ignoring the floor
    sweep_geometry(
        |pos| world.voxel_aabbs(pos),
        &mut old,
        dx,
        |collision| {
            if collision.axis == Axis::Y {
                SweepResponse::Continue(collision.slide())
            } else {
                SweepResponse::Stop
            }
        },
        options,
    );

    // Up to the next voxel boundary above the body, bailing on any contact
    let y = body.aabb.min.y;
    let rise = (y + 1.001).floor() - y;
    let mut blocked_above = false;
    sweep_geometry(
        |pos| world.voxel_aabbs(pos),
        &mut old,
        Vec3::new(0.0, rise, 0.0),
        |_| {
            blocked_above = true;
            SweepResponse::Stop
        },
        options,
    );
    if blocked_above {
        return false;
    }

    // Whatever horizontal movement is left
    let mut left_to_move = target - old.min;
    left_to_move.y = 0.0;
    let mut stepped_resting = [0i8; 3];
    process_collisions(world, &mut old, left_to_move, &mut stepped_resting, epsilon);

    if x_blocked && !approx_eq(old.min.x, target.x) {
        return false;
    }
    if z_blocked && !approx_eq(old.min.z, target.z) {
        return false;
    }

    body.aabb = old;
    body.resting[Axis::X.index()] = stepped_resting[Axis::X.index()];
    body.resting[Axis::Z.index()] = stepped_resting[Axis::Z.index()];
    true
}
