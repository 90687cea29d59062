//! Integration tests for voxel_physics
//!
//! Tests whole engine ticks: landing, sliding, stepping, sleeping, fluids
//! and bouncing

use approx::assert_relative_eq;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use voxel_physics::*;

const DT: f64 = 0.016;

fn full(solid: bool) -> Vec<AABB> {
    if solid {
        vec![AABB::UNIT]
    } else {
        Vec::new()
    }
}

/// Solid ground below y = 0
fn flat_engine() -> PhysicsEngine<impl VoxelWorld> {
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0));
    PhysicsEngine::new(EngineConfig::default(), world)
}

/// A player-sized box standing with its min corner at `position`
fn player(position: Vec3) -> RigidBodyDesc {
    RigidBodyDesc::from_position_size(position, Vec3::new(0.6, 1.8, 0.6))
}

#[test]
fn test_body_lands_on_floor() {
    let mut engine = flat_engine();
    let impacts = Arc::new(Mutex::new(Vec::new()));
    let recorded = impacts.clone();
    let handle = engine.add_body(player(Vec3::new(0.2, 4.0, 0.2)).on_collide(move |i: &Impacts| {
        recorded.lock().push(*i);
    }));
    let events = engine.subscribe();

    for _ in 0..120 {
        engine.update(DT);
    }

    let body = engine.body(handle).unwrap();
    assert_eq!(body.position().y, 0.0);
    assert_eq!(body.resting_on(Axis::Y), -1);
    assert!(body.on_ground());
    assert_eq!(body.velocity(), Vec3::ZERO);

    // One landing, then the body just rests
    let impacts = impacts.lock();
    assert_eq!(impacts.len(), 1);
    assert!(impacts[0].hit(Axis::Y));
    assert!(impacts[0].impulse.y > 5.0);

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body, handle);
    assert!(received[0].is_impact());
}

#[test]
fn test_auto_step_climbs_ledge() {
    let (y, x, steps) = walk_into_ledge(true);

    assert_relative_eq!(y, 1.0, epsilon = 1e-9);
    assert!(x > 3.0, "body should have kept walking onto the ledge, x = {}", x);
    assert_eq!(steps, 1);
}

#[test]
fn test_without_auto_step_ledge_blocks() {
    let (y, x, steps) = walk_into_ledge(false);

    assert_eq!(y, 0.0);
    assert_relative_eq!(x + 0.6, 3.0, epsilon = 1e-9);
    assert_eq!(steps, 0);
}

/// Walk east into a one-voxel ledge at x = 3; returns the final min y and
/// min x and the number of auto-steps
fn walk_into_ledge(auto_step: bool) -> (f64, f64, usize) {
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0 || (pos.y == 0 && pos.x >= 3)));
    let mut engine = PhysicsEngine::new(EngineConfig::default(), world);

    let steps = Arc::new(AtomicUsize::new(0));
    let counter = steps.clone();
    let handle = engine.add_body(
        player(Vec3::new(1.0, 0.0, 0.2))
            .with_auto_step(auto_step)
            .on_step(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
    );

    let mut step_events = 0;
    for _ in 0..40 {
        let body = engine.body_mut(handle).unwrap();
        let v = body.velocity();
        body.set_velocity(Vec3::new(5.0, v.y, 0.0));
        engine.update(DT);
        step_events += engine.step_events().count();
    }

    assert_eq!(step_events, steps.load(Ordering::SeqCst));
    let body = engine.body(handle).unwrap();
    (body.position().y, body.position().x, steps.load(Ordering::SeqCst))
}

#[test]
fn test_auto_step_keeps_horizontal_velocity() {
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0 || (pos.y == 0 && pos.x >= 3)));
    let mut engine = PhysicsEngine::new(EngineConfig::default(), world);
    let handle = engine.add_body(
        player(Vec3::new(2.35, 0.0, 0.2))
            .with_auto_step(true)
            .with_friction(0.0)
            .with_air_drag(0.0),
    );
    engine.body_mut(handle).unwrap().set_velocity(Vec3::new(5.0, 0.0, 0.0));

    engine.update(DT);

    let body = engine.body(handle).unwrap();
    assert_relative_eq!(body.position().y, 1.0, epsilon = 1e-9);
    assert_relative_eq!(body.velocity().x, 5.0, epsilon = 1e-12);
    assert_eq!(body.resting_on(Axis::X), 0);
    assert_eq!(engine.step_events().count(), 1);
}

#[test]
fn test_sleeps_after_idle_frames() {
    let mut engine = flat_engine();
    let handle = engine.add_body(player(Vec3::new(0.2, 0.0, 0.2)));
    let frames = engine.config().sleep_frames;

    for tick in 1..=frames {
        engine.update(DT);
        let sleeping = engine.body(handle).unwrap().is_sleeping();
        assert_eq!(sleeping, tick == frames, "tick {}", tick);
    }
    assert_eq!(engine.active_body_count(), 0);

    // Asleep bodies are not processed
    let before = *engine.body(handle).unwrap().aabb();
    for _ in 0..20 {
        engine.update(DT);
    }
    assert_eq!(*engine.body(handle).unwrap().aabb(), before);
    assert!(engine.collision_events().next().is_none());

    // Until something wakes them
    engine.body_mut(handle).unwrap().apply_impulse(Vec3::new(0.0, 5.0, 0.0));
    assert_eq!(engine.active_body_count(), 1);
    engine.update(DT);
    let body = engine.body(handle).unwrap();
    assert!(!body.is_sleeping());
    assert!(body.position().y > 0.0);
}

#[test]
fn test_zero_sleep_frames_still_wakes_on_impulse() {
    let mut engine = flat_engine();
    let handle = engine.add_body(player(Vec3::new(0.2, 0.0, 0.2)).with_sleep_frames(0));

    engine.update(DT);
    assert!(engine.body(handle).unwrap().is_sleeping());

    engine.body_mut(handle).unwrap().apply_impulse(Vec3::new(5.0, 5.0, 0.0));
    for _ in 0..5 {
        engine.update(DT);
    }
    let body = engine.body(handle).unwrap();
    assert!(!body.is_sleeping());
    assert!(body.position().x > 0.2);
    assert!(body.position().y > 0.0);
}

#[test]
fn test_sleeping_body_wakes_when_support_disappears() {
    let floor_present = Arc::new(AtomicBool::new(true));
    let floor = floor_present.clone();
    let world = FnVoxelWorld::solid_only(move |pos: IVec3| {
        full(pos.y < -5 || (pos.y < 0 && floor.load(Ordering::SeqCst)))
    });
    let mut engine = PhysicsEngine::new(EngineConfig::default(), world);
    let handle = engine.add_body(player(Vec3::new(0.2, 0.0, 0.2)).with_sleep_frames(3));

    for _ in 0..5 {
        engine.update(DT);
    }
    assert!(engine.body(handle).unwrap().is_sleeping());

    floor_present.store(false, Ordering::SeqCst);
    engine.update(DT);

    let body = engine.body(handle).unwrap();
    assert!(!body.is_sleeping());
    assert!(body.velocity().y < 0.0);
}

#[test]
fn test_friction_slows_without_reversing() {
    let mut engine = flat_engine();
    let handle = engine.add_body(player(Vec3::new(0.2, 0.0, 0.2)).with_air_drag(0.0));
    engine.body_mut(handle).unwrap().set_velocity(Vec3::new(3.0, 0.0, -1.5));

    let mut last = engine.body(handle).unwrap().velocity();
    for _ in 0..60 {
        engine.update(DT);
        let v = engine.body(handle).unwrap().velocity();
        assert!(v.x >= 0.0 && v.x <= last.x);
        assert!(v.z <= 0.0 && v.z >= last.z);
        last = v;
    }

    assert_eq!(last.x, 0.0);
    assert_eq!(last.z, 0.0);
}

#[test]
fn test_slides_along_wall() {
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0 || pos.x >= 3));
    let config = EngineConfig::frictionless();
    let mut engine = PhysicsEngine::new(config, world);
    let handle = engine.add_body(player(Vec3::new(2.0, 0.0, 0.0)).with_friction(0.0));
    engine.body_mut(handle).unwrap().set_velocity(Vec3::new(4.0, 0.0, 4.0));

    for _ in 0..10 {
        engine.update(DT);
    }

    let body = engine.body(handle).unwrap();
    assert_eq!(body.aabb().max.x, 3.0);
    assert_eq!(body.velocity().x, 0.0);
    assert_relative_eq!(body.velocity().z, 4.0, epsilon = 1e-12);
    assert_relative_eq!(body.position().z, 4.0 * DT * 10.0, epsilon = 1e-9);
}

#[test]
fn test_fast_body_does_not_tunnel() {
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.x == 50));
    let mut engine = PhysicsEngine::new(EngineConfig::zero_gravity(), world);
    let handle = engine.add_body(RigidBodyDesc::new(AABB::UNIT).with_velocity(Vec3::new(1000.0, 0.0, 0.0)));

    for _ in 0..10 {
        engine.update(0.018);
    }

    assert_eq!(engine.body(handle).unwrap().aabb().max.x, 50.0);
}

#[test]
fn test_lands_on_half_slab() {
    let slab = AABB::from_bounds(0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
    let world = FnVoxelWorld::solid_only(move |pos: IVec3| {
        if pos.y == 0 {
            vec![slab]
        } else {
            full(pos.y < 0)
        }
    });
    let mut engine = PhysicsEngine::new(EngineConfig::default(), CachedVoxelWorld::new(world));
    let handle = engine.add_body(player(Vec3::new(0.2, 3.0, 0.2)));

    for _ in 0..120 {
        engine.update(DT);
    }

    assert_eq!(engine.body(handle).unwrap().position().y, 0.5);
    assert!(engine.world().cached_cells() > 0);
}

#[test]
fn test_buoyancy() {
    // Water from y = 0 up to y = 4 over solid ground
    let world = FnVoxelWorld::new(|pos: IVec3| full(pos.y < 0), |pos: IVec3| (0..4).contains(&pos.y));
    let mut engine = PhysicsEngine::new(EngineConfig::default(), world);
    let cube = |mass: f64| RigidBodyDesc::new(AABB::UNIT.translated(Vec3::new(0.0, 3.0, 0.0))).with_mass(mass);
    let light = engine.add_body(cube(1.0));
    let heavy = engine.add_body(cube(5.0));

    let mut light_min_y = f64::INFINITY;
    for _ in 0..300 {
        engine.update(DT);
        light_min_y = light_min_y.min(engine.body(light).unwrap().position().y);
    }

    // The light cube bobs at the surface, the heavy one sinks
    assert!(light_min_y > 2.5, "light cube sank to {}", light_min_y);
    let heavy = engine.body(heavy).unwrap();
    assert_eq!(heavy.position().y, 0.0);
    assert!(heavy.in_fluid());
    assert_eq!(heavy.ratio_in_fluid(), 1.0);
}

#[test]
fn test_restitution_bounces() {
    let mut engine = flat_engine();
    let bouncy = engine.add_body(
        RigidBodyDesc::new(AABB::UNIT.translated(Vec3::new(0.0, 5.0, 0.0))).with_restitution(0.5),
    );
    let dull = engine.add_body(RigidBodyDesc::new(AABB::UNIT.translated(Vec3::new(3.0, 5.0, 0.0))));

    let mut bouncy_rose = false;
    let mut dull_rose = false;
    for _ in 0..200 {
        engine.update(DT);
        bouncy_rose |= engine.body(bouncy).unwrap().velocity().y > 0.0;
        dull_rose |= engine.body(dull).unwrap().velocity().y > 0.0;
    }

    assert!(bouncy_rose);
    assert!(!dull_rose);
}

#[test]
fn test_removed_handles_are_rejected() {
    let mut engine = flat_engine();
    let a = engine.add_body(player(Vec3::ZERO));
    engine.remove_body(a).unwrap();

    assert!(matches!(engine.body(a), Err(PhysicsError::BodyNotFound(h)) if h == a));
    assert!(engine.body_mut(a).is_err());
    assert!(engine.remove_body(a).is_err());

    // A new body may reuse the slot but never the handle
    let b = engine.add_body(player(Vec3::ZERO));
    assert_ne!(a, b);
    assert!(engine.body(a).is_err());
    assert!(engine.body(b).is_ok());
    assert_eq!(engine.bodies().count(), 1);
}

#[test]
fn test_sweep_epsilon_from_config() {
    let slide = |config: EngineConfig| {
        let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0));
        let mut engine = PhysicsEngine::try_new(config, world).unwrap();
        let handle = engine.add_body(player(Vec3::new(0.2, -5e-7, 0.2)).with_velocity(Vec3::new(5.0, 0.0, 0.0)));
        for _ in 0..10 {
            engine.update(DT);
        }
        engine.body(handle).unwrap().position().x
    };

    // The default bias treats the sunk body as inside the floor's next column
    assert_relative_eq!(slide(EngineConfig::zero_gravity()), 0.4, epsilon = 1e-9);
    assert!(slide(EngineConfig::zero_gravity().with_sweep_epsilon(1e-6)) > 0.9);
}

#[test]
fn test_config_from_json() {
    let config = EngineConfig::from_json(r#"{ "gravity": [0.0, -20.0, 0.0], "sleep_frames": 4 }"#).unwrap();
    let world = FnVoxelWorld::solid_only(|pos: IVec3| full(pos.y < 0));
    let mut engine = PhysicsEngine::try_new(config, world).unwrap();
    let handle = engine.add_body(player(Vec3::new(0.0, 0.0, 0.0)));

    assert_eq!(engine.gravity(), Vec3::new(0.0, -20.0, 0.0));
    assert_eq!(engine.body(handle).unwrap().sleep_frames, 4);
}
