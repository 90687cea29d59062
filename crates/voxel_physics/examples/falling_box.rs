//! Falling box demonstration
//!
//! This example shows:
//! - A body falling onto a terrace and sliding into a wall
//! - Auto-stepping up a one-voxel ledge
//! - Collision events delivered over a channel
//!
//! Run with `RUST_LOG=trace` to see every impact and step.

use voxel_physics::prelude::*;

fn main() {
    // Initialize logging
    env_logger::init();

    println!("Voxel Physics Demo");
    println!("==================\n");

    // Ground below y = 0, a ledge from x = 4, a wall from x = 8
    let world = FnVoxelWorld::solid_only(|pos: IVec3| {
        let solid = pos.y < 0 || (pos.y == 0 && pos.x >= 4) || pos.x >= 8;
        if solid {
            vec![AABB::UNIT]
        } else {
            Vec::new()
        }
    });
    let mut physics = PhysicsEngine::new(EngineConfig::default(), CachedVoxelWorld::new(world));
    let events = physics.subscribe();

    let walker = physics.add_body(
        RigidBodyDesc::from_position_size(Vec3::new(0.2, 5.0, 0.2), Vec3::new(0.6, 1.8, 0.6))
            .with_auto_step(true)
            .on_step(|| println!("  stepped up")),
    );
    let ball = physics.add_body(
        RigidBodyDesc::new(AABB::from_center_half_extents(Vec3::new(2.5, 8.0, 2.5), Vec3::splat(0.25)))
            .with_restitution(0.6)
            .on_collide(|impacts| println!("  ball impact {:.2}", impacts.magnitude())),
    );

    for frame in 0..240 {
        if let Ok(body) = physics.body_mut(walker) {
            if body.on_ground() {
                let v = body.velocity();
                body.set_velocity(Vec3::new(4.0, v.y, 0.0));
            }
        }

        physics.update(1.0 / 60.0);

        for event in events.try_iter() {
            println!("frame {:3}: {:?} on {:?}", frame, event.event_type, event.body);
        }
    }

    for (handle, body) in physics.bodies() {
        println!(
            "{:?}: position {:?}, resting {:?}, sleeping {}",
            handle,
            body.position().to_array(),
            body.resting(),
            body.is_sleeping()
        );
    }

    match physics.raycast(Vec3::new(0.5, 10.0, 0.5), Vec3::new(1.0, -1.0, 0.0), 50.0) {
        Ok(Some(hit)) => println!("\nRay hit voxel {} at {:?}", hit.voxel, hit.point.to_array()),
        Ok(None) => println!("\nRay hit nothing"),
        Err(err) => println!("\nRaycast failed: {}", err),
    }

    if let Ok(ball) = physics.body(ball) {
        println!("Ball came to rest at y = {:.3}", ball.position().y);
    }
}
