//! Voxel Physics - rigid boxes in a voxel world
//!
//! This crate moves axis-aligned boxes through a voxel grid without ever
//! letting them pass through solid geometry, however fast they move.
//!
//! # Features
//!
//! - Swept box-vs-voxel collision with sliding
//! - Voxel raycasting against full and partial blocks
//! - Gravity, friction, air and fluid drag, buoyancy
//! - Restitution bounce, auto-stepping onto ledges
//! - Sleeping for bodies at rest
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              PhysicsEngine               │
//! │  ┌─────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │ BodySet │  │ dynamics │  │ Events  │  │
//! │  └─────────┘  └──────────┘  └─────────┘  │
//! └──────────────────────────────────────────┘
//!          │              │
//!          ▼              ▼
//!     ┌─────────┐   ┌──────────┐
//!     │  sweep  │   │  query   │
//!     └─────────┘   └──────────┘
//!          │              │
//!          └──────┬───────┘
//!                 ▼
//!          ┌────────────┐
//!          │ VoxelWorld │  (supplied by the application)
//!          └────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use voxel_physics::prelude::*;
//!
//! // Solid ground below y = 0
//! let world = FnVoxelWorld::solid_only(|pos: IVec3| {
//!     if pos.y < 0 { vec![AABB::UNIT] } else { Vec::new() }
//! });
//! let mut physics = PhysicsEngine::new(EngineConfig::default(), world);
//!
//! let body = physics.add_body(RigidBodyDesc::from_position_size(
//!     Vec3::new(0.0, 3.0, 0.0),
//!     Vec3::new(0.6, 1.8, 0.6),
//! ));
//!
//! for _ in 0..120 {
//!     physics.update(1.0 / 60.0);
//! }
//!
//! assert_eq!(physics.body(body).unwrap().position().y, 0.0);
//! ```

pub mod body;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod query;
pub mod sweep;
pub mod voxel;
pub mod world;

pub mod prelude {
    //! Common imports for physics functionality
    pub use crate::body::{BodyHandle, BodySet, Impacts, RigidBody, RigidBodyDesc};
    pub use crate::config::EngineConfig;
    pub use crate::error::{PhysicsError, Result};
    pub use crate::events::{CollisionEvent, CollisionEventType, EventCollector};
    pub use crate::query::{raycast, HitSelection, RaycastHit, RaycastOptions};
    pub use crate::sweep::{sweep, sweep_geometry, SweepCollision, SweepOptions, SweepResponse};
    pub use crate::voxel::{CachedVoxelWorld, FnVoxelWorld, VoxelWorld};
    pub use crate::world::PhysicsEngine;
    pub use voxel_math::{Axis, IVec3, Vec3, AABB};
}

pub use prelude::*;
