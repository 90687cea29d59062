//! Physics engine - main simulation container

use crate::body::{BodyHandle, BodySet, Impacts, RigidBody, RigidBodyDesc};
use crate::config::EngineConfig;
use crate::dynamics;
use crate::error::{PhysicsError, Result};
use crate::events::{CollisionEvent, EventCollector};
use crate::query::{self, RaycastHit, RaycastOptions};
use crate::voxel::VoxelWorld;
use crossbeam_channel::Receiver;
use voxel_math::{Axis, Vec3};

/// Impacts weaker than this are not reported
const IMPACT_EPSILON: f64 = 0.001;

/// Squared speed above which a body counts as moving
const ACTIVE_SPEED_SQ: f64 = 1e-5;

/// The main physics engine containing all simulation state
pub struct PhysicsEngine<W> {
    /// Configuration
    config: EngineConfig,

    /// Gravity, kept in step with `config.gravity`
    gravity: Vec3,

    /// Voxel world the bodies move through
    world: W,

    /// Rigid body set
    bodies: BodySet,

    /// Events from the last update
    events: EventCollector,
}

impl<W: VoxelWorld> PhysicsEngine<W> {
    /// Create a new physics engine
    ///
    /// An invalid configuration is used as given and logged; call
    /// [`PhysicsEngine::try_new`] to reject it instead.
    pub fn new(config: EngineConfig, world: W) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("Creating physics engine with {}", err);
        }
        log::debug!("Physics engine created (gravity {:?})", config.gravity);

        Self {
            gravity: Vec3::from_array(config.gravity),
            config,
            world,
            bodies: BodySet::new(),
            events: EventCollector::new(),
        }
    }

    /// Create a new physics engine, failing on an invalid configuration
    pub fn try_new(config: EngineConfig, world: W) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, world))
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the voxel world
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Set gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        self.config.gravity = gravity.to_array();
    }

    /// Get gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    // ==================== Rigid Bodies ====================

    /// Add a rigid body
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let body = RigidBody::from_desc(desc, self.config.sleep_frames);
        let handle = self.bodies.insert(body);
        log::debug!("Added rigid body {:?}", handle);
        handle
    }

    /// Remove a rigid body, handing it back
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self.bodies.remove(handle).ok_or(PhysicsError::BodyNotFound(handle))?;
        log::debug!("Removed rigid body {:?}", handle);
        Ok(body)
    }

    /// Get a rigid body
    pub fn body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get(handle).ok_or(PhysicsError::BodyNotFound(handle))
    }

    /// Get a rigid body mutably
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_mut(handle).ok_or(PhysicsError::BodyNotFound(handle))
    }

    /// Iterate all rigid bodies in update order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    // ==================== Simulation ====================

    /// Advance the simulation by `dt` seconds
    ///
    /// `dt` is clamped to `max_timestep`; zero, negative and non-finite
    /// values do nothing.
    pub fn update(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("Ignoring physics update with dt = {}", dt);
            return;
        }
        let dt = if dt > self.config.max_timestep {
            log::trace!("Clamping dt {} to {}", dt, self.config.max_timestep);
            self.config.max_timestep
        } else {
            dt
        };

        self.events.clear();
        self.world.begin_tick();

        let gravity = self.gravity;
        for (handle, body) in self.bodies.iter_mut() {
            iterate_body(&self.world, &self.config, gravity, handle, body, dt, &mut self.events);
        }
    }

    // ==================== Queries ====================

    /// Cast a ray through the voxel world
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f64) -> Result<Option<RaycastHit>> {
        self.raycast_with(origin, direction, RaycastOptions::default().with_max_distance(max_distance))
    }

    /// Cast a ray through the voxel world with explicit options
    pub fn raycast_with(&self, origin: Vec3, direction: Vec3, options: RaycastOptions) -> Result<Option<RaycastHit>> {
        query::raycast(|pos| self.world.voxel_aabbs(pos), origin, direction, options)
    }

    // ==================== Events ====================

    /// Get impact events from the last update
    pub fn collision_events(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.impacts()
    }

    /// Get auto-step events from the last update
    pub fn step_events(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.steps()
    }

    /// Receive every future event on a channel
    pub fn subscribe(&mut self) -> Receiver<CollisionEvent> {
        self.events.subscribe()
    }

    // ==================== Debug ====================

    /// Get number of rigid bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get number of awake, non-static bodies
    pub fn active_body_count(&self) -> usize {
        self.bodies
            .iter()
            .filter(|(_, b)| !b.is_static() && !b.is_sleeping())
            .count()
    }
}

impl<W: VoxelWorld + Default> Default for PhysicsEngine<W> {
    fn default() -> Self {
        Self::new(EngineConfig::default(), W::default())
    }
}

/// Run one tick for one body
fn iterate_body<W: VoxelWorld>(
    world: &W,
    config: &EngineConfig,
    gravity: Vec3,
    handle: BodyHandle,
    body: &mut RigidBody,
    dt: f64,
    events: &mut EventCollector,
) {
    let old_resting = body.resting;

    if body.is_static() {
        body.velocity = Vec3::ZERO;
        body.forces = Vec3::ZERO;
        body.impulses = Vec3::ZERO;
        return;
    }

    let no_gravity = gravity.length_squared() * body.gravity_multiplier == 0.0;
    if dynamics::body_asleep(world, body, gravity, dt, config.sweep_epsilon, no_gravity) {
        return;
    }
    body.sleep_frame_count = body.sleep_frame_count.saturating_sub(1);

    dynamics::apply_fluid_forces(world, body, gravity, config.fluid_density);

    // a = F/m + g, dv = I/m + a*dt
    let accel = body.forces / body.mass + gravity * body.gravity_multiplier;
    let dv = body.impulses / body.mass + accel * dt;
    body.velocity += dv;

    if body.friction != 0.0 {
        for axis in Axis::ALL {
            dynamics::apply_friction_by_axis(axis, body, dv);
        }
    }
    dynamics::apply_drag(body, config, dt);

    let dx = body.velocity * dt;
    body.forces = Vec3::ZERO;
    body.impulses = Vec3::ZERO;

    let pre_move = body.auto_step.then_some(body.aabb);

    let mut resting = [0i8; 3];
    dynamics::process_collisions(world, &mut body.aabb, dx, &mut resting, config.sweep_epsilon);
    body.resting = resting;

    if let Some(old) = pre_move {
        if dynamics::try_auto_step(world, body, old, dx, config.auto_step_cutoff, config.sweep_epsilon) {
            log::trace!("Rigid body {:?} stepped up to y = {}", handle, body.aabb.min.y);
            if let Some(on_step) = body.on_step.as_mut() {
                on_step();
            }
            events.record(CollisionEvent::stepped(handle));
        }
    }

    // Resting axes stop the body; newly resting ones register an impact
    let mut impacts = Impacts {
        impulse: Vec3::ZERO,
        axes: [false; 3],
    };
    for axis in Axis::ALL {
        let i = axis.index();
        if body.resting[i] != 0 {
            if old_resting[i] == 0 {
                impacts.impulse[axis] = -body.velocity[axis];
                impacts.axes[i] = true;
            }
            body.velocity[axis] = 0.0;
        }
    }

    let magnitude = impacts.impulse.length();
    if magnitude > IMPACT_EPSILON {
        // J = m * dv
        impacts.impulse *= body.mass;
        log::trace!("Rigid body {:?} impact {:?}", handle, impacts.impulse);
        if let Some(on_collide) = body.on_collide.as_mut() {
            on_collide(&impacts);
        }
        events.record(CollisionEvent::impact(handle, &impacts));

        if body.restitution > 0.0 && magnitude > config.min_bounce_impulse {
            body.apply_impulse(impacts.impulse * body.restitution);
        }
    }

    if body.velocity.length_squared() > ACTIVE_SPEED_SQ {
        body.mark_active();
    }
}
