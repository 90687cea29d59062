//! Rigid body types and the body set

use serde::{Deserialize, Serialize};
use std::fmt;
use voxel_math::{Axis, Vec3, AABB};

/// Callback fired with a body's collision impacts
pub type CollideCallback = Box<dyn FnMut(&Impacts) + Send>;

/// Callback fired when a body auto-steps onto a ledge
pub type StepCallback = Box<dyn FnMut() + Send>;

/// Handle to a rigid body in the physics engine
///
/// Handles are generational: once a body is removed its handle never
/// refers to another body, even when the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Slot index in the body set
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Velocity change a body took from hitting voxel geometry this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impacts {
    /// Impulse (mass times velocity change), per axis
    pub impulse: Vec3,
    /// Axes the body started resting on this tick
    pub axes: [bool; 3],
}

impl Impacts {
    /// Whether the body newly collided along `axis`
    pub fn hit(&self, axis: Axis) -> bool {
        self.axes[axis.index()]
    }

    /// Magnitude of the impulse
    pub fn magnitude(&self) -> f64 {
        self.impulse.length()
    }
}

/// Description for creating a rigid body
#[derive(Serialize, Deserialize)]
pub struct RigidBodyDesc {
    /// Initial bounding box
    pub aabb: AABB,
    /// Mass; zero or less makes the body static
    pub mass: f64,
    /// Friction coefficient against resting surfaces
    pub friction: f64,
    /// Fraction of a collision impulse returned as a bounce
    pub restitution: f64,
    /// Gravity scale (0 = no gravity, 1 = normal, 2 = double)
    pub gravity_multiplier: f64,
    /// Climb one-voxel ledges automatically
    pub auto_step: bool,
    /// Air drag override; `None` uses the engine's
    pub air_drag: Option<f64>,
    /// Fluid drag override; `None` uses the engine's
    pub fluid_drag: Option<f64>,
    /// Idle ticks before sleeping; `None` uses the engine's
    pub sleep_frames: Option<u32>,
    /// Initial velocity
    pub velocity: Vec3,
    #[serde(skip)]
    pub(crate) on_collide: Option<CollideCallback>,
    #[serde(skip)]
    pub(crate) on_step: Option<StepCallback>,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self::new(AABB::UNIT)
    }
}

impl fmt::Debug for RigidBodyDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBodyDesc")
            .field("aabb", &self.aabb)
            .field("mass", &self.mass)
            .field("friction", &self.friction)
            .field("restitution", &self.restitution)
            .field("gravity_multiplier", &self.gravity_multiplier)
            .field("auto_step", &self.auto_step)
            .field("air_drag", &self.air_drag)
            .field("fluid_drag", &self.fluid_drag)
            .field("sleep_frames", &self.sleep_frames)
            .field("velocity", &self.velocity)
            .field("on_collide", &self.on_collide.is_some())
            .field("on_step", &self.on_step.is_some())
            .finish()
    }
}

impl RigidBodyDesc {
    /// Dynamic body occupying `aabb`
    pub fn new(aabb: AABB) -> Self {
        Self {
            aabb,
            mass: 1.0,
            friction: 1.0,
            restitution: 0.0,
            gravity_multiplier: 1.0,
            auto_step: false,
            air_drag: None,
            fluid_drag: None,
            sleep_frames: None,
            velocity: Vec3::ZERO,
            on_collide: None,
            on_step: None,
        }
    }

    /// Static body occupying `aabb`
    pub fn fixed(aabb: AABB) -> Self {
        Self::new(aabb).with_mass(0.0)
    }

    /// Body of `size` with its min corner at `position`
    pub fn from_position_size(position: Vec3, size: Vec3) -> Self {
        Self::new(AABB::from_position_size(position, size))
    }

    /// Set mass
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Set friction
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set gravity scale
    pub fn with_gravity_multiplier(mut self, multiplier: f64) -> Self {
        self.gravity_multiplier = multiplier;
        self
    }

    /// Enable or disable auto-stepping
    pub fn with_auto_step(mut self, auto_step: bool) -> Self {
        self.auto_step = auto_step;
        self
    }

    /// Override air drag
    pub fn with_air_drag(mut self, drag: f64) -> Self {
        self.air_drag = Some(drag);
        self
    }

    /// Override fluid drag
    pub fn with_fluid_drag(mut self, drag: f64) -> Self {
        self.fluid_drag = Some(drag);
        self
    }

    /// Override idle ticks before sleeping; at least one tick is always kept
    pub fn with_sleep_frames(mut self, frames: u32) -> Self {
        self.sleep_frames = Some(frames);
        self
    }

    /// Set initial velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Call `f` whenever the body hits voxel geometry
    pub fn on_collide<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Impacts) + Send + 'static,
    {
        self.on_collide = Some(Box::new(f));
        self
    }

    /// Call `f` whenever the body auto-steps
    pub fn on_step<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_step = Some(Box::new(f));
        self
    }
}

/// A simulated box
pub struct RigidBody {
    pub(crate) aabb: AABB,
    pub(crate) velocity: Vec3,
    pub(crate) resting: [i8; 3],
    pub(crate) forces: Vec3,
    pub(crate) impulses: Vec3,
    pub(crate) in_fluid: bool,
    pub(crate) ratio_in_fluid: f64,
    pub(crate) sleep_frame_count: u32,

    /// Mass; zero or less makes the body static
    pub mass: f64,
    /// Friction coefficient against resting surfaces
    pub friction: f64,
    /// Fraction of a collision impulse returned as a bounce
    pub restitution: f64,
    /// Gravity scale
    pub gravity_multiplier: f64,
    /// Climb one-voxel ledges automatically
    pub auto_step: bool,
    /// Air drag override
    pub air_drag: Option<f64>,
    /// Fluid drag override
    pub fluid_drag: Option<f64>,
    /// Idle ticks before sleeping
    pub sleep_frames: u32,

    pub(crate) on_collide: Option<CollideCallback>,
    pub(crate) on_step: Option<StepCallback>,
}

impl fmt::Debug for RigidBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBody")
            .field("aabb", &self.aabb)
            .field("velocity", &self.velocity)
            .field("resting", &self.resting)
            .field("in_fluid", &self.in_fluid)
            .field("ratio_in_fluid", &self.ratio_in_fluid)
            .field("sleep_frame_count", &self.sleep_frame_count)
            .field("mass", &self.mass)
            .field("friction", &self.friction)
            .field("restitution", &self.restitution)
            .field("gravity_multiplier", &self.gravity_multiplier)
            .field("auto_step", &self.auto_step)
            .finish_non_exhaustive()
    }
}

impl RigidBody {
    pub(crate) fn from_desc(desc: RigidBodyDesc, default_sleep_frames: u32) -> Self {
        let sleep_frames = desc.sleep_frames.unwrap_or(default_sleep_frames).max(1);
        Self {
            aabb: desc.aabb,
            velocity: desc.velocity,
            resting: [0; 3],
            forces: Vec3::ZERO,
            impulses: Vec3::ZERO,
            in_fluid: false,
            ratio_in_fluid: 0.0,
            sleep_frame_count: sleep_frames,
            mass: desc.mass,
            friction: desc.friction,
            restitution: desc.restitution,
            gravity_multiplier: desc.gravity_multiplier,
            auto_step: desc.auto_step,
            air_drag: desc.air_drag,
            fluid_drag: desc.fluid_drag,
            sleep_frames,
            on_collide: desc.on_collide,
            on_step: desc.on_step,
        }
    }

    /// Min corner of the bounding box
    pub fn position(&self) -> Vec3 {
        self.aabb.min
    }

    /// Teleport the min corner to `position`, keeping the size
    pub fn set_position(&mut self, position: Vec3) {
        self.aabb.set_position(position);
        self.mark_active();
    }

    /// Bounding box
    pub fn aabb(&self) -> &AABB {
        &self.aabb
    }

    /// Add a force, applied over the next tick
    pub fn apply_force(&mut self, force: Vec3) {
        self.forces += force;
        self.mark_active();
    }

    /// Add an impulse, applied at the next tick
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.impulses += impulse;
        self.mark_active();
    }

    /// Linear velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Set linear velocity
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.mark_active();
    }

    /// Resting direction per axis: `0` free, `-1` supported from below
    /// (or the negative side), `1` blocked on the positive side
    pub fn resting(&self) -> [i8; 3] {
        self.resting
    }

    /// Resting direction on one axis
    pub fn resting_on(&self, axis: Axis) -> i8 {
        self.resting[axis.index()]
    }

    /// Whether the body is standing on something
    pub fn on_ground(&self) -> bool {
        self.resting[Axis::Y.index()] < 0
    }

    /// Whether the body's bottom touches fluid
    pub fn in_fluid(&self) -> bool {
        self.in_fluid
    }

    /// Submerged fraction of the body's height
    pub fn ratio_in_fluid(&self) -> f64 {
        self.ratio_in_fluid
    }

    /// Whether the body is asleep and skipped by the engine
    pub fn is_sleeping(&self) -> bool {
        self.sleep_frame_count == 0
    }

    /// Whether the body never moves
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// Wake the body and restart its idle countdown
    pub fn mark_active(&mut self) {
        // A zero countdown would leave the body asleep right away
        self.sleep_frame_count = self.sleep_frames.max(1);
    }
}

struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// Rigid bodies addressed by generational handles
///
/// Iteration follows slot order, which doesn't change while bodies are
/// being updated.
#[derive(Default)]
pub struct BodySet {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl BodySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body, reusing a free slot if there is one
    pub fn insert(&mut self, body: RigidBody) -> BodyHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle { index, generation: 0 }
    }

    /// Remove a body; stale handles return `None`
    pub fn remove(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(body)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate bodies in slot order
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    /// Iterate bodies mutably in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut RigidBody)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.body.as_mut().map(|body| {
                (
                    BodyHandle {
                        index: index as u32,
                        generation,
                    },
                    body,
                )
            })
        })
    }
}
