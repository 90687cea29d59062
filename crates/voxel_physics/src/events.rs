//! Physics events (impacts, auto-steps)

use crate::body::{BodyHandle, Impacts};
use crossbeam_channel::{Receiver, Sender};
use voxel_math::{Axis, Vec3};

/// Type of collision event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventType {
    /// Body hit voxel geometry hard enough to register an impulse
    Impact,
    /// Body climbed a ledge by auto-stepping
    Stepped,
}

/// Something that happened to a body during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Body the event happened to
    pub body: BodyHandle,
    /// Event type
    pub event_type: CollisionEventType,
    /// Impulse taken from the collision; zero for steps
    pub impulse: Vec3,
    /// Axes newly collided along; none for steps
    pub axes: [bool; 3],
}

impl CollisionEvent {
    pub(crate) fn impact(body: BodyHandle, impacts: &Impacts) -> Self {
        Self {
            body,
            event_type: CollisionEventType::Impact,
            impulse: impacts.impulse,
            axes: impacts.axes,
        }
    }

    pub(crate) fn stepped(body: BodyHandle) -> Self {
        Self {
            body,
            event_type: CollisionEventType::Stepped,
            impulse: Vec3::ZERO,
            axes: [false; 3],
        }
    }

    /// Check if this is an impact event
    pub fn is_impact(&self) -> bool {
        self.event_type == CollisionEventType::Impact
    }

    /// Check if this is an auto-step event
    pub fn is_step(&self) -> bool {
        self.event_type == CollisionEventType::Stepped
    }

    /// Whether the body hit something along `axis`
    pub fn hit(&self, axis: Axis) -> bool {
        self.axes[axis.index()]
    }
}

/// Collects the events of the last tick and forwards them to subscribers
#[derive(Default)]
pub struct EventCollector {
    /// Events from the last tick
    pub collision_events: Vec<CollisionEvent>,
    subscribers: Vec<Sender<CollisionEvent>>,
}

impl EventCollector {
    /// Create a new event collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the events of the last tick
    pub fn clear(&mut self) {
        self.collision_events.clear();
    }

    /// Store an event and send it to every live subscriber
    pub fn record(&mut self, event: CollisionEvent) {
        self.collision_events.push(event);
        // Receivers that were dropped are forgotten
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Receive every future event on a channel
    pub fn subscribe(&mut self) -> Receiver<CollisionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Number of subscribers still connected as of the last event
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Impact events of the last tick
    pub fn impacts(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.collision_events.iter().filter(|e| e.is_impact())
    }

    /// Auto-step events of the last tick
    pub fn steps(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.collision_events.iter().filter(|e| e.is_step())
    }
}
