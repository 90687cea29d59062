//! Swept AABB-vs-voxel collision
//!
//! Moves a box along a displacement through the voxel grid one cell boundary
//! at a time, in the manner of a DDA raycast driven by the box's leading
//! faces instead of a single point. Whenever a leading face enters a new
//! layer of cells, the part of that layer under the box's cross-section is
//! checked for solid geometry, and the exact distance at which the box would
//! touch each solid box found there is computed. The earliest contact wins.
//!
//! On contact the box is moved to the contact point, the collided face is
//! snapped onto the solid face (an integer boundary for whole voxels), and
//! the caller decides what happens next through [`SweepResponse`]: stop, or
//! continue along a new vector from the contact point. Zeroing the blocked
//! component and continuing is how bodies slide along walls.
//!
//! Faces are converted to cell indices with a floor biased by `epsilon` in
//! the direction of travel, so a face lying exactly on a boundary counts as
//! just behind it. A box resting on a floor therefore doesn't collide with
//! the floor when it moves sideways. Very small or very large displacements
//! relative to `epsilon` can still defeat the bias.

use voxel_math::{Axis, IVec3, Vec3, AABB};

/// Default boundary bias
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Sweep options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepOptions {
    /// Move the caller's box to the resolved position
    pub translate: bool,
    /// Boundary bias, see the module docs
    pub epsilon: f64,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            translate: true,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl SweepOptions {
    /// Resolve without moving the caller's box
    pub fn probe() -> Self {
        Self {
            translate: false,
            ..Default::default()
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// A contact reported to the sweep callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepCollision {
    /// Distance travelled so far, summed over every re-sweep
    pub cumulative_distance: f64,
    /// Axis of the face that made contact
    pub axis: Axis,
    /// Direction of travel on `axis`: `1` or `-1`
    pub direction: i8,
    /// Part of the current vector not yet travelled
    pub remaining: Vec3,
}

impl SweepCollision {
    /// `remaining` with the blocked component removed, for sliding
    pub fn slide(&self) -> Vec3 {
        let mut v = self.remaining;
        v[self.axis] = 0.0;
        v
    }
}

/// What the resolver does after a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepResponse {
    /// End the sweep; the box stays at the contact point
    Stop,
    /// Start a new sweep from the contact point along this vector
    Continue(Vec3),
}

/// Sweep `aabb` by `displacement` through a grid of whole solid voxels
///
/// Returns the total distance travelled, which differs from the length of
/// the net displacement once a contact bends the path.
pub fn sweep<S, C>(
    mut is_solid: S,
    aabb: &mut AABB,
    displacement: Vec3,
    on_collide: C,
    options: SweepOptions,
) -> f64
where
    S: FnMut(IVec3) -> bool,
    C: FnMut(&SweepCollision) -> SweepResponse,
{
    sweep_geometry(
        |pos| {
            if is_solid(pos) {
                vec![AABB::UNIT]
            } else {
                Vec::new()
            }
        },
        aabb,
        displacement,
        on_collide,
        options,
    )
}

/// Sweep `aabb` by `displacement` through voxels made of solid sub-boxes
///
/// `geometry` returns the solid boxes of a cell in cell-local coordinates.
pub fn sweep_geometry<G, C>(
    geometry: G,
    aabb: &mut AABB,
    displacement: Vec3,
    on_collide: C,
    options: SweepOptions,
) -> f64
where
    G: FnMut(IVec3) -> Vec<AABB>,
    C: FnMut(&SweepCollision) -> SweepResponse,
{
    let mut resolved = *aabb;
    let distance = Sweeper::new(geometry, on_collide, options.epsilon).run(&mut resolved, displacement);

    if options.translate {
        // Copy the leading face exactly and keep the caller's size; the
        // resolved copy's size may have drifted by the snap
        for axis in Axis::ALL {
            let extent = aabb.extent(axis);
            if displacement[axis] > 0.0 {
                if resolved.max[axis] != aabb.max[axis] {
                    aabb.set_max(axis, resolved.max[axis]).set_min(axis, resolved.max[axis] - extent);
                }
            } else if resolved.min[axis] != aabb.min[axis] {
                aabb.set_min(axis, resolved.min[axis]).set_max(axis, resolved.min[axis] + extent);
            }
        }
    }

    distance
}

#[inline]
fn lead_edge_to_int(coord: f64, step: i32, epsilon: f64) -> i32 {
    (coord - step as f64 * epsilon).floor() as i32
}

#[inline]
fn trail_edge_to_int(coord: f64, step: i32, epsilon: f64) -> i32 {
    (coord + step as f64 * epsilon).floor() as i32
}

/// Inclusive cell range from the trailing to the leading cell, if the box
/// covers any cell on this axis
#[inline]
fn span(trail: i32, lead: i32, step: i32) -> Option<(i32, i32)> {
    if step > 0 {
        (trail <= lead).then_some((trail, lead))
    } else {
        (trail >= lead).then_some((lead, trail))
    }
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    /// Distance from the sweep start
    t: f64,
    axis: Axis,
    /// Coordinate of the solid face that was touched
    face: f64,
}

/// Distance along `normed` at which `start` first touches `solid`
///
/// Touching within `epsilon` at the start counts as contact at distance 0;
/// deeper initial overlap is ignored, as is merely grazing a face on an
/// axis the box isn't moving along.
fn time_of_contact(start: &AABB, normed: Vec3, solid: &AABB, epsilon: f64, max_t: f64) -> Option<Contact> {
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut enter_axis = None;

    for axis in Axis::ALL {
        let n = normed[axis];
        if n == 0.0 {
            if start.max[axis] <= solid.min[axis] + epsilon || start.min[axis] >= solid.max[axis] - epsilon {
                return None;
            }
            continue;
        }

        let (enter, exit) = if n > 0.0 {
            ((solid.min[axis] - start.max[axis]) / n, (solid.max[axis] - start.min[axis]) / n)
        } else {
            ((solid.max[axis] - start.min[axis]) / n, (solid.min[axis] - start.max[axis]) / n)
        };
        if enter > t_enter {
            t_enter = enter;
            enter_axis = Some(axis);
        }
        t_exit = t_exit.min(exit);
    }

    let axis = enter_axis?;
    let slack = epsilon / normed[axis].abs();
    if t_enter < -slack || t_enter > max_t || t_exit <= t_enter.max(0.0) {
        return None;
    }

    let face = if normed[axis] > 0.0 {
        solid.min[axis]
    } else {
        solid.max[axis]
    };
    Some(Contact {
        t: t_enter.max(0.0),
        axis,
        face,
    })
}

struct Sweeper<G, C> {
    geometry: G,
    on_collide: C,
    epsilon: f64,

    vec: Vec3,
    max_t: f64,
    t: f64,
    cumulative: f64,
    start: AABB,

    step: IVec3,
    normed: Vec3,
    t_delta: Vec3,
    t_next: Vec3,
    trail: Vec3,
    lead_int: IVec3,
    trail_int: IVec3,

    contact: Option<Contact>,
}

impl<G, C> Sweeper<G, C>
where
    G: FnMut(IVec3) -> Vec<AABB>,
    C: FnMut(&SweepCollision) -> SweepResponse,
{
    fn new(geometry: G, on_collide: C, epsilon: f64) -> Self {
        Self {
            geometry,
            on_collide,
            epsilon,
            vec: Vec3::ZERO,
            max_t: 0.0,
            t: 0.0,
            cumulative: 0.0,
            start: AABB::UNIT,
            step: IVec3::ZERO,
            normed: Vec3::ZERO,
            t_delta: Vec3::ZERO,
            t_next: Vec3::ZERO,
            trail: Vec3::ZERO,
            lead_int: IVec3::ZERO,
            trail_int: IVec3::ZERO,
            contact: None,
        }
    }

    fn run(mut self, aabb: &mut AABB, displacement: Vec3) -> f64 {
        self.vec = displacement;
        self.init(aabb);
        if self.max_t == 0.0 {
            return 0.0;
        }

        loop {
            let axis = self.next_axis();
            let boundary = self.t_next[axis];

            if let Some(contact) = self.contact {
                if contact.t <= boundary {
                    if self.collide(aabb, contact) {
                        return self.cumulative;
                    }
                    continue;
                }
            }

            if boundary > self.max_t {
                break;
            }
            self.step_forward(axis);
            self.scan_layer(axis);
        }

        // Reached the end of the vector unobstructed
        self.cumulative += self.max_t;
        aabb.translate(self.vec);
        self.cumulative
    }

    /// Set up a sweep of `self.vec` starting from `aabb`
    fn init(&mut self, aabb: &AABB) {
        self.t = 0.0;
        self.contact = None;
        self.start = *aabb;
        self.max_t = self.vec.length();
        if self.max_t == 0.0 {
            return;
        }

        for axis in Axis::ALL {
            let positive = self.vec[axis] >= 0.0;
            let step = if positive { 1 } else { -1 };
            self.step[axis] = step;

            let (min, max) = (aabb.min[axis], aabb.max[axis]);
            let lead = if positive { max } else { min };
            self.trail[axis] = if positive { min } else { max };
            self.lead_int[axis] = lead_edge_to_int(lead, step, self.epsilon);
            self.trail_int[axis] = trail_edge_to_int(self.trail[axis], step, self.epsilon);

            self.normed[axis] = self.vec[axis] / self.max_t;
            // Distance along the vector to cross one cell on this axis
            self.t_delta[axis] = (1.0 / self.normed[axis]).abs();

            let dist = if positive {
                self.lead_int[axis] as f64 + 1.0 - lead
            } else {
                lead - self.lead_int[axis] as f64
            };
            self.t_next[axis] = if self.t_delta[axis].is_finite() {
                self.t_delta[axis] * dist
            } else {
                f64::INFINITY
            };
        }

        // Partial geometry in cells the box already overlaps can still be hit
        if let (Some(x), Some(y), Some(z)) = (
            span(self.trail_int.x, self.lead_int.x, self.step.x),
            span(self.trail_int.y, self.lead_int.y, self.step.y),
            span(self.trail_int.z, self.lead_int.z, self.step.z),
        ) {
            self.scan(x, y, z);
        }
    }

    fn next_axis(&self) -> Axis {
        let t = self.t_next;
        if t.x < t.y {
            if t.x < t.z { Axis::X } else { Axis::Z }
        } else if t.y < t.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Advance to the next boundary on `axis`
    fn step_forward(&mut self, axis: Axis) {
        let dt = self.t_next[axis] - self.t;
        self.t = self.t_next[axis];
        self.lead_int[axis] += self.step[axis];
        self.t_next[axis] += self.t_delta[axis];

        for a in Axis::ALL {
            self.trail[a] += dt * self.normed[a];
            self.trail_int[a] = trail_edge_to_int(self.trail[a], self.step[a], self.epsilon);
        }
    }

    /// Check the layer the leading face on `axis` just entered
    fn scan_layer(&mut self, axis: Axis) {
        let mut ranges = [(0, 0); 3];
        for a in Axis::ALL {
            ranges[a.index()] = if a == axis {
                (self.lead_int[a], self.lead_int[a])
            } else {
                match span(self.trail_int[a], self.lead_int[a], self.step[a]) {
                    Some(range) => range,
                    None => return,
                }
            };
        }
        self.scan(ranges[0], ranges[1], ranges[2]);
    }

    fn scan(&mut self, x: (i32, i32), y: (i32, i32), z: (i32, i32)) {
        for cx in x.0..=x.1 {
            for cy in y.0..=y.1 {
                for cz in z.0..=z.1 {
                    let cell = IVec3::new(cx, cy, cz);
                    for local in (self.geometry)(cell) {
                        let solid = local.translated(cell.as_vec3());
                        let found = time_of_contact(&self.start, self.normed, &solid, self.epsilon, self.max_t);
                        if let Some(found) = found {
                            if self.contact.map_or(true, |best| found.t < best.t) {
                                self.contact = Some(found);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Move to `contact` and ask the callback how to go on. Returns true when
    /// the sweep is over.
    fn collide(&mut self, aabb: &mut AABB, contact: Contact) -> bool {
        self.cumulative += contact.t;

        let done = contact.t / self.max_t;
        let mut remaining = Vec3::ZERO;
        for axis in Axis::ALL {
            let dv = self.vec[axis] * done;
            aabb.translate_axis(axis, dv);
            remaining[axis] = self.vec[axis] - dv;
        }

        // Snap the collided face onto the solid face so positions don't creep
        let direction = self.step[contact.axis];
        if direction > 0 {
            aabb.set_max(contact.axis, contact.face);
        } else {
            aabb.set_min(contact.axis, contact.face);
        }

        let collision = SweepCollision {
            cumulative_distance: self.cumulative,
            axis: contact.axis,
            direction: direction as i8,
            remaining,
        };

        match (self.on_collide)(&collision) {
            SweepResponse::Stop => true,
            SweepResponse::Continue(next) => {
                self.vec = next;
                self.init(aabb);
                self.max_t == 0.0
            }
        }
    }
}
