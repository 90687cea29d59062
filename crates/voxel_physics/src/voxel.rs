//! The voxel world as seen by the physics engine
//!
//! The engine never stores voxels. It asks a [`VoxelWorld`] two questions
//! about a cell: which solid boxes it contains, and whether it holds fluid.
//! Both answers must be stable for the duration of a tick.

use parking_lot::Mutex;
use std::collections::HashMap;
use voxel_math::{IVec3, AABB};

/// Voxel queries the engine needs from the embedding application
pub trait VoxelWorld {
    /// Solid geometry in the cell at `pos`, in cell-local coordinates
    /// (`[0, 1]` spans the whole cell). An empty list is an empty cell.
    fn voxel_aabbs(&self, pos: IVec3) -> Vec<AABB>;

    /// Whether the cell at `pos` holds fluid
    fn is_fluid(&self, pos: IVec3) -> bool;

    /// Whether the cell at `pos` holds any solid geometry
    fn is_solid(&self, pos: IVec3) -> bool {
        !self.voxel_aabbs(pos).is_empty()
    }

    /// Called once at the start of every engine tick
    fn begin_tick(&self) {}
}

impl<W: VoxelWorld + ?Sized> VoxelWorld for &W {
    fn voxel_aabbs(&self, pos: IVec3) -> Vec<AABB> {
        (**self).voxel_aabbs(pos)
    }

    fn is_fluid(&self, pos: IVec3) -> bool {
        (**self).is_fluid(pos)
    }

    fn is_solid(&self, pos: IVec3) -> bool {
        (**self).is_solid(pos)
    }

    fn begin_tick(&self) {
        (**self).begin_tick()
    }
}

impl<W: VoxelWorld + ?Sized> VoxelWorld for Box<W> {
    fn voxel_aabbs(&self, pos: IVec3) -> Vec<AABB> {
        (**self).voxel_aabbs(pos)
    }

    fn is_fluid(&self, pos: IVec3) -> bool {
        (**self).is_fluid(pos)
    }

    fn is_solid(&self, pos: IVec3) -> bool {
        (**self).is_solid(pos)
    }

    fn begin_tick(&self) {
        (**self).begin_tick()
    }
}

/// A [`VoxelWorld`] built from two closures
pub struct FnVoxelWorld<A, F> {
    get_voxel_aabbs: A,
    get_fluid_at: F,
}

impl<A, F> FnVoxelWorld<A, F>
where
    A: Fn(IVec3) -> Vec<AABB>,
    F: Fn(IVec3) -> bool,
{
    pub fn new(get_voxel_aabbs: A, get_fluid_at: F) -> Self {
        Self {
            get_voxel_aabbs,
            get_fluid_at,
        }
    }
}

impl<A> FnVoxelWorld<A, fn(IVec3) -> bool>
where
    A: Fn(IVec3) -> Vec<AABB>,
{
    /// World with solid geometry only
    pub fn solid_only(get_voxel_aabbs: A) -> Self {
        Self::new(get_voxel_aabbs, |_| false)
    }
}

impl<A, F> VoxelWorld for FnVoxelWorld<A, F>
where
    A: Fn(IVec3) -> Vec<AABB>,
    F: Fn(IVec3) -> bool,
{
    fn voxel_aabbs(&self, pos: IVec3) -> Vec<AABB> {
        (self.get_voxel_aabbs)(pos)
    }

    fn is_fluid(&self, pos: IVec3) -> bool {
        (self.get_fluid_at)(pos)
    }
}

/// Memoizes another world's answers until the next tick
///
/// Sweeps query the same cells many times per tick; wrap an expensive world
/// (chunk lookups, block registries) in this to pay for each cell once.
pub struct CachedVoxelWorld<W> {
    inner: W,
    aabbs: Mutex<HashMap<IVec3, Vec<AABB>>>,
    fluid: Mutex<HashMap<IVec3, bool>>,
}

impl<W: VoxelWorld> CachedVoxelWorld<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            aabbs: Mutex::new(HashMap::new()),
            fluid: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped world
    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// Drop every cached answer
    pub fn invalidate(&self) {
        self.aabbs.lock().clear();
        self.fluid.lock().clear();
    }

    /// Number of cells with cached geometry
    pub fn cached_cells(&self) -> usize {
        self.aabbs.lock().len()
    }
}

impl<W: VoxelWorld> VoxelWorld for CachedVoxelWorld<W> {
    fn voxel_aabbs(&self, pos: IVec3) -> Vec<AABB> {
        if let Some(boxes) = self.aabbs.lock().get(&pos) {
            return boxes.clone();
        }
        // Not holding the lock while the inner world runs
        let boxes = self.inner.voxel_aabbs(pos);
        self.aabbs.lock().insert(pos, boxes.clone());
        boxes
    }

    fn is_fluid(&self, pos: IVec3) -> bool {
        if let Some(&fluid) = self.fluid.lock().get(&pos) {
            return fluid;
        }
        let fluid = self.inner.is_fluid(pos);
        self.fluid.lock().insert(pos, fluid);
        fluid
    }

    fn begin_tick(&self) {
        self.invalidate();
        self.inner.begin_tick();
    }
}
