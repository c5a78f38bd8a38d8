//! The set of loaded regions around the viewer.
//!
//! [`LodDimension`] keeps every region within a square radius of the viewer's
//! region. Each region sits behind its own lock so generation workers can
//! write to different regions in parallel while traversals read the rest.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::builder::{ColumnSample, build_chunk_level};
use crate::data_point::DataPoint;
use crate::detail_distance::DetailDistancePolicy;
use crate::error::{LodError, check_detail};
use crate::generation_mode::GenerationMode;
use crate::generation_requests::GenerationRequests;
use crate::level_pos::{CHUNK_DETAIL_LEVEL, LevelPos, REGION_DETAIL_LEVEL, RegionPos};
use crate::memory_budget::{MemoryBudgetConfig, MemoryBudgetTracker, select_evictions};
use crate::region::Region;
use crate::region_file::{RegionFileError, RegionFileStore};
use crate::render_selection::RenderSelection;

/// Shared handle to one loaded region.
pub type RegionHandle = Arc<RwLock<Region>>;

/// What a call to [`LodDimension::move_to`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveSummary {
    /// Regions created empty.
    pub created: usize,
    /// Regions read back from the store.
    pub loaded: usize,
    /// Regions dropped for being out of range.
    pub evicted: usize,
}

/// All loaded regions of one world.
pub struct LodDimension {
    policy: DetailDistancePolicy,
    radius: i32,
    regions: DashMap<RegionPos, RegionHandle>,
    center: Mutex<RegionPos>,
    budget: Mutex<MemoryBudgetTracker>,
    store: Option<RegionFileStore>,
}

fn read_region(region: &RwLock<Region>) -> RwLockReadGuard<'_, Region> {
    region.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_region(region: &RwLock<Region>) -> RwLockWriteGuard<'_, Region> {
    region.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LodDimension {
    /// Dimension keeping regions up to `radius` regions away from the viewer.
    pub fn new(policy: DetailDistancePolicy, radius: i32) -> Self {
        Self {
            policy,
            radius: radius.max(0),
            regions: DashMap::new(),
            center: Mutex::new(RegionPos::default()),
            budget: Mutex::new(MemoryBudgetTracker::default()),
            store: None,
        }
    }

    /// Persist evicted regions to `store` and load regions from it.
    #[must_use]
    pub fn with_store(mut self, store: RegionFileStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a memory budget for [`LodDimension::enforce_budget`].
    #[must_use]
    pub fn with_budget(mut self, config: MemoryBudgetConfig) -> Self {
        self.budget = Mutex::new(MemoryBudgetTracker::new(config));
        self
    }

    /// Distance policy in use.
    pub fn policy(&self) -> &DetailDistancePolicy {
        &self.policy
    }

    /// Loading radius in regions.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Region the viewer was last moved to.
    pub fn center(&self) -> RegionPos {
        *lock(&self.center)
    }

    /// Recenter on the viewer: load or create every region in range at the
    /// finest level its distance needs, resize the ones already loaded, and
    /// drop those out of range.
    pub fn move_to(&self, player_x: i32, player_z: i32) -> Result<MoveSummary, RegionFileError> {
        let center = RegionPos::from_column(player_x, player_z);
        *lock(&self.center) = center;
        let mut summary = MoveSummary::default();

        let out_of_range: Vec<RegionPos> = self
            .regions
            .iter()
            .filter(|entry| entry.key().grid_distance(center) > self.radius)
            .map(|entry| *entry.key())
            .collect();
        for pos in out_of_range {
            let Some(handle) = self.region(pos) else {
                continue;
            };
            if let Some(store) = &self.store {
                store.save(&read_region(&handle))?;
            }
            if self.regions.remove(&pos).is_some() {
                lock(&self.budget).on_region_unloaded(&pos);
                debug!(region = %pos, "evicted region");
                summary.evicted += 1;
            }
        }

        for x in (center.x - self.radius)..=(center.x + self.radius) {
            for z in (center.z - self.radius)..=(center.z + self.radius) {
                let pos = RegionPos::new(x, z);
                let distance = pos.root().min_distance(player_x, player_z);
                let retained = self.policy.required_retained_level(distance);

                if let Some(handle) = self.region(pos) {
                    let retained = self.budgeted_level(pos, retained);
                    let bytes = {
                        let mut region = write_region(&handle);
                        resize(&mut region, retained)?;
                        region.min_memory_needed()
                    };
                    lock(&self.budget).on_region_resized(pos, bytes);
                    continue;
                }

                let region = match self.load(pos)? {
                    Some(mut region) => {
                        resize(&mut region, retained)?;
                        summary.loaded += 1;
                        region
                    }
                    None => {
                        summary.created += 1;
                        Region::new(retained, pos, GenerationMode::None)?
                    }
                };
                debug!(region = %pos, min_detail = region.min_detail_level(), "loaded region");
                lock(&self.budget).on_region_resized(pos, region.min_memory_needed());
                self.regions.insert(pos, Arc::new(RwLock::new(region)));
            }
        }
        Ok(summary)
    }

    /// The level a loaded region may be resized to: `retained`, unless a
    /// budget cut left it coarser and regrowing would exceed the budget.
    fn budgeted_level(&self, pos: RegionPos, retained: u8) -> u8 {
        let mut budget = lock(&self.budget);
        let Some(floor) = budget.floor(&pos) else {
            return retained;
        };
        if retained >= floor || budget.fits(&pos, Region::memory_needed_at(retained)) {
            budget.clear_floor(&pos);
            return retained;
        }
        floor
    }

    fn load(&self, pos: RegionPos) -> Result<Option<Region>, RegionFileError> {
        match &self.store {
            Some(store) => store.load(pos),
            None => Ok(None),
        }
    }

    /// Handle to a loaded region.
    pub fn region(&self, pos: RegionPos) -> Option<RegionHandle> {
        self.regions.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of loaded regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Bytes held by every loaded region.
    pub fn memory_bytes(&self) -> usize {
        self.regions
            .iter()
            .map(|entry| read_region(entry.value()).min_memory_needed())
            .sum()
    }

    /// Store one generated record and refresh its aggregates.
    ///
    /// A write for a region that is not loaded, or finer than the region
    /// keeps, is a stale request and returns `Ok(false)`. Existing records are
    /// only replaced by data whose mode overrides them.
    pub fn write(
        &self,
        detail: u8,
        x: i32,
        z: i32,
        point: DataPoint,
        mode: GenerationMode,
    ) -> Result<bool, LodError> {
        check_detail(detail)?;
        let pos = LevelPos::new(detail, x, z);
        let Some(handle) = self.region(pos.region()) else {
            debug!(%pos, "dropped write for unloaded region");
            return Ok(false);
        };
        let mut region = write_region(&handle);
        if detail < region.min_detail_level() {
            debug!(%pos, min_detail = region.min_detail_level(), "dropped write below region minimum");
            return Ok(false);
        }
        let stored = region.write(detail, x, z, point, mode.overrides_existing())?;
        if stored {
            region.raise_generation_mode(mode);
        }
        Ok(stored)
    }

    /// Store a generated chunk at the finest level its region keeps, then
    /// refresh the aggregates once. Returns the number of records stored.
    pub fn write_chunk(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        samples: &[ColumnSample],
        mode: GenerationMode,
    ) -> Result<usize, LodError> {
        let region_pos = RegionPos::from_chunk(chunk_x, chunk_z);
        let Some(handle) = self.region(region_pos) else {
            debug!(chunk_x, chunk_z, "dropped chunk for unloaded region");
            return Ok(0);
        };
        let mut region = write_region(&handle);
        let detail = region.min_detail_level();
        if detail > CHUNK_DETAIL_LEVEL {
            debug!(chunk_x, chunk_z, min_detail = detail, "dropped chunk finer than region minimum");
            return Ok(0);
        }

        let mut stored = 0;
        for (pos, point) in build_chunk_level(chunk_x, chunk_z, samples, detail)? {
            if region.add_data(pos.detail, pos.x, pos.z, point, mode.overrides_existing())? {
                stored += 1;
            }
        }
        if stored > 0 {
            region.update_area(CHUNK_DETAIL_LEVEL, chunk_x, chunk_z)?;
            region.raise_generation_mode(mode);
        }
        Ok(stored)
    }

    /// Whether a record exists. Unloaded regions hold nothing.
    pub fn does_data_exist(&self, detail: u8, x: i32, z: i32) -> bool {
        let pos = LevelPos::new(detail, x, z);
        self.region(pos.region())
            .is_some_and(|handle| read_region(&handle).does_data_exist(detail, x, z))
    }

    /// Record at a position, [`DataPoint::EMPTY`] for unloaded regions.
    pub fn get_data(&self, detail: u8, x: i32, z: i32) -> Result<DataPoint, LodError> {
        check_detail(detail)?;
        let pos = LevelPos::new(detail, x, z);
        match self.region(pos.region()) {
            Some(handle) => read_region(&handle).get_data(detail, x, z),
            None => Ok(DataPoint::EMPTY),
        }
    }

    /// The `capacity` most urgent generation requests across all regions.
    pub fn data_to_generate(&self, player_x: i32, player_z: i32, capacity: usize) -> GenerationRequests {
        let mut requests = GenerationRequests::new(capacity, player_x, player_z);
        for handle in self.handles() {
            read_region(&handle).data_to_generate(&self.policy, &mut requests, player_x, player_z);
        }
        trace!(requests = requests.len(), "collected generation requests");
        requests
    }

    /// Nodes to draw across all regions.
    pub fn data_to_render(&self, player_x: i32, player_z: i32) -> RenderSelection {
        let mut selection = RenderSelection::new();
        for handle in self.handles() {
            read_region(&handle).data_to_render(&self.policy, &mut selection, player_x, player_z);
        }
        trace!(nodes = selection.len(), "collected render selection");
        selection
    }

    /// Snapshot of the region handles so no map shard stays locked while a
    /// region is traversed.
    fn handles(&self) -> Vec<RegionHandle> {
        self.regions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Write every loaded region to the store. Returns how many were saved.
    pub fn save_all(&self) -> Result<usize, RegionFileError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let handles = self.handles();
        for handle in &handles {
            store.save(&read_region(handle))?;
        }
        Ok(handles.len())
    }

    /// Drop the finest level of the farthest regions until the memory budget
    /// holds. Returns the regions that were shrunk.
    pub fn enforce_budget(&self) -> Result<Vec<RegionPos>, LodError> {
        let center = self.center();
        let mut shrunk = Vec::new();
        let mut budget = lock(&self.budget);
        while budget.is_over_budget() {
            let mut progressed = false;
            for pos in select_evictions(&budget, center) {
                let Some(handle) = self.region(pos) else {
                    budget.on_region_unloaded(&pos);
                    progressed = true;
                    continue;
                };
                let mut region = write_region(&handle);
                let min = region.min_detail_level();
                if min < REGION_DETAIL_LEVEL {
                    region.cut_tree(min + 1)?;
                    budget.on_region_resized(pos, region.min_memory_needed());
                    budget.set_floor(pos, min + 1);
                    shrunk.push(pos);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        if !shrunk.is_empty() {
            debug!(regions = shrunk.len(), bytes = budget.total_bytes(), "shrank regions over budget");
        }
        Ok(shrunk)
    }
}

/// Make `retained` the region's finest level.
fn resize(region: &mut Region, retained: u8) -> Result<(), LodError> {
    let min = region.min_detail_level();
    if retained < min {
        region.expand(retained)
    } else if retained > min {
        region.cut_tree(retained)
    } else {
        Ok(())
    }
}
