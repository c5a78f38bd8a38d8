//! Memory budget tracking and eviction for loaded regions.
//!
//! [`MemoryBudgetTracker`] keeps the approximate size of every loaded region
//! and [`select_evictions`] picks which ones to shrink when the budget is
//! exceeded.

use rustc_hash::FxHashMap;

use crate::level_pos::RegionPos;

/// Memory budget configuration.
#[derive(Clone, Debug)]
pub struct MemoryBudgetConfig {
    /// Maximum bytes for region records. Default: 256 MB.
    pub region_budget: usize,
}

impl Default for MemoryBudgetConfig {
    fn default() -> Self {
        Self {
            region_budget: 256 * 1024 * 1024,
        }
    }
}

impl MemoryBudgetConfig {
    /// Budget of `mb` megabytes.
    #[must_use]
    pub fn from_megabytes(mb: usize) -> Self {
        Self {
            region_budget: mb.saturating_mul(1024 * 1024),
        }
    }
}

/// Tracks memory usage across all loaded regions.
#[derive(Debug, Default)]
pub struct MemoryBudgetTracker {
    config: MemoryBudgetConfig,
    usage: FxHashMap<RegionPos, usize>,
    floors: FxHashMap<RegionPos, u8>,
    total_bytes: usize,
}

impl MemoryBudgetTracker {
    /// Create a new tracker with the given budget configuration.
    #[must_use]
    pub fn new(config: MemoryBudgetConfig) -> Self {
        Self {
            config,
            usage: FxHashMap::default(),
            floors: FxHashMap::default(),
            total_bytes: 0,
        }
    }

    /// Record the current size of a region, replacing any earlier entry.
    pub fn on_region_resized(&mut self, pos: RegionPos, bytes: usize) {
        if let Some(old) = self.usage.insert(pos, bytes) {
            self.total_bytes -= old;
        }
        self.total_bytes += bytes;
    }

    /// Record that a region has been unloaded.
    pub fn on_region_unloaded(&mut self, pos: &RegionPos) {
        if let Some(bytes) = self.usage.remove(pos) {
            self.total_bytes -= bytes;
        }
        self.floors.remove(pos);
    }

    /// Record that a region was cut to `detail` to stay within budget.
    pub fn set_floor(&mut self, pos: RegionPos, detail: u8) {
        self.floors.insert(pos, detail);
    }

    /// Finest level a region may regrow to without a budget check.
    #[must_use]
    pub fn floor(&self, pos: &RegionPos) -> Option<u8> {
        self.floors.get(pos).copied()
    }

    /// Forget the budget floor of a region.
    pub fn clear_floor(&mut self, pos: &RegionPos) {
        self.floors.remove(pos);
    }

    /// Whether the budget would still hold after `pos` grows to `bytes`.
    #[must_use]
    pub fn fits(&self, pos: &RegionPos, bytes: usize) -> bool {
        let current = self.region_bytes(pos).unwrap_or(0);
        self.total_bytes - current + bytes <= self.config.region_budget
    }

    /// Whether the budget is exceeded.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total_bytes > self.config.region_budget
    }

    /// Bytes over the budget, 0 when under.
    #[must_use]
    pub fn overage(&self) -> usize {
        self.total_bytes.saturating_sub(self.config.region_budget)
    }

    /// Total bytes currently tracked.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Number of regions currently tracked.
    #[must_use]
    pub fn loaded_region_count(&self) -> usize {
        self.usage.len()
    }

    /// Tracked size of one region.
    #[must_use]
    pub fn region_bytes(&self, pos: &RegionPos) -> Option<usize> {
        self.usage.get(pos).copied()
    }

    /// Current budget configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryBudgetConfig {
        &self.config
    }
}

/// Regions to shrink to get back under budget, farthest from `center` first.
///
/// Ties are broken by position so the order is stable between calls.
pub fn select_evictions(tracker: &MemoryBudgetTracker, center: RegionPos) -> Vec<RegionPos> {
    if !tracker.is_over_budget() {
        return Vec::new();
    }

    let mut candidates: Vec<_> = tracker.usage.iter().map(|(pos, bytes)| (*pos, *bytes)).collect();
    candidates.sort_by(|a, b| {
        center
            .grid_distance(b.0)
            .cmp(&center.grid_distance(a.0))
            .then_with(|| a.0.cmp(&b.0))
    });

    let target = tracker.overage();
    let mut freed = 0usize;
    let mut evictions = Vec::new();
    for (pos, bytes) in candidates {
        if freed >= target {
            break;
        }
        freed += bytes;
        evictions.push(pos);
    }
    evictions
}
