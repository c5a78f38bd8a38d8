//! Per-region quadtree of detail levels.
//!
//! A [`Region`] owns one [`LevelContainer`] per detail level from
//! `min_detail_level` up to [`REGION_DETAIL_LEVEL`]. Levels finer than the
//! minimum are not allocated. Every write is followed by bottom-up
//! aggregation so that coarser records always summarise their children, and
//! two top-down traversals turn a viewer position into generation requests
//! and a render selection.

mod aggregation;
mod traversal;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::data_point::DataPoint;
use crate::error::{LodError, check_detail};
use crate::generation_mode::GenerationMode;
use crate::level_container::LevelContainer;
use crate::level_pos::{
    DETAIL_LEVEL_COUNT, LevelPos, REGION_DETAIL_LEVEL, RegionPos, level_size, region_modulo,
};

/// Child offsets in the order used by existence masks.
pub(crate) const CHILD_OFFSETS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Mask value when all four children exist.
pub(crate) const ALL_CHILDREN: u8 = 0b1111;

/// Quadtree of packed records covering one 512x512 column region.
#[derive(Clone, Debug)]
pub struct Region {
    pos: RegionPos,
    min_detail_level: u8,
    generation_mode: GenerationMode,
    levels: [Option<LevelContainer>; DETAIL_LEVEL_COUNT],
}

impl Region {
    /// Create an empty region holding levels `min_detail_level..=REGION_DETAIL_LEVEL`.
    pub fn new(
        min_detail_level: u8,
        pos: RegionPos,
        generation_mode: GenerationMode,
    ) -> Result<Self, LodError> {
        check_detail(min_detail_level)?;
        let mut levels: [Option<LevelContainer>; DETAIL_LEVEL_COUNT] =
            std::array::from_fn(|_| None);
        for detail in min_detail_level..=REGION_DETAIL_LEVEL {
            levels[detail as usize] = Some(LevelContainer::new(detail)?);
        }
        Ok(Self {
            pos,
            min_detail_level,
            generation_mode,
            levels,
        })
    }

    /// Create a region seeded with its finest level and aggregate every
    /// coarser level from it.
    pub fn from_level(
        container: LevelContainer,
        pos: RegionPos,
        generation_mode: GenerationMode,
    ) -> Result<Self, LodError> {
        let detail = container.detail_level();
        let mut region = Self::new(detail, pos, generation_mode)?;
        region.levels[detail as usize] = Some(container);
        region.refresh_all();
        Ok(region)
    }

    /// Region-grid position.
    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    /// Finest level currently allocated.
    pub fn min_detail_level(&self) -> u8 {
        self.min_detail_level
    }

    /// Quality of the best data written so far.
    ///
    /// Kept for persistence and reporting. Whether a write replaces an
    /// existing record is decided per write by
    /// [`GenerationMode::overrides_existing`], never by this value.
    pub fn generation_mode(&self) -> GenerationMode {
        self.generation_mode
    }

    /// Record that data of `mode` has been written. Never lowers the mode.
    pub fn raise_generation_mode(&mut self, mode: GenerationMode) {
        self.generation_mode = self.generation_mode.max(mode);
    }

    /// The container for `detail`, if allocated.
    pub(crate) fn level_ref(&self, detail: u8) -> Option<&LevelContainer> {
        if detail < self.min_detail_level || detail > REGION_DETAIL_LEVEL {
            return None;
        }
        self.levels[detail as usize].as_ref()
    }

    fn check_owned(&self, detail: u8, x: i32, z: i32) -> Result<LevelPos, LodError> {
        let pos = LevelPos::new(detail, x, z);
        if pos.region() != self.pos {
            return Err(LodError::OutsideRegion {
                pos,
                region: self.pos,
            });
        }
        Ok(pos)
    }

    /// Store a record at an absolute level position.
    ///
    /// Returns `Ok(false)` without touching anything when a record already
    /// exists and `higher_quality` is false. The caller must aggregate
    /// afterwards; [`Region::write`] does both.
    pub fn add_data(
        &mut self,
        detail: u8,
        x: i32,
        z: i32,
        point: DataPoint,
        higher_quality: bool,
    ) -> Result<bool, LodError> {
        check_detail(detail)?;
        let min = self.min_detail_level;
        if detail < min {
            return Err(LodError::LevelBelowMinimum {
                requested: detail,
                minimum: min,
            });
        }
        let (lx, lz) = self.check_owned(detail, x, z)?.local();
        let Some(level) = self.levels[detail as usize].as_mut() else {
            return Err(LodError::LevelBelowMinimum {
                requested: detail,
                minimum: min,
            });
        };
        if level.get(lx, lz).exists() && !higher_quality {
            return Ok(false);
        }
        level.set(lx, lz, point);
        Ok(true)
    }

    /// Store a record and refresh every affected aggregate.
    pub fn write(
        &mut self,
        detail: u8,
        x: i32,
        z: i32,
        point: DataPoint,
        higher_quality: bool,
    ) -> Result<bool, LodError> {
        let stored = self.add_data(detail, x, z, point, higher_quality)?;
        if stored {
            self.update_area(detail, x, z)?;
        }
        Ok(stored)
    }

    /// Record at an absolute level position, [`DataPoint::EMPTY`] when the
    /// level is not allocated. Coordinates wrap into this region.
    pub fn get_data(&self, detail: u8, x: i32, z: i32) -> Result<DataPoint, LodError> {
        check_detail(detail)?;
        Ok(self.level_ref(detail).map_or(DataPoint::EMPTY, |level| {
            level.get(region_modulo(detail, x), region_modulo(detail, z))
        }))
    }

    /// Whether a record (void or not) exists at the position. Coordinates
    /// wrap into this region.
    pub fn does_data_exist(&self, detail: u8, x: i32, z: i32) -> bool {
        self.level_ref(detail).is_some_and(|level| {
            level
                .get(region_modulo(detail, x), region_modulo(detail, z))
                .exists()
        })
    }

    /// Existence by region-local index.
    #[inline]
    pub(crate) fn exists_local(&self, detail: u8, lx: usize, lz: usize) -> bool {
        self.level_ref(detail)
            .is_some_and(|level| level.get(lx, lz).exists())
    }

    /// Bitmask of which of the four children of a local node exist, in
    /// [`CHILD_OFFSETS`] order.
    pub(crate) fn child_mask(&self, detail: u8, lx: usize, lz: usize) -> u8 {
        if detail == 0 {
            return 0;
        }
        let Some(children) = self.level_ref(detail - 1) else {
            return 0;
        };
        let mut mask = 0;
        for (i, &(dx, dz)) in CHILD_OFFSETS.iter().enumerate() {
            if children.get(2 * lx + dx, 2 * lz + dz).exists() {
                mask |= 1 << i;
            }
        }
        mask
    }

    /// The container for a level, for saving.
    pub fn level(&self, detail: u8) -> Result<&LevelContainer, LodError> {
        check_detail(detail)?;
        self.level_ref(detail).ok_or(LodError::LevelBelowMinimum {
            requested: detail,
            minimum: self.min_detail_level,
        })
    }

    /// Install a level container, e.g. one loaded from disk.
    ///
    /// The level may replace an allocated one or sit directly below the
    /// current minimum, which then becomes the new minimum. The tree is
    /// re-aggregated afterwards.
    pub fn add_level(&mut self, container: LevelContainer) -> Result<(), LodError> {
        let detail = container.detail_level();
        check_detail(detail)?;
        if detail + 1 < self.min_detail_level {
            return Err(LodError::LevelBelowMinimum {
                requested: detail,
                minimum: self.min_detail_level,
            });
        }
        self.levels[detail as usize] = Some(container);
        self.min_detail_level = self.min_detail_level.min(detail);
        self.refresh_all();
        Ok(())
    }

    /// Replace an allocated level as-is, for loading already aggregated data.
    pub(crate) fn replace_level(&mut self, container: LevelContainer) -> Result<(), LodError> {
        let detail = container.detail_level();
        if self.level_ref(detail).is_none() {
            return Err(LodError::LevelBelowMinimum {
                requested: detail,
                minimum: self.min_detail_level,
            });
        }
        self.levels[detail as usize] = Some(container);
        Ok(())
    }

    /// Discard every level finer than `detail`.
    pub fn cut_tree(&mut self, detail: u8) -> Result<(), LodError> {
        check_detail(detail)?;
        if self.min_detail_level < detail {
            for level in &mut self.levels[..detail as usize] {
                *level = None;
            }
            debug!(
                region = %self.pos,
                from = self.min_detail_level,
                to = detail,
                "cut region tree"
            );
            self.min_detail_level = detail;
        }
        Ok(())
    }

    /// Allocate empty levels down to `detail`.
    pub fn expand(&mut self, detail: u8) -> Result<(), LodError> {
        check_detail(detail)?;
        if detail < self.min_detail_level {
            for d in detail..self.min_detail_level {
                self.levels[d as usize] = Some(LevelContainer::new(d)?);
            }
            debug!(
                region = %self.pos,
                from = self.min_detail_level,
                to = detail,
                "expanded region tree"
            );
            self.min_detail_level = detail;
        }
        Ok(())
    }

    /// Bytes a region holding levels `min_detail_level..=REGION_DETAIL_LEVEL` needs.
    pub fn memory_needed_at(min_detail_level: u8) -> usize {
        (min_detail_level.min(REGION_DETAIL_LEVEL)..=REGION_DETAIL_LEVEL)
            .map(|detail| {
                let size = level_size(detail) as usize;
                size * size * std::mem::size_of::<DataPoint>()
            })
            .sum()
    }

    /// Bytes needed to hold the allocated levels.
    pub fn min_memory_needed(&self) -> usize {
        self.levels
            .iter()
            .flatten()
            .map(LevelContainer::memory_bytes)
            .sum()
    }

    /// Number of existing records at a level (zero when not allocated).
    pub fn existing_count(&self, detail: u8) -> usize {
        self.level_ref(detail)
            .map_or(0, LevelContainer::existing_count)
    }
}
