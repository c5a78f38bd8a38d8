//! Bottom-up refresh of aggregated records.

use super::{CHILD_OFFSETS, Region};
use crate::data_point::merge_points;
use crate::error::{LodError, check_detail};
use crate::level_pos::{REGION_DETAIL_LEVEL, convert, region_modulo};

impl Region {
    /// Recompute everything a write at `(detail, x, z)` affects: every node
    /// inside its footprint from `min_detail_level + 1` up to `detail`, then
    /// each ancestor up to the root.
    pub fn update_area(&mut self, detail: u8, x: i32, z: i32) -> Result<(), LodError> {
        check_detail(detail)?;
        self.check_owned(detail, x, z)?;
        self.refresh_area(detail, x, z);
        Ok(())
    }

    /// Recompute one node from its four children.
    pub fn update(&mut self, detail: u8, x: i32, z: i32) -> Result<(), LodError> {
        check_detail(detail)?;
        if detail <= self.min_detail_level {
            return Err(LodError::LevelBelowMinimum {
                requested: detail,
                minimum: self.min_detail_level + 1,
            });
        }
        self.update_node(detail, region_modulo(detail, x), region_modulo(detail, z));
        Ok(())
    }

    pub(crate) fn refresh_area(&mut self, detail: u8, x: i32, z: i32) {
        for bottom in (self.min_detail_level + 1)..=detail {
            let start_x = convert(detail, x, bottom);
            let start_z = convert(detail, z, bottom);
            let width = 1 << (detail - bottom);
            for dx in 0..width {
                for dz in 0..width {
                    self.update_node(
                        bottom,
                        region_modulo(bottom, start_x + dx),
                        region_modulo(bottom, start_z + dz),
                    );
                }
            }
        }
        let first_up = (detail + 1).max(self.min_detail_level + 1);
        for up in first_up..=REGION_DETAIL_LEVEL {
            self.update_node(
                up,
                region_modulo(up, convert(detail, x, up)),
                region_modulo(up, convert(detail, z, up)),
            );
        }
    }

    /// Re-aggregate the whole tree from the finest level.
    pub(crate) fn refresh_all(&mut self) {
        let root = self.pos.root();
        self.refresh_area(root.detail, root.x, root.z);
    }

    /// A node with no existing children keeps its current record.
    fn update_node(&mut self, detail: u8, lx: usize, lz: usize) {
        let Some(children) = self.level_ref(detail - 1) else {
            return;
        };
        let merged = merge_points(
            CHILD_OFFSETS
                .iter()
                .map(|&(dx, dz)| children.get(2 * lx + dx, 2 * lz + dz)),
        );
        if !merged.exists() {
            return;
        }
        if let Some(level) = self.levels[detail as usize].as_mut() {
            level.set(lx, lz, merged);
        }
    }
}
