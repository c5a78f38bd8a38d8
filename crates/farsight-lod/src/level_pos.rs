//! Coordinate transforms between world columns, per-level positions, and
//! per-region array indices.
//!
//! A *level position* `(detail, x, z)` addresses one quadtree node: the node
//! covers the columns `[x << detail, (x + 1) << detail)` on each axis. Level
//! positions are absolute (world-wide); [`region_modulo`] folds them into the
//! local index of the region that owns them.

use glam::DVec2;

/// The coarsest detail level. A single record at this level covers a whole region.
pub const REGION_DETAIL_LEVEL: u8 = 9;

/// The detail level at which one record covers exactly one 16x16 chunk.
pub const CHUNK_DETAIL_LEVEL: u8 = 4;

/// Number of detail levels a region can hold (`0..=REGION_DETAIL_LEVEL`).
pub const DETAIL_LEVEL_COUNT: usize = REGION_DETAIL_LEVEL as usize + 1;

/// Width of a region in world columns.
pub const REGION_WIDTH: i32 = 1 << REGION_DETAIL_LEVEL;

/// Width of a chunk in world columns.
pub const CHUNK_WIDTH: i32 = 1 << CHUNK_DETAIL_LEVEL;

/// Integer coordinates of a region on the region grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPos {
    /// Region X on the region grid.
    pub x: i32,
    /// Region Z on the region grid.
    pub z: i32,
}

impl RegionPos {
    /// Create a region position.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region containing the given world column.
    pub fn from_column(column_x: i32, column_z: i32) -> Self {
        Self::new(region_of(0, column_x), region_of(0, column_z))
    }

    /// The region containing the given chunk.
    pub fn from_chunk(chunk_x: i32, chunk_z: i32) -> Self {
        Self::new(
            region_of(CHUNK_DETAIL_LEVEL, chunk_x),
            region_of(CHUNK_DETAIL_LEVEL, chunk_z),
        )
    }

    /// The root node of this region.
    pub fn root(self) -> LevelPos {
        LevelPos::new(REGION_DETAIL_LEVEL, self.x, self.z)
    }

    /// Chebyshev distance on the region grid.
    pub fn grid_distance(self, other: RegionPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

impl std::fmt::Display for RegionPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r({}, {})", self.x, self.z)
    }
}

/// An absolute quadtree node position at a given detail level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelPos {
    /// Detail level (0 = one column per node).
    pub detail: u8,
    /// Absolute X at this detail level.
    pub x: i32,
    /// Absolute Z at this detail level.
    pub z: i32,
}

impl LevelPos {
    /// Create a level position.
    pub const fn new(detail: u8, x: i32, z: i32) -> Self {
        Self { detail, x, z }
    }

    /// Re-express this position at another detail level.
    ///
    /// Going coarser yields the ancestor; going finer yields the child with the
    /// lowest `x` and `z` inside this node's footprint.
    #[must_use]
    pub fn convert(self, to: u8) -> Self {
        Self::new(
            to,
            convert(self.detail, self.x, to),
            convert(self.detail, self.z, to),
        )
    }

    /// The region that owns this node.
    pub fn region(self) -> RegionPos {
        RegionPos::new(region_of(self.detail, self.x), region_of(self.detail, self.z))
    }

    /// Local array index `(x, z)` inside the owning region's level container.
    pub fn local(self) -> (usize, usize) {
        (
            region_modulo(self.detail, self.x),
            region_modulo(self.detail, self.z),
        )
    }

    /// Width of this node in world columns.
    pub fn width(self) -> i32 {
        node_width(self.detail)
    }

    /// The first world column covered by this node on each axis.
    pub fn start_column(self) -> (i32, i32) {
        (self.x << self.detail, self.z << self.detail)
    }

    /// Farthest-corner distance from the given world column.
    pub fn max_distance(self, column_x: i32, column_z: i32) -> f64 {
        max_distance(self.detail, self.x, self.z, column_x, column_z)
    }

    /// Nearest-point distance from the given world column (zero when inside).
    pub fn min_distance(self, column_x: i32, column_z: i32) -> f64 {
        min_distance(self.detail, self.x, self.z, column_x, column_z)
    }
}

impl std::fmt::Display for LevelPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}({}, {})", self.detail, self.x, self.z)
    }
}

/// Width in world columns of one node at `detail`.
#[inline]
pub fn node_width(detail: u8) -> i32 {
    1 << detail
}

/// Number of nodes along one side of a region at `detail`.
#[inline]
pub fn level_size(detail: u8) -> i32 {
    debug_assert!(detail <= REGION_DETAIL_LEVEL);
    1 << (REGION_DETAIL_LEVEL - detail)
}

/// Fold an absolute level coordinate into the owning region's array index.
#[inline]
pub fn region_modulo(detail: u8, pos: i32) -> usize {
    pos.rem_euclid(level_size(detail)) as usize
}

/// Convert a coordinate between detail levels.
#[inline]
pub fn convert(from: u8, pos: i32, to: u8) -> i32 {
    if from >= to {
        pos << (from - to)
    } else {
        pos >> (to - from)
    }
}

/// Region-grid coordinate owning an absolute level coordinate.
#[inline]
pub fn region_of(detail: u8, pos: i32) -> i32 {
    pos >> (REGION_DETAIL_LEVEL - detail)
}

/// Absolute level coordinate of a region-local index.
#[inline]
pub fn to_absolute(detail: u8, local: i32, region: i32) -> i32 {
    local + region * level_size(detail)
}

/// Per-axis offsets from a column to the near and far edges of a node.
fn axis_offsets(detail: u8, pos: i32, column: i32) -> (i64, i64) {
    let start = i64::from(pos) << detail;
    let end = start + i64::from(node_width(detail));
    let column = i64::from(column);
    let far = (column - start).abs().max((column - end).abs());
    let near = if column < start {
        start - column
    } else if column > end {
        column - end
    } else {
        0
    };
    (near, far)
}

/// Distance from a world column to the farthest corner of a node.
///
/// Detail decisions use this conservative bound so that a coarse node is
/// only accepted when every part of it is far enough away.
pub fn max_distance(detail: u8, pos_x: i32, pos_z: i32, column_x: i32, column_z: i32) -> f64 {
    let (_, dx) = axis_offsets(detail, pos_x, column_x);
    let (_, dz) = axis_offsets(detail, pos_z, column_z);
    DVec2::new(dx as f64, dz as f64).length()
}

/// Distance from a world column to the nearest point of a node.
pub fn min_distance(detail: u8, pos_x: i32, pos_z: i32, column_x: i32, column_z: i32) -> f64 {
    let (dx, _) = axis_offsets(detail, pos_x, column_x);
    let (dz, _) = axis_offsets(detail, pos_z, column_z);
    DVec2::new(dx as f64, dz as f64).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_sizes() {
        assert_eq!(level_size(REGION_DETAIL_LEVEL), 1);
        assert_eq!(level_size(CHUNK_DETAIL_LEVEL), 32);
        assert_eq!(level_size(0), 512);
        assert_eq!(node_width(CHUNK_DETAIL_LEVEL), CHUNK_WIDTH);
    }

    #[test]
    fn test_region_modulo_wraps_negative_coordinates() {
        assert_eq!(region_modulo(0, -1), 511);
        assert_eq!(region_modulo(0, 512), 0);
        assert_eq!(region_modulo(CHUNK_DETAIL_LEVEL, -33), 31);
        assert_eq!(region_modulo(REGION_DETAIL_LEVEL, -7), 0);
    }

    #[test]
    fn test_convert_coarser_floors_toward_negative_infinity() {
        assert_eq!(convert(0, 17, CHUNK_DETAIL_LEVEL), 1);
        assert_eq!(convert(0, -1, CHUNK_DETAIL_LEVEL), -1);
        assert_eq!(convert(0, -16, CHUNK_DETAIL_LEVEL), -1);
        assert_eq!(convert(0, -17, CHUNK_DETAIL_LEVEL), -2);
    }

    #[test]
    fn test_convert_finer_then_back_returns_same_parent() {
        for pos in [-100, -3, 0, 5, 77] {
            let fine = convert(6, pos, 2);
            assert_eq!(convert(2, fine, 6), pos);
        }
        // Going down loses information, but the parent is stable.
        let parent = convert(0, 13, 3);
        let back = convert(3, parent, 0);
        assert_eq!(convert(0, back, 3), parent);
        assert_ne!(back, 13);
    }

    #[test]
    fn test_region_of_and_to_absolute_are_inverse() {
        for detail in 0..=REGION_DETAIL_LEVEL {
            for pos in [-1025, -1, 0, 1, 700] {
                let region = region_of(detail, pos);
                let local = region_modulo(detail, pos) as i32;
                assert_eq!(to_absolute(detail, local, region), pos);
            }
        }
    }

    #[test]
    fn test_region_pos_from_column_and_chunk() {
        assert_eq!(RegionPos::from_column(0, 511), RegionPos::new(0, 0));
        assert_eq!(RegionPos::from_column(-1, 512), RegionPos::new(-1, 1));
        assert_eq!(RegionPos::from_chunk(31, -32), RegionPos::new(0, -1));
    }

    #[test]
    fn test_level_pos_region_and_local() {
        let pos = LevelPos::new(CHUNK_DETAIL_LEVEL, -1, 33);
        assert_eq!(pos.region(), RegionPos::new(-1, 1));
        assert_eq!(pos.local(), (31, 1));
        assert_eq!(pos.convert(REGION_DETAIL_LEVEL), RegionPos::new(-1, 1).root());
    }

    #[test]
    fn test_max_distance_uses_farthest_corner() {
        // Node covers columns [0, 16] on each axis at chunk detail.
        let d = max_distance(CHUNK_DETAIL_LEVEL, 0, 0, 0, 0);
        assert!((d - (16.0f64 * 16.0 * 2.0).sqrt()).abs() < 1e-9);
        let d = max_distance(CHUNK_DETAIL_LEVEL, 0, 0, 8, 8);
        assert!((d - (8.0f64 * 8.0 * 2.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_min_distance_is_zero_inside_node() {
        assert_eq!(min_distance(CHUNK_DETAIL_LEVEL, 1, 1, 20, 30), 0.0);
        assert_eq!(min_distance(CHUNK_DETAIL_LEVEL, 1, 1, 0, 16), 16.0);
        let d = min_distance(0, 10, 10, 0, 0);
        assert!((d - (200.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_min_never_exceeds_max_distance() {
        for detail in 0..=REGION_DETAIL_LEVEL {
            for (px, pz) in [(0, 0), (-900, 40), (3000, -3000)] {
                let min = min_distance(detail, 1, -2, px, pz);
                let max = max_distance(detail, 1, -2, px, pz);
                assert!(min <= max, "detail {detail}: {min} > {max}");
            }
        }
    }
}
