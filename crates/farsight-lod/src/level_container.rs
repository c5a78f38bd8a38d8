//! Dense storage for one detail level of a region.

use crate::data_point::DataPoint;
use crate::error::{LodError, check_detail};
use crate::level_pos::level_size;

/// A `size x size` grid of packed records for exactly one detail level,
/// where `size = 2^(REGION_DETAIL_LEVEL - detail)`.
///
/// Records are stored row-major by `x`, then `z`.
#[derive(Clone, PartialEq, Eq)]
pub struct LevelContainer {
    detail: u8,
    size: usize,
    data: Box<[DataPoint]>,
}

impl LevelContainer {
    /// Create a container with every record absent.
    pub fn new(detail: u8) -> Result<Self, LodError> {
        check_detail(detail)?;
        let size = level_size(detail) as usize;
        Ok(Self {
            detail,
            size,
            data: vec![DataPoint::EMPTY; size * size].into_boxed_slice(),
        })
    }

    /// Wrap existing records, which must number exactly `size * size`.
    pub fn from_points(detail: u8, points: Vec<DataPoint>) -> Result<Self, LodError> {
        check_detail(detail)?;
        let size = level_size(detail) as usize;
        if points.len() != size * size {
            return Err(LodError::LevelSizeMismatch {
                detail,
                expected: size * size,
                actual: points.len(),
            });
        }
        Ok(Self {
            detail,
            size,
            data: points.into_boxed_slice(),
        })
    }

    /// Detail level held by this container.
    pub fn detail_level(&self) -> u8 {
        self.detail
    }

    /// Records along one side.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.size && z < self.size, "({x}, {z}) out of {}", self.size);
        x * self.size + z
    }

    /// Record at a local index.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> DataPoint {
        self.data[self.index(x, z)]
    }

    /// Overwrite the record at a local index.
    #[inline]
    pub fn set(&mut self, x: usize, z: usize, point: DataPoint) {
        let i = self.index(x, z);
        self.data[i] = point;
    }

    /// All records, row-major.
    pub fn points(&self) -> &[DataPoint] {
        &self.data
    }

    /// Number of records that exist.
    pub fn existing_count(&self) -> usize {
        self.data.iter().filter(|p| p.exists()).count()
    }

    /// Heap bytes used by the records.
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }
}

impl std::fmt::Debug for LevelContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelContainer")
            .field("detail", &self.detail)
            .field("size", &self.size)
            .field("existing", &self.existing_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_pos::{CHUNK_DETAIL_LEVEL, REGION_DETAIL_LEVEL};

    #[test]
    fn test_new_container_is_empty() {
        let level = LevelContainer::new(CHUNK_DETAIL_LEVEL).unwrap();
        assert_eq!(level.size(), 32);
        assert_eq!(level.points().len(), 32 * 32);
        assert_eq!(level.existing_count(), 0);
        assert_eq!(level.memory_bytes(), 32 * 32 * 8);
    }

    #[test]
    fn test_set_and_get() {
        let mut level = LevelContainer::new(REGION_DETAIL_LEVEL - 1).unwrap();
        let point = DataPoint::encode(10, 2, 1, 2, 3, true);
        level.set(1, 0, point);
        assert_eq!(level.get(1, 0), point);
        assert_eq!(level.get(0, 1), DataPoint::EMPTY);
        assert_eq!(level.points()[2], point);
    }

    #[test]
    fn test_from_points_checks_length() {
        let err = LevelContainer::from_points(REGION_DETAIL_LEVEL - 1, vec![DataPoint::EMPTY; 3])
            .unwrap_err();
        assert_eq!(
            err,
            LodError::LevelSizeMismatch {
                detail: REGION_DETAIL_LEVEL - 1,
                expected: 4,
                actual: 3,
            }
        );
        assert!(LevelContainer::from_points(REGION_DETAIL_LEVEL, vec![DataPoint::void()]).is_ok());
    }

    #[test]
    fn test_rejects_levels_above_region() {
        assert_eq!(
            LevelContainer::new(REGION_DETAIL_LEVEL + 1).unwrap_err(),
            LodError::DetailLevelOutOfRange(REGION_DETAIL_LEVEL + 1)
        );
    }
}
