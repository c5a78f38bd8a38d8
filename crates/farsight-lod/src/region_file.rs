//! On-disk format for regions.
//!
//! The FLOD format stores every allocated level of a region, coarsest first,
//! so a reader that only needs coarse data can stop early.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `"FLOD"` |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 4 | Region X (`i32`, little-endian) |
//! | 9 | 4 | Region Z (`i32`, little-endian) |
//! | 13 | 1 | Minimum detail level (`u8`) |
//! | 14 | 1 | Generation mode tag (`u8`) |
//! | 15 | ... | Levels `9` down to the minimum |
//!
//! Each level is its detail byte followed by `size * size` records as
//! little-endian `u64`, row-major by `x` then `z`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data_point::DataPoint;
use crate::error::LodError;
use crate::generation_mode::GenerationMode;
use crate::level_container::LevelContainer;
use crate::level_pos::{REGION_DETAIL_LEVEL, RegionPos, level_size};
use crate::region::Region;

/// Magic bytes identifying the FLOD format.
const MAGIC: [u8; 4] = *b"FLOD";

/// Current format version.
const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 15;

/// Errors that can occur while reading or writing region files.
#[derive(Debug, thiserror::Error)]
pub enum RegionFileError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than expected.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// A detail byte is out of range or out of order.
    #[error("invalid detail level: {0}")]
    InvalidDetailLevel(u8),
    /// The generation mode tag is unknown.
    #[error("invalid generation mode: {0}")]
    InvalidGenerationMode(u8),
    /// The stored region is not the one asked for.
    #[error("file holds region {found}, expected {expected}")]
    WrongRegion {
        /// Region requested.
        expected: RegionPos,
        /// Region found in the header.
        found: RegionPos,
    },
    /// The decoded data could not be assembled into a region.
    #[error(transparent)]
    Lod(#[from] LodError),
    /// Filesystem failure.
    #[error("region file I/O failed")]
    Io(#[from] std::io::Error),
}

/// Serialize a region to the FLOD format.
pub fn encode_region(region: &Region) -> Vec<u8> {
    let min = region.min_detail_level();
    let body: usize = (min..=REGION_DETAIL_LEVEL)
        .map(|d| 1 + level_bytes(d))
        .sum();
    let mut buf = Vec::with_capacity(HEADER_LEN + body);

    buf.extend_from_slice(&MAGIC);
    buf.push(FORMAT_VERSION);
    buf.extend_from_slice(&region.pos().x.to_le_bytes());
    buf.extend_from_slice(&region.pos().z.to_le_bytes());
    buf.push(min);
    buf.push(region.generation_mode().to_u8());

    for detail in (min..=REGION_DETAIL_LEVEL).rev() {
        buf.push(detail);
        match region.level(detail) {
            Ok(level) => {
                let words: &[u64] = bytemuck::cast_slice(level.points());
                for word in words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
            // Every level from the minimum up is allocated; keep the layout
            // intact regardless.
            Err(_) => buf.resize(buf.len() + level_bytes(detail), 0),
        }
    }
    buf
}

/// Deserialize a region from the FLOD format.
pub fn decode_region(data: &[u8]) -> Result<Region, RegionFileError> {
    if data.len() < 4 || data[0..4] != MAGIC {
        return Err(RegionFileError::InvalidMagic);
    }
    if data.len() < 5 {
        return Err(RegionFileError::Truncated {
            expected: 5,
            actual: data.len(),
        });
    }
    let version = data[4];
    if version != FORMAT_VERSION {
        return Err(RegionFileError::UnsupportedVersion(version));
    }
    if data.len() < HEADER_LEN {
        return Err(RegionFileError::Truncated {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }

    let x = i32::from_le_bytes([data[5], data[6], data[7], data[8]]);
    let z = i32::from_le_bytes([data[9], data[10], data[11], data[12]]);
    let min = data[13];
    if min > REGION_DETAIL_LEVEL {
        return Err(RegionFileError::InvalidDetailLevel(min));
    }
    let mode = GenerationMode::from_u8(data[14])
        .ok_or(RegionFileError::InvalidGenerationMode(data[14]))?;

    let mut region = Region::new(min, RegionPos::new(x, z), mode)?;
    let mut offset = HEADER_LEN;
    for detail in (min..=REGION_DETAIL_LEVEL).rev() {
        let end = offset + 1 + level_bytes(detail);
        if data.len() < end {
            return Err(RegionFileError::Truncated {
                expected: end,
                actual: data.len(),
            });
        }
        if data[offset] != detail {
            return Err(RegionFileError::InvalidDetailLevel(data[offset]));
        }
        let points = data[offset + 1..end]
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                DataPoint::from_bits(u64::from_le_bytes(word))
            })
            .collect();
        region.replace_level(LevelContainer::from_points(detail, points)?)?;
        offset = end;
    }
    Ok(region)
}

/// Bytes of record data for one level.
fn level_bytes(detail: u8) -> usize {
    let size = level_size(detail) as usize;
    size * size * size_of::<u64>()
}

/// Directory of region files named `r.{x}.{z}.flod`.
#[derive(Clone, Debug)]
pub struct RegionFileStore {
    dir: PathBuf,
}

impl RegionFileStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a region.
    pub fn path_for(&self, pos: RegionPos) -> PathBuf {
        self.dir.join(format!("r.{}.{}.flod", pos.x, pos.z))
    }

    /// Write a region, replacing any earlier file.
    pub fn save(&self, region: &Region) -> Result<(), RegionFileError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(region.pos());
        let tmp = path.with_extension("flod.tmp");
        std::fs::write(&tmp, encode_region(region))?;
        std::fs::rename(&tmp, &path)?;
        debug!(region = %region.pos(), path = %path.display(), "saved region");
        Ok(())
    }

    /// Read a region, `None` when it was never saved.
    pub fn load(&self, pos: RegionPos) -> Result<Option<Region>, RegionFileError> {
        let data = match std::fs::read(self.path_for(pos)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let region = decode_region(&data)?;
        if region.pos() != pos {
            return Err(RegionFileError::WrongRegion {
                expected: pos,
                found: region.pos(),
            });
        }
        Ok(Some(region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_point::TerrainSample;

    fn sample_region() -> Region {
        let mut region = Region::new(2, RegionPos::new(-3, 7), GenerationMode::Features).unwrap();
        for (x, z, h) in [(0, 0, 10), (5, 9, -300), (127, 127, 2000)] {
            let point = DataPoint::from_sample(TerrainSample::new(h, h - 8, 1, 2, 3));
            region.write(2, -3 * 128 + x, 7 * 128 + z, point, false).unwrap();
        }
        region
            .write(2, -3 * 128 + 1, 7 * 128, DataPoint::void(), false)
            .unwrap();
        region
    }

    #[test]
    fn test_encode_decode_preserves_every_level() {
        let region = sample_region();
        let bytes = encode_region(&region);
        let decoded = decode_region(&bytes).unwrap();

        assert_eq!(decoded.pos(), region.pos());
        assert_eq!(decoded.min_detail_level(), 2);
        assert_eq!(decoded.generation_mode(), GenerationMode::Features);
        for detail in 2..=REGION_DETAIL_LEVEL {
            assert_eq!(decoded.level(detail).unwrap(), region.level(detail).unwrap());
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_region(&sample_region());
        assert_eq!(&bytes[0..4], b"FLOD");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(i32::from_le_bytes(bytes[5..9].try_into().unwrap()), -3);
        assert_eq!(i32::from_le_bytes(bytes[9..13].try_into().unwrap()), 7);
        assert_eq!(bytes[13], 2);
        assert_eq!(bytes[14], GenerationMode::Features.to_u8());
        // Coarsest level comes first.
        assert_eq!(bytes[15], REGION_DETAIL_LEVEL);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = encode_region(&sample_region());
        bytes[0] = b'X';
        assert!(matches!(decode_region(&bytes), Err(RegionFileError::InvalidMagic)));
        assert!(matches!(decode_region(b"FL"), Err(RegionFileError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode_region(&sample_region());
        bytes[4] = 9;
        assert!(matches!(
            decode_region(&bytes),
            Err(RegionFileError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated_data() {
        let bytes = encode_region(&sample_region());
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode_region(cut),
            Err(RegionFileError::Truncated { expected, actual }) if expected == bytes.len() && actual == cut.len()
        ));
        assert!(matches!(
            decode_region(&bytes[..10]),
            Err(RegionFileError::Truncated { expected: HEADER_LEN, actual: 10 })
        ));
    }

    #[test]
    fn test_bad_detail_and_mode_bytes() {
        let mut bytes = encode_region(&sample_region());
        bytes[15] = 4;
        assert!(matches!(
            decode_region(&bytes),
            Err(RegionFileError::InvalidDetailLevel(4))
        ));

        let mut bytes = encode_region(&sample_region());
        bytes[14] = 200;
        assert!(matches!(
            decode_region(&bytes),
            Err(RegionFileError::InvalidGenerationMode(200))
        ));

        let mut bytes = encode_region(&sample_region());
        bytes[13] = 12;
        assert!(matches!(
            decode_region(&bytes),
            Err(RegionFileError::InvalidDetailLevel(12))
        ));
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path().join("regions"));
        let region = sample_region();

        assert!(store.load(region.pos()).unwrap().is_none());
        store.save(&region).unwrap();
        assert!(store.path_for(region.pos()).ends_with("r.-3.7.flod"));

        let loaded = store.load(region.pos()).unwrap().unwrap();
        assert_eq!(loaded.level(2).unwrap(), region.level(2).unwrap());
        assert_eq!(
            loaded.get_data(REGION_DETAIL_LEVEL, -3, 7).unwrap(),
            region.get_data(REGION_DETAIL_LEVEL, -3, 7).unwrap()
        );
    }

    #[test]
    fn test_store_rejects_misplaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path());
        let region = sample_region();
        std::fs::write(store.path_for(RegionPos::new(0, 0)), encode_region(&region)).unwrap();
        assert!(matches!(
            store.load(RegionPos::new(0, 0)),
            Err(RegionFileError::WrongRegion { .. })
        ));
    }
}
