//! Turning per-column terrain samples into chunk-granularity records.

use crate::data_point::{DataPoint, TerrainSample, merge_points};
use crate::error::LodError;
use crate::level_pos::{CHUNK_DETAIL_LEVEL, CHUNK_WIDTH, LevelPos, convert};

/// Surface of one world column as produced by a terrain generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSample {
    /// World column X.
    pub x: i32,
    /// World column Z.
    pub z: i32,
    /// Solid surface, `None` for a column with nothing to draw.
    pub surface: Option<TerrainSample>,
}

impl ColumnSample {
    /// A column with solid terrain.
    pub fn solid(x: i32, z: i32, surface: TerrainSample) -> Self {
        Self {
            x,
            z,
            surface: Some(surface),
        }
    }

    /// A generated column with nothing in it.
    pub fn void(x: i32, z: i32) -> Self {
        Self {
            x,
            z,
            surface: None,
        }
    }

    /// The record this column encodes to.
    pub fn to_point(self) -> DataPoint {
        self.surface
            .map_or_else(DataPoint::void, DataPoint::from_sample)
    }
}

/// Merge the columns of one chunk into records at `detail`.
///
/// Samples outside the chunk are ignored. Nodes that received no sample are
/// left out of the result, so a partially sampled chunk yields only the
/// nodes it actually covers.
pub fn build_chunk_level(
    chunk_x: i32,
    chunk_z: i32,
    samples: &[ColumnSample],
    detail: u8,
) -> Result<Vec<(LevelPos, DataPoint)>, LodError> {
    if detail > CHUNK_DETAIL_LEVEL {
        return Err(LodError::DetailLevelOutOfRange(detail));
    }
    let nodes = (CHUNK_WIDTH >> detail) as usize;
    let mut buckets: Vec<Vec<DataPoint>> = vec![Vec::new(); nodes * nodes];
    for sample in samples {
        if convert(0, sample.x, CHUNK_DETAIL_LEVEL) != chunk_x
            || convert(0, sample.z, CHUNK_DETAIL_LEVEL) != chunk_z
        {
            continue;
        }
        let lx = (sample.x.rem_euclid(CHUNK_WIDTH) >> detail) as usize;
        let lz = (sample.z.rem_euclid(CHUNK_WIDTH) >> detail) as usize;
        buckets[lx * nodes + lz].push(sample.to_point());
    }

    let origin = LevelPos::new(CHUNK_DETAIL_LEVEL, chunk_x, chunk_z).convert(detail);
    let mut out = Vec::with_capacity(nodes * nodes);
    for (i, bucket) in buckets.into_iter().enumerate() {
        let point = merge_points(bucket);
        if point.exists() {
            let (lx, lz) = ((i / nodes) as i32, (i % nodes) as i32);
            out.push((LevelPos::new(detail, origin.x + lx, origin.z + lz), point));
        }
    }
    Ok(out)
}
