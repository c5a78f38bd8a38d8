//! Multi-octave fractal Brownian motion (fBm) terrain sampler.
//!
//! Composites octaves of simplex noise into a height per world column and
//! colours the column by altitude band.

use farsight_lod::{
    CHUNK_WIDTH, ColumnSample, DataPoint, LevelPos, MAX_HEIGHT, MIN_HEIGHT, TerrainSample,
};
use noise::{NoiseFn, Simplex};

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per column.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
    /// Height below which a column is a chasm with nothing to draw.
    pub void_below: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.002,
            amplitude: 160.0,
            void_below: -150.0,
        }
    }
}

/// Samples terrain columns from an fBm heightmap.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    /// Create a new sampler with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(params.seed as u32);
        Self { noise, params }
    }

    /// Raw fBm height at a world position.
    pub fn height(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Surface of one column, `None` for a chasm.
    pub fn surface(&self, x: f64, z: f64) -> Option<TerrainSample> {
        let h = self.height(x, z);
        if h < self.params.void_below {
            return None;
        }
        let height = (h.round() as i16).clamp(MIN_HEIGHT, MAX_HEIGHT);
        let (red, green, blue) = colour_for(height);
        let depth = (height - 64).max(MIN_HEIGHT);
        Some(TerrainSample::new(height, depth, red, green, blue))
    }

    /// One world column.
    pub fn column(&self, x: i32, z: i32) -> ColumnSample {
        ColumnSample {
            x,
            z,
            surface: self.surface(f64::from(x) + 0.5, f64::from(z) + 0.5),
        }
    }

    /// Every column of a chunk.
    pub fn chunk(&self, chunk_x: i32, chunk_z: i32) -> Vec<ColumnSample> {
        let (x0, z0) = (chunk_x * CHUNK_WIDTH, chunk_z * CHUNK_WIDTH);
        let mut samples = Vec::with_capacity((CHUNK_WIDTH * CHUNK_WIDTH) as usize);
        for dx in 0..CHUNK_WIDTH {
            for dz in 0..CHUNK_WIDTH {
                samples.push(self.column(x0 + dx, z0 + dz));
            }
        }
        samples
    }

    /// A single record for a coarse node, sampled at its centre.
    pub fn node(&self, pos: LevelPos) -> DataPoint {
        let (x0, z0) = pos.start_column();
        let half = f64::from(pos.width()) / 2.0;
        self.surface(f64::from(x0) + half, f64::from(z0) + half)
            .map_or_else(DataPoint::void, DataPoint::from_sample)
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

/// Altitude bands: sand, grass, rock, snow.
fn colour_for(height: i16) -> (u8, u8, u8) {
    match height {
        h if h < 2 => (210, 200, 150),
        h if h < 90 => (80, 140, 60),
        h if h < 180 => (120, 115, 110),
        _ => (240, 240, 245),
    }
}
