//! Configuration structs with sensible defaults and RON persistence.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use farsight_lod::{
    DetailDistancePolicy, DetailDistanceSettings, GenerationMode, HorizontalQuality,
    HorizontalResolution, MemoryBudgetConfig, REGION_DETAIL_LEVEL,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Allowed LOD render distance, in chunks.
pub const RENDER_DISTANCE_RANGE: RangeInclusive<u32> = 16..=1024;

/// Allowed horizontal scale.
pub const HORIZONTAL_SCALE_RANGE: RangeInclusive<u32> = 2..=32;

/// Allowed number of world generation threads.
pub const GENERATION_THREADS_RANGE: RangeInclusive<u32> = 1..=50;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// How much detail is drawn and how fast it falls off.
    pub quality: QualityConfig,
    /// What the background generator produces.
    pub world_generator: WorldGeneratorConfig,
    /// Worker threads.
    pub threading: ThreadingConfig,
    /// Loaded regions and persistence.
    pub storage: StorageConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Draw quality configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Finest resolution ever drawn.
    pub draw_resolution: HorizontalResolution,
    /// LOD render distance in chunks.
    pub lod_chunk_render_distance: u32,
    /// Distance unit in chunks between detail levels.
    pub horizontal_scale: u32,
    /// Falloff shape between detail levels.
    pub horizontal_quality: HorizontalQuality,
}

/// World generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldGeneratorConfig {
    /// How much of the generator runs for LOD data.
    pub generation_mode: GenerationMode,
    /// Generation thresholds are the render thresholds times this (>= 1).
    pub generation_multiplier: f64,
    /// Finest detail level ever generated.
    pub min_generation_detail: u8,
    /// Maximum requests handed to workers per pass.
    pub max_requests_per_pass: usize,
}

/// Threading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Background world generation threads.
    pub world_generation_threads: u32,
}

/// Region storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Regions kept loaded on each side of the viewer's region. `None`
    /// derives it from the render distance.
    pub region_radius: Option<u32>,
    /// Memory budget for loaded regions in megabytes.
    pub memory_budget_mb: usize,
    /// Directory for region files. `None` keeps everything in memory.
    pub save_dir: Option<PathBuf>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Colour nodes by detail level instead of terrain colour.
    pub draw_lods: bool,
}

// --- Default implementations ---

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            draw_resolution: HorizontalResolution::Block,
            lod_chunk_render_distance: 64,
            horizontal_scale: 8,
            horizontal_quality: HorizontalQuality::Medium,
        }
    }
}

impl Default for WorldGeneratorConfig {
    fn default() -> Self {
        Self {
            generation_mode: GenerationMode::Surface,
            generation_multiplier: 1.5,
            min_generation_detail: 0,
            max_requests_per_pass: 128,
        }
    }
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            world_generation_threads: 4,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region_radius: None,
            memory_budget_mb: 256,
            save_dir: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            draw_lods: false,
        }
    }
}

/// Default directory for `config.ron`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("farsight")
}

// --- Derived settings ---

impl Config {
    /// Check every setting against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "quality.lod_chunk_render_distance",
            self.quality.lod_chunk_render_distance,
            RENDER_DISTANCE_RANGE,
        )?;
        check_range(
            "quality.horizontal_scale",
            self.quality.horizontal_scale,
            HORIZONTAL_SCALE_RANGE,
        )?;
        check_range(
            "threading.world_generation_threads",
            self.threading.world_generation_threads,
            GENERATION_THREADS_RANGE,
        )?;
        if self.world_generator.min_generation_detail > REGION_DETAIL_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "world_generator.min_generation_detail must be at most {REGION_DETAIL_LEVEL}"
            )));
        }
        if self.world_generator.max_requests_per_pass == 0 {
            return Err(ConfigError::Invalid(
                "world_generator.max_requests_per_pass must be positive".to_string(),
            ));
        }
        self.detail_distance_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Inputs for the distance-to-detail policy.
    pub fn detail_distance_settings(&self) -> DetailDistanceSettings {
        DetailDistanceSettings {
            horizontal_scale: self.quality.horizontal_scale,
            quality: self.quality.horizontal_quality,
            draw_resolution: self.quality.draw_resolution,
            min_generation_detail: self.world_generator.min_generation_detail,
            generation_multiplier: self.world_generator.generation_multiplier,
        }
    }

    /// Build the distance-to-detail policy.
    pub fn detail_distance_policy(&self) -> Result<DetailDistancePolicy, ConfigError> {
        DetailDistancePolicy::new(self.detail_distance_settings())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Regions kept on each side of the viewer: explicit, or enough to cover
    /// the render distance.
    pub fn region_radius(&self) -> i32 {
        match self.storage.region_radius {
            Some(radius) => i32::try_from(radius).unwrap_or(i32::MAX),
            // 32 chunks per region.
            None => i32::try_from(self.quality.lod_chunk_render_distance.div_ceil(32))
                .unwrap_or(i32::MAX),
        }
    }

    /// Memory budget for loaded regions.
    pub fn memory_budget(&self) -> MemoryBudgetConfig {
        MemoryBudgetConfig::from_megabytes(self.storage.memory_budget_mb)
    }
}

fn check_range(name: &str, value: u32, range: RangeInclusive<u32>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} = {value} is outside {}..={}",
            range.start(),
            range.end()
        )))
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
