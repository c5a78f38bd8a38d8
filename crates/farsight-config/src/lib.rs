//! Configuration system for farsight.
//!
//! Provides runtime-configurable LOD settings that persist to disk as RON
//! files. Supports CLI overrides via clap, range validation, hot-reload
//! detection, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, GENERATION_THREADS_RANGE, HORIZONTAL_SCALE_RANGE, QualityConfig,
    RENDER_DISTANCE_RANGE, StorageConfig, ThreadingConfig, WorldGeneratorConfig,
    default_config_dir,
};
pub use error::ConfigError;
