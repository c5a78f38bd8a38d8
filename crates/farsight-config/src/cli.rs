//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments shared by every farsight binary.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "farsight", about = "Hierarchical terrain LOD")]
pub struct CliArgs {
    /// LOD render distance in chunks.
    #[arg(long)]
    pub render_distance: Option<u32>,

    /// Distance unit between detail levels, in chunks.
    #[arg(long)]
    pub horizontal_scale: Option<u32>,

    /// Background world generation threads.
    #[arg(long)]
    pub threads: Option<u32>,

    /// Regions kept on each side of the viewer.
    #[arg(long)]
    pub region_radius: Option<u32>,

    /// Memory budget for loaded regions in megabytes.
    #[arg(long)]
    pub memory_budget_mb: Option<usize>,

    /// Directory for region files.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(rd) = args.render_distance {
            self.quality.lod_chunk_render_distance = rd;
        }
        if let Some(scale) = args.horizontal_scale {
            self.quality.horizontal_scale = scale;
        }
        if let Some(threads) = args.threads {
            self.threading.world_generation_threads = threads;
        }
        if let Some(radius) = args.region_radius {
            self.storage.region_radius = Some(radius);
        }
        if let Some(mb) = args.memory_budget_mb {
            self.storage.memory_budget_mb = mb;
        }
        if let Some(ref dir) = args.save_dir {
            self.storage.save_dir = Some(dir.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
