//! Headless fly-over that drives the LOD store with generated terrain.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p farsight-demo -- --ticks 40 --speed 128`.

mod generation;
mod heightmap;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use farsight_config::{CliArgs, Config, default_config_dir};
use farsight_lod::{LodDimension, RegionFileStore};
use tracing::{error, info};

use crate::generation::{LodGenerator, Outcome};
use crate::heightmap::{HeightmapParams, HeightmapSampler};

/// Demo arguments.
#[derive(Parser, Debug)]
#[command(name = "farsight-demo", about = "Fly over generated terrain and report LOD state")]
struct DemoArgs {
    #[command(flatten)]
    config: CliArgs,

    /// Number of simulation ticks.
    #[arg(long, default_value_t = 20)]
    ticks: u32,

    /// Viewer speed along +X in columns per tick.
    #[arg(long, default_value_t = 96)]
    speed: i32,

    /// World seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> ExitCode {
    let args = DemoArgs::parse();

    let config_dir = args.config.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args.config);

    let log_dir = config_dir.join("logs");
    farsight_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &DemoArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let policy = config.detail_distance_policy()?;

    let mut dimension =
        LodDimension::new(policy, config.region_radius()).with_budget(config.memory_budget());
    if let Some(dir) = &config.storage.save_dir {
        dimension = dimension.with_store(RegionFileStore::new(dir));
    }
    let dimension = Arc::new(dimension);

    let sampler = Arc::new(HeightmapSampler::new(HeightmapParams {
        seed: args.seed,
        ..Default::default()
    }));
    let threads = config.threading.world_generation_threads as usize;
    let max_requests = config.world_generator.max_requests_per_pass;
    let generator = LodGenerator::new(
        threads,
        max_requests,
        Arc::clone(&dimension),
        sampler,
        config.world_generator.generation_mode,
    )?;
    info!(
        threads,
        cores = LodGenerator::default_threads() + 1,
        radius = dimension.radius(),
        "starting fly-over"
    );

    let (mut player_x, player_z) = (0i32, 0i32);
    for tick in 0..args.ticks {
        let moved = dimension.move_to(player_x, player_z)?;

        let requests = dimension
            .data_to_generate(player_x, player_z, max_requests)
            .into_sorted_vec();
        let submitted = requests
            .iter()
            .filter(|request| generator.submit(request.pos))
            .count();

        let mut stored = 0;
        let mut stale = 0;
        let mut failed = 0;
        let mut busy_us = 0;
        for done in generator.wait_for(submitted) {
            busy_us += done.elapsed_us;
            match done.outcome {
                Outcome::Stored(n) => stored += n,
                Outcome::Stale => stale += 1,
                Outcome::Failed => failed += 1,
            }
        }

        let shrunk = dimension.enforce_budget()?;
        let selection = dimension.data_to_render(player_x, player_z);
        info!(
            tick,
            player_x,
            regions = dimension.region_count(),
            created = moved.created,
            loaded = moved.loaded,
            evicted = moved.evicted,
            requests = requests.len(),
            stored,
            stale,
            failed,
            busy_ms = busy_us / 1000,
            shrunk = shrunk.len(),
            render_nodes = selection.len(),
            memory_kb = dimension.memory_bytes() / 1024,
            "tick"
        );
        if config.debug.draw_lods {
            info!(tick, histogram = ?selection.detail_histogram(), "render detail histogram");
        }

        player_x += args.speed;
    }

    let saved = dimension.save_all()?;
    info!(saved, "finished fly-over");
    Ok(())
}
