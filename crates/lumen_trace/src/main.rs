//! Lumen trace - casts batched camera and reflection rays through a
//! procedural scene and reports accelerator statistics.
//!
//! Usage: `lumen_trace [config.json]`

mod config;
mod scene;
mod tile;

use anyhow::{Context, Result};
use config::TraceConfig;
use lumen_accel::Accelerator;
use lumen_math::Vec3;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tile::{generate_tiles, trace_tile, Camera, TraceStats};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            TraceConfig::load(&path)?
        }
        None => {
            let config = TraceConfig::default();
            config.validate()?;
            config
        }
    };
    log::info!(
        "{}x{} image, {}px tiles, {} primitives (seed {})",
        config.width,
        config.height,
        config.tile_size,
        config.primitive_count,
        config.seed
    );

    let primitives = scene::random_scene(config.primitive_count, config.seed);

    let start = Instant::now();
    let accel = Accelerator::build(primitives, &config.accelerator)
        .context("Failed to build accelerator")?;
    log::info!(
        "Built {} accelerator in {:.2?}, world bound {:?}",
        accel.name(),
        start.elapsed(),
        accel.world_bound()
    );
    if let Accelerator::BoundingHierarchy(bvh) = &accel {
        log::info!("BVH: {}", bvh.stats());
    }

    let camera = Camera::new(
        config.camera_origin,
        Vec3::ZERO,
        config.vfov,
        config.width,
        config.height,
    );
    let tiles = generate_tiles(config.width, config.height, config.tile_size);

    let start = Instant::now();
    let per_tile = tiles
        .par_iter()
        .map(|tile| trace_tile(tile, &camera, &accel))
        .collect::<Result<Vec<_>>>()?;
    let stats: TraceStats = per_tile.into_iter().sum();
    let elapsed = start.elapsed();

    log::info!(
        "Traced {} tiles in {:.2?}: {} camera rays ({} hits), {} reflected rays ({} hits)",
        tiles.len(),
        elapsed,
        stats.camera_rays,
        stats.camera_hits,
        stats.reflected_rays,
        stats.reflected_hits
    );
    log::info!(
        "{:.2} Mrays/s",
        stats.total_rays() as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
    );

    Ok(())
}
