//! Driver configuration.

use anyhow::{Context, Result};
use lumen_accel::AcceleratorConfig;
use lumen_math::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Trace configuration, read from an optional JSON file.
///
/// Missing fields take their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Number of random primitives in the procedural scene
    pub primitive_count: usize,
    /// Seed for scene generation
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Camera position; the camera looks at the origin
    pub camera_origin: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    pub accelerator: AcceleratorConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            primitive_count: 10_000,
            seed: 42,
            width: 640,
            height: 360,
            tile_size: DEFAULT_TILE_SIZE,
            camera_origin: Vec3::new(0.0, 0.0, 60.0),
            vfov: 45.0,
            accelerator: AcceleratorConfig::default(),
        }
    }
}

impl TraceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: TraceConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.width > 0 && self.height > 0, "Image resolution must be non-zero");
        anyhow::ensure!(self.tile_size > 0, "Tile size must be non-zero");
        anyhow::ensure!(
            self.vfov > 0.0 && self.vfov < 180.0,
            "Field of view must be between 0 and 180 degrees"
        );
        self.accelerator.validate().context("Invalid accelerator config")?;
        Ok(())
    }
}
