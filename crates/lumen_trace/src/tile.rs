//! Tile-based batched ray casting.
//!
//! Divides the image into tiles that are traced independently and in
//! parallel using rayon. Each tile issues one batch of camera rays and one
//! batch of reflected rays in which pixels whose camera ray missed are
//! masked out.

use anyhow::Result;
use lumen_accel::{Accelerator, SurfaceInteraction};
use lumen_math::{Ray, Vec3};
use std::iter::Sum;
use std::ops::Add;

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this tile in trace order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

/// Split a `width` x `height` image into tiles, ordered from the center out.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let tw = tile_size.min(width - x);
            let th = tile_size.min(height - y);
            tiles.push(Tile::new(x, y, tw, th, tiles.len()));
            x += tile_size;
        }
        y += tile_size;
    }

    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let distance = |t: &Tile| {
        let dx = t.x as f32 + t.width as f32 / 2.0 - cx;
        let dy = t.y as f32 + t.height as f32 / 2.0 - cy;
        dx * dx + dy * dy
    };
    tiles.sort_by(|a, b| distance(a).total_cmp(&distance(b)));

    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }
    tiles
}

/// Pinhole camera looking from `origin` at `target`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    origin: Vec3,
    lower_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn new(origin: Vec3, target: Vec3, vfov_degrees: f32, width: u32, height: u32) -> Self {
        let aspect = width as f32 / height as f32;
        let half_height = (vfov_degrees.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;

        let w = (origin - target).try_normalize().unwrap_or(Vec3::Z);
        let up = if w.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let u = up.cross(w).normalize();
        let v = w.cross(u);

        Self {
            origin,
            lower_left: origin - half_width * u - half_height * v - w,
            horizontal: 2.0 * half_width * u,
            vertical: 2.0 * half_height * v,
            width,
            height,
        }
    }

    /// Ray through the center of pixel (`x`, `y`), with y = 0 the top row.
    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let s = (x as f32 + 0.5) / self.width as f32;
        let t = 1.0 - (y as f32 + 0.5) / self.height as f32;
        let target = self.lower_left + s * self.horizontal + t * self.vertical;
        Ray::new_simple(self.origin, target - self.origin)
    }
}

/// Ray counts gathered while tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub camera_rays: usize,
    pub camera_hits: usize,
    pub reflected_rays: usize,
    pub reflected_hits: usize,
}

impl TraceStats {
    pub fn total_rays(&self) -> usize {
        self.camera_rays + self.reflected_rays
    }
}

impl Add for TraceStats {
    type Output = TraceStats;

    fn add(self, rhs: TraceStats) -> TraceStats {
        TraceStats {
            camera_rays: self.camera_rays + rhs.camera_rays,
            camera_hits: self.camera_hits + rhs.camera_hits,
            reflected_rays: self.reflected_rays + rhs.reflected_rays,
            reflected_hits: self.reflected_hits + rhs.reflected_hits,
        }
    }
}

impl Sum for TraceStats {
    fn sum<I: Iterator<Item = TraceStats>>(iter: I) -> TraceStats {
        iter.fold(TraceStats::default(), Add::add)
    }
}

/// Trace one tile: a batch of camera rays, then a batch of mirror
/// reflections for the pixels that hit something.
pub fn trace_tile(tile: &Tile, camera: &Camera, accel: &Accelerator) -> Result<TraceStats> {
    let n = tile.pixel_count();

    let rays: Vec<Ray> = (0..tile.height)
        .flat_map(|ly| (0..tile.width).map(move |lx| (tile.x + lx, tile.y + ly)))
        .map(|(x, y)| camera.ray(x, y))
        .collect();
    let mut t_hits = vec![f32::INFINITY; n];
    let mut interactions = vec![SurfaceInteraction::default(); n];
    let no_skip = vec![false; n];
    accel.intersect_batch(&rays, &mut t_hits, &mut interactions, &no_skip)?;

    let skip: Vec<bool> = interactions.iter().map(|i| !i.valid).collect();
    let reflected: Vec<Ray> = rays
        .iter()
        .zip(&interactions)
        .map(|(ray, hit)| {
            if hit.valid {
                let d = ray.direction();
                Ray::new_simple(hit.position, d - 2.0 * d.dot(hit.normal) * hit.normal)
            } else {
                *ray
            }
        })
        .collect();
    let mut reflected_t = vec![f32::INFINITY; n];
    let mut reflected_hits = vec![SurfaceInteraction::default(); n];
    accel.intersect_batch(&reflected, &mut reflected_t, &mut reflected_hits, &skip)?;

    let camera_hits = skip.iter().filter(|s| !**s).count();
    Ok(TraceStats {
        camera_rays: n,
        camera_hits,
        reflected_rays: camera_hits,
        reflected_hits: reflected_hits.iter().filter(|i| i.valid).count(),
    })
}
