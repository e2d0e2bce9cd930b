//! Lumen math - vectors, rays and bounding boxes for the acceleration core.

// Re-export glam for convenience
pub use glam::*;

mod bounds;
mod interval;
mod ray;

pub use bounds::{gamma, Bounds3};
pub use interval::Interval;
pub use ray::Ray;
