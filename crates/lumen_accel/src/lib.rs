//! Lumen acceleration core - ray/scene intersection for the path tracer.
//!
//! Primitives are gathered into a surface-area-heuristic BVH, flattened into a
//! depth-first node array, and queried through [`Accelerator`], a closed set of
//! backends sharing one single-ray and one batched contract.
//!
//! ```ignore
//! let prims: Vec<PrimitiveRef> = vec![Box::new(Sphere::new(Vec3::ZERO, 1.0))];
//! let accel = Accelerator::build(prims, &AcceleratorConfig::default())?;
//!
//! let mut t_hit = f32::INFINITY;
//! let mut interaction = SurfaceInteraction::default();
//! accel.intersect(&ray, &mut t_hit, &mut interaction)?;
//! ```

mod accelerator;
pub mod builder;
mod bvh;
mod config;
mod cuboid;
#[cfg(feature = "embree")]
mod embree;
mod error;
mod interaction;
mod primitive;
mod sphere;
mod triangle;

pub use accelerator::Accelerator;
pub use builder::{build, BoundingHierarchyBuilder, BuildOutput, BuildStats, Node};
pub use bvh::BoundingHierarchy;
pub use config::{AcceleratorConfig, AcceleratorKind, BvhConfig, DEFAULT_BUCKETS, DEFAULT_PRIMITIVES_PER_NODE};
pub use cuboid::Cuboid;
#[cfg(feature = "embree")]
pub use embree::EmbreeAccelerator;
pub use error::{embree_error_name, AccelError, Result};
pub use interaction::SurfaceInteraction;
pub use primitive::{Boundable, Geometry, Intersectable, Primitive, PrimitiveRef, T_EPSILON};
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export the math types that appear in this crate's API
pub use lumen_math::{Bounds3, Interval, Ray, Vec2, Vec3};
