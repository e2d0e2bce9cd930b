//! Capabilities the accelerators require from scene primitives.

use crate::SurfaceInteraction;
use lumen_math::{Bounds3, Ray, Vec3};

/// Smallest hit distance reference shapes accept, to avoid self-intersection.
pub const T_EPSILON: f32 = 1e-4;

/// Anything with a world-space bounding box.
pub trait Boundable {
    fn world_bound(&self) -> Bounds3;

    /// Bound in the object's own space. Primitives without a separate
    /// object space return the world bound.
    fn object_bound(&self) -> Bounds3 {
        self.world_bound()
    }
}

/// Anything a ray can be tested against.
pub trait Intersectable {
    /// Test `ray` over `(0, *t_hit)`.
    ///
    /// On a hit strictly closer than `*t_hit`, writes the new distance and the
    /// interaction record and returns true. Otherwise leaves both untouched.
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool;
}

/// Geometry description uploaded to hardware backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Triangle soup with vertices in world space
    Triangles(Vec<[Vec3; 3]>),
    Sphere { center: Vec3, radius: f32 },
}

/// A scene primitive: boundable, intersectable and shareable across render threads.
pub trait Primitive: Boundable + Intersectable + Send + Sync {
    /// Backend-neutral description of the shape, if it has one.
    ///
    /// Primitives returning `None` are skipped by hardware backends.
    fn geometry(&self) -> Option<Geometry> {
        None
    }
}

/// Owned, type-erased primitive as supplied by scene assembly.
pub type PrimitiveRef = Box<dyn Primitive>;

impl<T: Boundable + ?Sized> Boundable for Box<T> {
    fn world_bound(&self) -> Bounds3 {
        (**self).world_bound()
    }

    fn object_bound(&self) -> Bounds3 {
        (**self).object_bound()
    }
}

impl<T: Intersectable + ?Sized> Intersectable for Box<T> {
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        (**self).intersect(ray, t_hit, interaction)
    }
}

impl<T: Primitive + ?Sized> Primitive for Box<T> {
    fn geometry(&self) -> Option<Geometry> {
        (**self).geometry()
    }
}

impl Boundable for Bounds3 {
    fn world_bound(&self) -> Bounds3 {
        *self
    }
}
