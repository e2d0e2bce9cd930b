//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{
    primitive::{Boundable, Geometry, Intersectable, Primitive, T_EPSILON},
    SurfaceInteraction,
};
use lumen_math::{Bounds3, Interval, Ray, Vec2, Vec3};

/// A triangle primitive.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Pre-computed face normal (unit length)
    normal: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self { v0, v1, v2, normal }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }
}

impl Boundable for Triangle {
    /// Exact bound of the three vertices; flat triangles give flat boxes.
    fn world_bound(&self) -> Bounds3 {
        Bounds3::union_point(&Bounds3::new(self.v0, self.v1), self.v2)
    }
}

impl Intersectable for Triangle {
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Parallel to the plane
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if !Interval::new(T_EPSILON, *t_hit).surrounds(t) {
            return false;
        }

        interaction.set_hit(ray.direction(), ray.at(t), self.normal, Vec2::new(u, v));
        *t_hit = t;
        true
    }
}

impl Primitive for Triangle {
    fn geometry(&self) -> Option<Geometry> {
        Some(Geometry::Triangles(vec![self.vertices()]))
    }
}
