//! Sphere primitive.

use crate::{
    primitive::{Boundable, Geometry, Intersectable, Primitive, T_EPSILON},
    SurfaceInteraction,
};
use lumen_math::{Bounds3, Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    bbox: Bounds3,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Bounds3::new(center - rvec, center + rvec);

        Self {
            center,
            radius,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y, phi: angle around Y from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Boundable for Sphere {
    fn world_bound(&self) -> Bounds3 {
        self.bbox
    }
}

impl Intersectable for Sphere {
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();
        let ray_t = Interval::new(T_EPSILON, *t_hit);

        // Nearest root in range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return false;
            }
        }

        let p = ray.at(root);
        let outward_normal = (p - self.center) / self.radius;
        interaction.set_hit(ray.direction(), p, outward_normal, Self::sphere_uv(outward_normal));
        *t_hit = root;
        true
    }
}

impl Primitive for Sphere {
    fn geometry(&self) -> Option<Geometry> {
        Some(Geometry::Sphere {
            center: self.center,
            radius: self.radius,
        })
    }
}
