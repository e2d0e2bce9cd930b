//! Axis-aligned box primitive.

use crate::{
    primitive::{Boundable, Geometry, Intersectable, Primitive, T_EPSILON},
    SurfaceInteraction,
};
use lumen_math::{Bounds3, Interval, Ray, Vec2, Vec3};

/// A solid axis-aligned box.
#[derive(Debug, Clone, Copy)]
pub struct Cuboid {
    bounds: Bounds3,
}

impl Cuboid {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            bounds: Bounds3::new(a, b),
        }
    }

    /// Box centered on `center` with the given edge lengths.
    pub fn centered(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    /// The twelve triangles of the box surface.
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        let (lo, hi) = (self.bounds.p_min, self.bounds.p_max);
        let c = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };
        let quads = [
            [c(false, false, false), c(false, true, false), c(false, true, true), c(false, false, true)],
            [c(true, false, false), c(true, false, true), c(true, true, true), c(true, true, false)],
            [c(false, false, false), c(false, false, true), c(true, false, true), c(true, false, false)],
            [c(false, true, false), c(true, true, false), c(true, true, true), c(false, true, true)],
            [c(false, false, false), c(true, false, false), c(true, true, false), c(false, true, false)],
            [c(false, false, true), c(false, true, true), c(true, true, true), c(true, false, true)],
        ];
        quads
            .iter()
            .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
            .collect()
    }
}

impl Boundable for Cuboid {
    fn world_bound(&self) -> Bounds3 {
        self.bounds
    }
}

impl Intersectable for Cuboid {
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        let inv_dir = ray.inv_direction();
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut near_axis = 0;
        let mut far_axis = 0;

        for axis in 0..3 {
            let t0 = (self.bounds.p_min[axis] - ray.origin[axis]) * inv_dir[axis];
            let t1 = (self.bounds.p_max[axis] - ray.origin[axis]) * inv_dir[axis];
            let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            if lo > t_near {
                t_near = lo;
                near_axis = axis;
            }
            if hi < t_far {
                t_far = hi;
                far_axis = axis;
            }
        }
        if t_near > t_far {
            return false;
        }

        let ray_t = Interval::new(T_EPSILON, *t_hit);
        let (t, axis, exiting) = if ray_t.surrounds(t_near) {
            (t_near, near_axis, false)
        } else if ray_t.surrounds(t_far) {
            (t_far, far_axis, true)
        } else {
            return false;
        };

        let mut outward_normal = Vec3::ZERO;
        let along = ray.direction[axis].signum();
        outward_normal[axis] = if exiting { along } else { -along };

        let p = ray.at(t);
        let o = self.bounds.offset(p);
        let uv = Vec2::new(o[(axis + 1) % 3], o[(axis + 2) % 3]);
        interaction.set_hit(ray.direction(), p, outward_normal, uv);
        *t_hit = t;
        true
    }
}

impl Primitive for Cuboid {
    fn geometry(&self) -> Option<Geometry> {
        Some(Geometry::Triangles(self.triangles()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_hit_distance() {
        let cube = Cuboid::centered(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new_simple(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);

        let mut t_hit = f32::INFINITY;
        let mut rec = SurfaceInteraction::default();
        assert!(cube.intersect(&ray, &mut t_hit, &mut rec));
        assert!((t_hit - 4.5).abs() < 1e-5);
        assert_eq!(rec.normal, -Vec3::X);
        assert!((rec.position - Vec3::new(-0.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_hit_from_inside_uses_exit_face() {
        let cube = Cuboid::centered(Vec3::ZERO, Vec3::splat(2.0));
        let ray = Ray::new_simple(Vec3::ZERO, Vec3::Y);

        let mut t_hit = f32::INFINITY;
        let mut rec = SurfaceInteraction::default();
        assert!(cube.intersect(&ray, &mut t_hit, &mut rec));
        assert!((t_hit - 1.0).abs() < 1e-5);
        // Outward +Y, flipped to face the ray
        assert_eq!(rec.normal, -Vec3::Y);
    }

    #[test]
    fn test_miss_and_behind() {
        let cube = Cuboid::centered(Vec3::ZERO, Vec3::ONE);
        let mut t_hit = f32::INFINITY;
        let mut rec = SurfaceInteraction::default();

        let beside = Ray::new_simple(Vec3::new(-5.0, 2.0, 0.0), Vec3::X);
        assert!(!cube.intersect(&beside, &mut t_hit, &mut rec));

        let behind = Ray::new_simple(Vec3::new(5.0, 0.0, 0.0), Vec3::X);
        assert!(!cube.intersect(&behind, &mut t_hit, &mut rec));
        assert!(!rec.valid);
    }

    #[test]
    fn test_triangles_cover_surface() {
        let cube = Cuboid::centered(Vec3::ZERO, Vec3::ONE);
        let triangles = cube.triangles();
        assert_eq!(triangles.len(), 12);
        for tri in &triangles {
            for v in tri {
                assert_eq!(v.abs(), Vec3::splat(0.5));
            }
        }
    }
}
