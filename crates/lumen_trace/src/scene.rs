//! Procedural test scenes.

use lumen_accel::{Cuboid, PrimitiveRef, Sphere, Triangle};
use lumen_math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Half extent of the cube the random scene is scattered in.
pub const SCENE_EXTENT: f32 = 20.0;

/// Scatter `count` spheres, boxes and triangles through a cube around the
/// origin. The same seed always yields the same scene.
pub fn random_scene(count: usize, seed: u64) -> Vec<PrimitiveRef> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut primitives: Vec<PrimitiveRef> = Vec::with_capacity(count);

    for _ in 0..count {
        let center = random_point(&mut rng, SCENE_EXTENT);
        let choose = rng.gen::<f32>();

        if choose < 0.4 {
            let radius = rng.gen_range(0.1..0.6);
            primitives.push(Box::new(Sphere::new(center, radius)));
        } else if choose < 0.7 {
            let size = Vec3::new(
                rng.gen_range(0.2..1.0),
                rng.gen_range(0.2..1.0),
                rng.gen_range(0.2..1.0),
            );
            primitives.push(Box::new(Cuboid::centered(center, size)));
        } else {
            let a = center + random_point(&mut rng, 0.8);
            let b = center + random_point(&mut rng, 0.8);
            primitives.push(Box::new(Triangle::new(center, a, b)));
        }
    }

    primitives
}

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}
