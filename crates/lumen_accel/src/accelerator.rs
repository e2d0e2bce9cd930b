//! Backend-polymorphic intersection front end.
//!
//! [`Accelerator`] is a closed set of backends behind one contract. Every
//! variant owns its backend exclusively, so dropping the accelerator releases
//! whatever device resources the backend acquired.

#[cfg(feature = "embree")]
use crate::embree::EmbreeAccelerator;
use crate::{
    primitive::{Boundable, PrimitiveRef},
    AccelError, AcceleratorConfig, AcceleratorKind, BoundingHierarchy, Result, SurfaceInteraction,
};
use lumen_math::{Bounds3, Ray};

/// The scene's ray intersection structure for the duration of a render.
pub enum Accelerator {
    BoundingHierarchy(BoundingHierarchy),
    #[cfg(feature = "embree")]
    Embree(EmbreeAccelerator),
}

impl Accelerator {
    /// Build the backend selected by `config` over `primitives`.
    ///
    /// Fails if the configuration is invalid or the backend cannot be set up;
    /// such failures must stop the render before it starts.
    pub fn build(primitives: Vec<PrimitiveRef>, config: &AcceleratorConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Building {} accelerator over {} primitives",
            config.backend.name(),
            primitives.len()
        );

        match config.backend {
            AcceleratorKind::BoundingHierarchy => Ok(Accelerator::BoundingHierarchy(
                BoundingHierarchy::new(primitives, &config.bvh),
            )),
            #[cfg(feature = "embree")]
            AcceleratorKind::Embree => Ok(Accelerator::Embree(EmbreeAccelerator::new(&primitives)?)),
            #[cfg(not(feature = "embree"))]
            AcceleratorKind::Embree => Err(AccelError::BackendUnavailable("embree")),
        }
    }

    pub fn kind(&self) -> AcceleratorKind {
        match self {
            Accelerator::BoundingHierarchy(_) => AcceleratorKind::BoundingHierarchy,
            #[cfg(feature = "embree")]
            Accelerator::Embree(_) => AcceleratorKind::Embree,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Closest hit along `ray` within `[0, *t_hit]`.
    ///
    /// Writes `t_hit` and `interaction` only on a closer hit and returns
    /// whether one was found.
    pub fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> Result<bool> {
        match self {
            Accelerator::BoundingHierarchy(bvh) => Ok(bvh.intersect(ray, t_hit, interaction)),
            #[cfg(feature = "embree")]
            Accelerator::Embree(embree) => Ok(embree.intersect(ray, t_hit, interaction)),
        }
    }

    /// Batched form of [`Accelerator::intersect`].
    ///
    /// Entry `i` is queried exactly as the single-ray form would, unless
    /// `skip[i]` is set, in which case `t_hits[i]` and `interactions[i]` are
    /// not touched. The slices are validated before any entry is written, so
    /// a failing call leaves every entry unchanged.
    pub fn intersect_batch(
        &self,
        rays: &[Ray],
        t_hits: &mut [f32],
        interactions: &mut [SurfaceInteraction],
        skip: &[bool],
    ) -> Result<()> {
        let n = rays.len();
        if t_hits.len() != n || interactions.len() != n || skip.len() != n {
            return Err(AccelError::BatchLength {
                rays: n,
                t_hits: t_hits.len(),
                interactions: interactions.len(),
                skip: skip.len(),
            });
        }

        let active = rays
            .iter()
            .zip(t_hits.iter_mut())
            .zip(interactions.iter_mut())
            .zip(skip)
            .filter(|(_, skipped)| !**skipped)
            .map(|(((ray, t_hit), interaction), _)| (ray, t_hit, interaction));

        match self {
            Accelerator::BoundingHierarchy(bvh) => {
                for (ray, t_hit, interaction) in active {
                    bvh.intersect(ray, t_hit, interaction);
                }
            }
            #[cfg(feature = "embree")]
            Accelerator::Embree(embree) => {
                for (ray, t_hit, interaction) in active {
                    embree.intersect(ray, t_hit, interaction);
                }
            }
        }
        Ok(())
    }

    pub fn world_bound(&self) -> Bounds3 {
        match self {
            Accelerator::BoundingHierarchy(bvh) => bvh.world_bound(),
            #[cfg(feature = "embree")]
            Accelerator::Embree(embree) => embree.world_bound(),
        }
    }

    pub fn object_bound(&self) -> Bounds3 {
        match self {
            Accelerator::BoundingHierarchy(bvh) => bvh.object_bound(),
            #[cfg(feature = "embree")]
            Accelerator::Embree(embree) => embree.object_bound(),
        }
    }
}

impl std::fmt::Debug for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accelerator")
            .field("backend", &self.name())
            .field("world_bound", &self.world_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cuboid, Sphere, Triangle};
    use lumen_math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn scene(rng: &mut StdRng) -> Vec<PrimitiveRef> {
        let mut prims: Vec<PrimitiveRef> = Vec::new();
        for i in 0..150 {
            let center = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            match i % 3 {
                0 => prims.push(Box::new(Sphere::new(center, 0.6))),
                1 => prims.push(Box::new(Cuboid::centered(center, Vec3::splat(0.8)))),
                _ => prims.push(Box::new(Triangle::new(
                    center,
                    center + Vec3::new(1.0, 0.0, 0.2),
                    center + Vec3::new(0.0, 1.0, -0.3),
                ))),
            }
        }
        prims
    }

    fn rays(rng: &mut StdRng, n: usize) -> Vec<Ray> {
        (0..n)
            .map(|_| {
                let origin = Vec3::new(rng.gen_range(-15.0..15.0), rng.gen_range(-15.0..15.0), -20.0);
                let target = Vec3::new(rng.gen_range(-8.0..8.0), rng.gen_range(-8.0..8.0), 0.0);
                Ray::new_simple(origin, target - origin)
            })
            .collect()
    }

    #[test]
    fn test_build_default_backend() {
        let mut rng = StdRng::seed_from_u64(1);
        let accel = Accelerator::build(scene(&mut rng), &AcceleratorConfig::default()).unwrap();
        assert_eq!(accel.kind(), AcceleratorKind::BoundingHierarchy);
        assert_eq!(accel.name(), "bounding_hierarchy");
        assert!(!accel.world_bound().is_empty());
        assert_eq!(accel.world_bound(), accel.object_bound());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AcceleratorConfig::default();
        config.bvh.buckets = 0;
        let result = Accelerator::build(Vec::new(), &config);
        assert!(matches!(result, Err(AccelError::InvalidConfig(_))));
    }

    #[cfg(not(feature = "embree"))]
    #[test]
    fn test_unavailable_backend_fails_at_build() {
        let config = AcceleratorConfig {
            backend: AcceleratorKind::Embree,
            ..Default::default()
        };
        let result = Accelerator::build(Vec::new(), &config);
        assert!(matches!(result, Err(AccelError::BackendUnavailable("embree"))));
    }

    #[test]
    fn test_three_cubes_through_dispatcher() {
        let prims: Vec<PrimitiveRef> = vec![
            Box::new(Cuboid::centered(Vec3::ZERO, Vec3::ONE)),
            Box::new(Cuboid::centered(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE)),
            Box::new(Cuboid::centered(Vec3::new(20.0, 0.0, 0.0), Vec3::ONE)),
        ];
        let accel = Accelerator::build(prims, &AcceleratorConfig::default()).unwrap();

        let ray = Ray::new_simple(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let mut t_hit = f32::INFINITY;
        let mut interaction = SurfaceInteraction::default();
        assert!(accel.intersect(&ray, &mut t_hit, &mut interaction).unwrap());
        assert!((t_hit - 4.5).abs() < 1e-5);
        assert_eq!(interaction.primitive, Some(0));
    }

    #[test]
    fn test_empty_scene_batch_leaves_entries_alone() {
        let accel = Accelerator::build(Vec::new(), &AcceleratorConfig::default()).unwrap();
        let rays = vec![Ray::new_simple(Vec3::ZERO, Vec3::X); 3];
        let mut t_hits = vec![7.0; 3];
        let mut interactions = vec![SurfaceInteraction::default(); 3];

        accel
            .intersect_batch(&rays, &mut t_hits, &mut interactions, &[false; 3])
            .unwrap();
        assert_eq!(t_hits, vec![7.0; 3]);
        assert!(interactions.iter().all(|i| !i.valid));
    }

    #[test]
    fn test_batch_skip_mask() {
        let mut rng = StdRng::seed_from_u64(17);
        let accel = Accelerator::build(scene(&mut rng), &AcceleratorConfig::default()).unwrap();
        let rays = rays(&mut rng, 256);
        let skip: Vec<bool> = (0..rays.len()).map(|_| rng.gen_bool(0.4)).collect();

        // Skipped entries carry sentinel values that must survive bit for bit
        let sentinel = SurfaceInteraction {
            valid: true,
            position: Vec3::splat(-123.0),
            primitive: Some(usize::MAX),
            ..Default::default()
        };
        let mut t_hits: Vec<f32> = (0..rays.len()).map(|i| if skip[i] { -1.5 } else { f32::INFINITY }).collect();
        let mut interactions: Vec<SurfaceInteraction> = (0..rays.len())
            .map(|i| if skip[i] { sentinel } else { SurfaceInteraction::default() })
            .collect();

        accel.intersect_batch(&rays, &mut t_hits, &mut interactions, &skip).unwrap();

        let mut hits = 0;
        for i in 0..rays.len() {
            if skip[i] {
                assert_eq!(t_hits[i].to_bits(), (-1.5_f32).to_bits());
                assert_eq!(interactions[i], sentinel);
                continue;
            }
            let mut t_hit = f32::INFINITY;
            let mut interaction = SurfaceInteraction::default();
            accel.intersect(&rays[i], &mut t_hit, &mut interaction).unwrap();
            assert_eq!(t_hits[i].to_bits(), t_hit.to_bits());
            assert_eq!(interactions[i], interaction);
            if interaction.valid {
                hits += 1;
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_batch_order_independent() {
        let mut rng = StdRng::seed_from_u64(23);
        let accel = Accelerator::build(scene(&mut rng), &AcceleratorConfig::default()).unwrap();
        let rays = rays(&mut rng, 64);
        let reversed: Vec<Ray> = rays.iter().rev().copied().collect();
        let skip = vec![false; rays.len()];

        let mut forward_t = vec![f32::INFINITY; rays.len()];
        let mut forward_i = vec![SurfaceInteraction::default(); rays.len()];
        accel.intersect_batch(&rays, &mut forward_t, &mut forward_i, &skip).unwrap();

        let mut backward_t = vec![f32::INFINITY; rays.len()];
        let mut backward_i = vec![SurfaceInteraction::default(); rays.len()];
        accel.intersect_batch(&reversed, &mut backward_t, &mut backward_i, &skip).unwrap();

        backward_t.reverse();
        backward_i.reverse();
        assert_eq!(forward_t, backward_t);
        assert_eq!(forward_i, backward_i);
    }

    #[test]
    fn test_batch_length_mismatch_is_atomic() {
        let mut rng = StdRng::seed_from_u64(29);
        let accel = Accelerator::build(scene(&mut rng), &AcceleratorConfig::default()).unwrap();
        let rays = rays(&mut rng, 8);
        let mut t_hits = vec![f32::INFINITY; 8];
        let mut interactions = vec![SurfaceInteraction::default(); 7];

        let result = accel.intersect_batch(&rays, &mut t_hits, &mut interactions, &[false; 8]);
        assert!(matches!(result, Err(AccelError::BatchLength { interactions: 7, .. })));
        assert!(t_hits.iter().all(|t| *t == f32::INFINITY));
        assert!(interactions.iter().all(|i| !i.valid));
    }

    #[test]
    fn test_accelerator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Accelerator>();
    }
}
