//! Surface interaction record filled in by intersection queries.

use lumen_math::{Vec2, Vec3};

/// Record of the closest ray-surface intersection found so far.
///
/// Intersectors overwrite it only when they find a hit closer than the
/// caller's current `t_hit`, so a record that stays `valid == false` after a
/// query means "no hit".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInteraction {
    /// Whether any intersector has written a hit
    pub valid: bool,
    /// World-space hit point
    pub position: Vec3,
    /// Unit geometric normal, facing against the incoming ray
    pub normal: Vec3,
    /// Direction back towards the ray origin
    pub wo: Vec3,
    /// Surface parameterization at the hit
    pub uv: Vec2,
    /// Index of the hit primitive in the list the accelerator was built from
    pub primitive: Option<usize>,
}

impl Default for SurfaceInteraction {
    fn default() -> Self {
        Self {
            valid: false,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            wo: Vec3::ZERO,
            uv: Vec2::ZERO,
            primitive: None,
        }
    }
}

impl SurfaceInteraction {
    /// Fill the record for a hit at `position` with the given outward normal.
    ///
    /// The stored normal is flipped to face the incoming ray.
    pub fn set_hit(&mut self, direction: Vec3, position: Vec3, outward_normal: Vec3, uv: Vec2) {
        self.valid = true;
        self.position = position;
        self.normal = if direction.dot(outward_normal) < 0.0 {
            outward_normal
        } else {
            -outward_normal
        };
        self.wo = -direction;
        self.uv = uv;
    }
}
