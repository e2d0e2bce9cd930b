use crate::Vec3;

/// A ray in 3D space with origin, direction, and time.
///
/// The valid parameter range of a query is not stored on the ray: callers
/// carry the current closest hit distance (`t_hit`) alongside it, and the
/// ray is considered to span `[0, t_hit]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3, time: f32) -> Self {
        Self {
            origin,
            direction,
            time,
        }
    }

    /// Create a ray at time 0.
    #[inline]
    pub fn new_simple(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction, 0.0)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Point along the ray at parameter t: origin + t * direction.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Componentwise reciprocal of the direction, used by slab tests.
    ///
    /// Zero components become signed infinities.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.direction.recip()
    }

    /// Per-axis flag telling whether the direction points towards negative values.
    #[inline]
    pub fn dir_is_neg(inv_dir: Vec3) -> [bool; 3] {
        [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0]
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            time: 0.0,
        }
    }
}
