use crate::{Ray, Vec3};

/// Conservative bound on the relative rounding error of `n` chained
/// floating-point operations.
#[inline]
pub fn gamma(n: i32) -> f32 {
    let e = f32::EPSILON * 0.5;
    (n as f32 * e) / (1.0 - n as f32 * e)
}

/// Axis-aligned bounding box.
///
/// `p_min <= p_max` componentwise for every non-empty bound. [`Bounds3::EMPTY`]
/// (`+inf`, `-inf`) is the identity of [`Bounds3::union`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3 {
    pub p_min: Vec3,
    pub p_max: Vec3,
}

impl Bounds3 {
    pub const EMPTY: Bounds3 = Bounds3 {
        p_min: Vec3::INFINITY,
        p_max: Vec3::NEG_INFINITY,
    };

    /// Create a bound from two arbitrary corner points.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            p_min: a.min(b),
            p_max: a.max(b),
        }
    }

    /// Degenerate bound enclosing a single point.
    pub fn from_point(p: Vec3) -> Self {
        Self { p_min: p, p_max: p }
    }

    pub fn union(a: &Bounds3, b: &Bounds3) -> Self {
        Self {
            p_min: a.p_min.min(b.p_min),
            p_max: a.p_max.max(b.p_max),
        }
    }

    pub fn union_point(b: &Bounds3, p: Vec3) -> Self {
        Self {
            p_min: b.p_min.min(p),
            p_max: b.p_max.max(p),
        }
    }

    /// True for any bound with `p_min > p_max` on some axis, including [`Bounds3::EMPTY`].
    pub fn is_empty(&self) -> bool {
        self.p_min.x > self.p_max.x || self.p_min.y > self.p_max.y || self.p_min.z > self.p_max.z
    }

    pub fn diagonal(&self) -> Vec3 {
        self.p_max - self.p_min
    }

    /// Surface area of the box; zero for empty bounds.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        self.p_min * 0.5 + self.p_max * 0.5
    }

    /// Position of `p` relative to the box: 0 at `p_min`, 1 at `p_max`.
    ///
    /// Axes with zero extent keep the unnormalized difference.
    pub fn offset(&self, p: Vec3) -> Vec3 {
        let mut o = p - self.p_min;
        if self.p_max.x > self.p_min.x {
            o.x /= self.p_max.x - self.p_min.x;
        }
        if self.p_max.y > self.p_min.y {
            o.y /= self.p_max.y - self.p_min.y;
        }
        if self.p_max.z > self.p_min.z {
            o.z /= self.p_max.z - self.p_min.z;
        }
        o
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// True if `other` lies entirely inside this box (boundaries included).
    pub fn contains_bounds(&self, other: &Bounds3) -> bool {
        other.is_empty()
            || (self.p_min.cmple(other.p_min).all() && other.p_max.cmple(self.p_max).all())
    }

    #[inline]
    fn corner(&self, max: bool) -> Vec3 {
        if max {
            self.p_max
        } else {
            self.p_min
        }
    }

    /// Slab test of the ray segment `[0, t_max]` against the box.
    ///
    /// `inv_dir` and `dir_is_neg` come from [`Ray::inv_direction`] and
    /// [`Ray::dir_is_neg`] so they are computed once per traversal. NaNs
    /// produced by rays lying in a slab plane never reject the box.
    #[inline]
    pub fn intersect_p(&self, ray: &Ray, t_max: f32, inv_dir: Vec3, dir_is_neg: [bool; 3]) -> bool {
        let widen = 1.0 + 2.0 * gamma(3);
        let mut t0 = 0.0_f32;
        let mut t1 = t_max;
        for axis in 0..3 {
            let near = (self.corner(dir_is_neg[axis])[axis] - ray.origin[axis]) * inv_dir[axis];
            let far = (self.corner(!dir_is_neg[axis])[axis] - ray.origin[axis]) * inv_dir[axis] * widen;
            if near > t0 {
                t0 = near;
            }
            if far < t1 {
                t1 = far;
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}
