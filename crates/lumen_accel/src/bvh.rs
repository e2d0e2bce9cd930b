//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! An immutable, flattened tree produced by [`crate::builder`], together with
//! the primitives reordered so that each leaf owns a contiguous slice.
//! Traversal only reads the structure, so one hierarchy can serve any number
//! of render threads at once.

use crate::{
    builder::{self, BuildStats, Node},
    primitive::{Boundable, Intersectable, Primitive, PrimitiveRef},
    BvhConfig, SurfaceInteraction,
};
use lumen_math::{Bounds3, Ray};
use smallvec::SmallVec;

/// Traversal stack depth that stays inline; deeper trees spill to the heap.
const INLINE_STACK_DEPTH: usize = 64;

/// Software BVH over owned primitives.
pub struct BoundingHierarchy<P: Primitive = PrimitiveRef> {
    nodes: Vec<Node>,
    primitives: Vec<P>,
    /// Input index of the primitive stored at each slot
    permutation: Vec<usize>,
    stats: BuildStats,
}

impl<P: Primitive> BoundingHierarchy<P> {
    /// Build a hierarchy over `primitives`, taking ownership and reordering them.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`BvhConfig::validate`]. [`crate::Accelerator::build`]
    /// reports the same failure as an error instead.
    pub fn new(primitives: Vec<P>, config: &BvhConfig) -> Self {
        let output = builder::build(&primitives, config);

        // rank[i] is the slot primitive i moves to
        let mut rank = vec![0; primitives.len()];
        for (slot, &index) in output.permutation.iter().enumerate() {
            rank[index] = slot;
        }
        let mut ranked: Vec<(usize, P)> = primitives
            .into_iter()
            .enumerate()
            .map(|(index, primitive)| (rank[index], primitive))
            .collect();
        ranked.sort_unstable_by_key(|(slot, _)| *slot);
        let primitives = ranked.into_iter().map(|(_, primitive)| primitive).collect();

        if output.stats.leaf_primitives > 0 {
            log::info!(
                "BVH built: {} nodes ({} interior, {} leaves), {:.2} primitives per leaf, depth {}",
                output.stats.total_nodes(),
                output.stats.interior_nodes,
                output.stats.leaf_nodes,
                output.stats.primitives_per_leaf(),
                output.stats.max_depth
            );
        } else {
            log::info!("BVH built over an empty scene");
        }

        Self {
            nodes: output.nodes,
            primitives,
            permutation: output.permutation,
            stats: output.stats,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Primitives in leaf order.
    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    /// Input index of the primitive stored at each slot of [`Self::primitives`].
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Find the closest hit along `ray` within `[0, *t_hit]`.
    ///
    /// Returns true if any primitive reported a closer hit, in which case
    /// `t_hit` and `interaction` hold the closest one and
    /// `interaction.primitive` is its input index. With an empty hierarchy
    /// nothing is written.
    pub fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = ray.inv_direction();
        let dir_is_neg = Ray::dir_is_neg(inv_dir);
        let mut to_visit: SmallVec<[usize; INLINE_STACK_DEPTH]> = SmallVec::new();
        let mut current = 0;
        let mut hit = false;

        loop {
            let node = &self.nodes[current];
            if node.bounds.intersect_p(ray, *t_hit, inv_dir, dir_is_neg) {
                if node.is_leaf() {
                    for slot in node.primitive_range() {
                        if self.primitives[slot].intersect(ray, t_hit, interaction) {
                            interaction.primitive = Some(self.permutation[slot]);
                            hit = true;
                        }
                    }
                } else if dir_is_neg[node.axis] {
                    // Right child is nearer: visit it first
                    to_visit.push(current + 1);
                    current = node.second_child();
                    continue;
                } else {
                    to_visit.push(node.second_child());
                    current += 1;
                    continue;
                }
            }

            match to_visit.pop() {
                Some(next) => current = next,
                None => break,
            }
        }

        hit
    }
}

impl<P: Primitive> Boundable for BoundingHierarchy<P> {
    fn world_bound(&self) -> Bounds3 {
        self.nodes.first().map_or(Bounds3::EMPTY, |root| root.bounds)
    }
}

impl<P: Primitive> Intersectable for BoundingHierarchy<P> {
    fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        BoundingHierarchy::intersect(self, ray, t_hit, interaction)
    }
}
