//! Surface-area-heuristic BVH construction.
//!
//! The builder flattens the tree while it recurses: every node is written at
//! the position of its depth-first visit, so an interior node's left child is
//! always the next element of the array and only the right child's index has
//! to be stored. Primitives are never moved during the build; a scratch array
//! of cached bounds is partitioned instead and its final order becomes the
//! permutation applied to the primitives.

use crate::{primitive::Boundable, BvhConfig};
use lumen_math::{Bounds3, Vec3};
use std::fmt;
use std::ops::Range;

/// Flattened BVH node.
///
/// Leaves have `count > 0` and own primitives `[offset, offset + count)`.
/// Interior nodes have `count == 0`; their left child is the next node in the
/// array and `offset` is the index of the right child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub bounds: Bounds3,
    pub offset: usize,
    pub count: usize,
    pub axis: usize,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            bounds: Bounds3::EMPTY,
            offset: 0,
            count: 0,
            axis: 0,
        }
    }
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    /// Primitive slots owned by a leaf. Empty for interior nodes.
    #[inline]
    pub fn primitive_range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }

    /// Index of the right child of an interior node.
    #[inline]
    pub fn second_child(&self) -> usize {
        self.offset
    }
}

/// Diagnostics gathered while building one hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub interior_nodes: usize,
    pub leaf_nodes: usize,
    /// Primitives referenced by leaves; equals the primitive count of the build
    pub leaf_primitives: usize,
    pub max_leaf_size: usize,
    /// Depth of the deepest node, the root being at depth 0
    pub max_depth: usize,
}

impl BuildStats {
    pub fn total_nodes(&self) -> usize {
        self.interior_nodes + self.leaf_nodes
    }

    pub fn primitives_per_leaf(&self) -> f32 {
        if self.leaf_nodes == 0 {
            return 0.0;
        }
        self.leaf_primitives as f32 / self.leaf_nodes as f32
    }

    fn record_leaf(&mut self, count: usize, depth: usize) {
        self.leaf_nodes += 1;
        self.leaf_primitives += count;
        self.max_leaf_size = self.max_leaf_size.max(count);
        self.max_depth = self.max_depth.max(depth);
    }

    fn record_interior(&mut self, depth: usize) {
        self.interior_nodes += 1;
        self.max_depth = self.max_depth.max(depth);
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BVH:")?;
        writeln!(f, "  Interior nodes:            {}", self.interior_nodes)?;
        writeln!(f, "  Leaf nodes:                {}", self.leaf_nodes)?;
        writeln!(
            f,
            "  Primitives per leaf node:  {} / {} ({:.2})",
            self.leaf_primitives,
            self.leaf_nodes,
            self.primitives_per_leaf()
        )?;
        writeln!(f, "  Largest leaf:              {}", self.max_leaf_size)?;
        write!(f, "  Depth:                     {}", self.max_depth)
    }
}

/// Result of a build: the flattened tree and the primitive order it refers to.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub nodes: Vec<Node>,
    /// `permutation[slot]` is the input index of the primitive leaves reference at `slot`
    pub permutation: Vec<usize>,
    pub stats: BuildStats,
}

/// Build-time copy of a primitive's bound.
#[derive(Debug, Clone, Copy)]
struct CachedPrimitive {
    index: usize,
    bound: Bounds3,
    center: Vec3,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: usize,
    bounds: Bounds3,
}

/// Outcome of evaluating a split for one range.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Split {
    /// Recurse on `[start, mid)` and `[mid, end)`
    Range { start: usize, mid: usize, end: usize },
    /// The heuristic kept the whole range in a leaf, which is already written
    Leaf(Bounds3),
}

/// Single-use builder owning the scratch state of one BVH construction.
pub struct BoundingHierarchyBuilder {
    config: BvhConfig,
    cached: Vec<CachedPrimitive>,
    nodes: Vec<Node>,
    offset_counter: usize,
    stats: BuildStats,
}

/// Build a flattened SAH hierarchy over `primitives`.
///
/// # Panics
///
/// Panics if `config` fails [`BvhConfig::validate`].
pub fn build<B: Boundable>(primitives: &[B], config: &BvhConfig) -> BuildOutput {
    BoundingHierarchyBuilder::new(primitives, *config).build()
}

impl BoundingHierarchyBuilder {
    /// # Panics
    ///
    /// Panics if `config` fails [`BvhConfig::validate`].
    pub fn new<B: Boundable>(primitives: &[B], config: BvhConfig) -> Self {
        if let Err(err) = config.validate() {
            panic!("Cannot build BVH: {}", err);
        }

        let cached = primitives
            .iter()
            .enumerate()
            .map(|(index, primitive)| {
                let bound = primitive.world_bound();
                CachedPrimitive {
                    index,
                    bound,
                    center: bound.centroid(),
                }
            })
            .collect();

        Self {
            config,
            cached,
            nodes: Vec::new(),
            offset_counter: 0,
            stats: BuildStats::default(),
        }
    }

    pub fn build(mut self) -> BuildOutput {
        if !self.cached.is_empty() {
            log::debug!("Building BVH over {} primitives", self.cached.len());
            self.build_range(0..self.cached.len(), 0);
        }
        assert_eq!(
            self.offset_counter,
            self.cached.len(),
            "leaves must cover every primitive exactly once"
        );

        BuildOutput {
            permutation: self.cached.iter().map(|c| c.index).collect(),
            nodes: self.nodes,
            stats: self.stats,
        }
    }

    /// Reserve the slot of the node being visited; children are written after it.
    fn reserve_node(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    fn build_range(&mut self, range: Range<usize>, depth: usize) -> Bounds3 {
        let counter = self.reserve_node();

        let bounds = self.cached[range.clone()]
            .iter()
            .fold(Bounds3::EMPTY, |acc, p| Bounds3::union(&acc, &p.bound));

        if range.len() < self.config.primitives_per_node {
            self.add_leaf(counter, bounds, range, depth);
            return bounds;
        }

        let centroid_bounds = self.cached[range.clone()]
            .iter()
            .fold(Bounds3::EMPTY, |acc, p| Bounds3::union_point(&acc, p.center));
        let axis = centroid_bounds.maximum_extent();

        // All centroids coincide on the widest axis: nothing to discriminate
        if centroid_bounds.p_max[axis] == centroid_bounds.p_min[axis] {
            self.add_leaf(counter, bounds, range, depth);
            return bounds;
        }

        let (start, mid, end) =
            match self.split_surface_area_heuristic(&bounds, &centroid_bounds, axis, range, counter, depth) {
                Split::Range { start, mid, end } => (start, mid, end),
                Split::Leaf(leaf_bounds) => return leaf_bounds,
            };

        let left_bounds = self.build_range(start..mid, depth + 1);
        let before_right = self.nodes.len();
        let right_bounds = self.build_range(mid..end, depth + 1);
        let combined = Bounds3::union(&left_bounds, &right_bounds);

        self.add_interior(counter, combined, axis, before_right, depth);
        combined
    }

    fn add_leaf(&mut self, counter: usize, bounds: Bounds3, range: Range<usize>, depth: usize) {
        assert!(!range.is_empty(), "BVH leaf created for an empty range");
        debug_assert_eq!(self.offset_counter, range.start);

        self.nodes[counter] = Node {
            bounds,
            offset: self.offset_counter,
            count: range.len(),
            axis: 0,
        };
        self.offset_counter += range.len();
        self.stats.record_leaf(range.len(), depth);
    }

    fn add_interior(&mut self, counter: usize, bounds: Bounds3, axis: usize, before_right: usize, depth: usize) {
        self.nodes[counter] = Node {
            bounds,
            offset: before_right,
            count: 0,
            axis,
        };
        self.stats.record_interior(depth);
    }

    /// Sort the range along `axis` and cut it in half.
    fn split_equal(&mut self, axis: usize, range: Range<usize>) -> Split {
        self.cached[range.clone()].sort_by(|a, b| a.center[axis].total_cmp(&b.center[axis]));
        Split::Range {
            start: range.start,
            mid: range.start + range.len() / 2,
            end: range.end,
        }
    }

    /// Choose a split for `range` by bucketing centroids along `axis`.
    ///
    /// Primitives are bucketed over `centroid_bounds`, but split costs are
    /// normalised by the area of `bounds`, the node's own bound. The centroid
    /// bound can be flat (zero area) while the node still needs splitting.
    fn split_surface_area_heuristic(
        &mut self,
        bounds: &Bounds3,
        centroid_bounds: &Bounds3,
        axis: usize,
        range: Range<usize>,
        counter: usize,
        depth: usize,
    ) -> Split {
        let count = range.len();
        if count <= 2 {
            return self.split_equal(axis, range);
        }

        let n_buckets = self.config.buckets;
        let mut buckets = vec![Bucket::default(); n_buckets];
        for prim in &self.cached[range.clone()] {
            let b = bucket_index(centroid_bounds, prim.center, axis, n_buckets);
            buckets[b].count += 1;
            buckets[b].bounds = Bounds3::union(&buckets[b].bounds, &prim.bound);
        }

        // Cost of splitting after bucket i, accumulated from both ends
        let n_splits = n_buckets - 1;
        let mut costs = vec![0.0_f32; n_splits];

        let mut count_below = 0;
        let mut bound_below = Bounds3::EMPTY;
        for i in 0..n_splits {
            bound_below = Bounds3::union(&bound_below, &buckets[i].bounds);
            count_below += buckets[i].count;
            costs[i] += count_below as f32 * bound_below.surface_area();
        }

        let mut count_above = 0;
        let mut bound_above = Bounds3::EMPTY;
        for i in (1..=n_splits).rev() {
            bound_above = Bounds3::union(&bound_above, &buckets[i].bounds);
            count_above += buckets[i].count;
            costs[i - 1] += count_above as f32 * bound_above.surface_area();
        }

        let mut min_cost_split_bucket = 0;
        let mut min_cost = f32::INFINITY;
        for (i, &cost) in costs.iter().enumerate() {
            if cost < min_cost {
                min_cost = cost;
                min_cost_split_bucket = i;
            }
        }

        let leaf_cost = count as f32;
        let min_cost = 0.5 + min_cost / bounds.surface_area();

        if count > self.config.primitives_per_node || min_cost < leaf_cost {
            let offset = partition(&mut self.cached[range.clone()], |p| {
                bucket_index(centroid_bounds, p.center, axis, n_buckets) <= min_cost_split_bucket
            });
            let mid = range.start + offset;
            if mid == range.start || mid == range.end {
                log::trace!("SAH produced an empty side for {:?}, splitting by count", range);
                return self.split_equal(axis, range);
            }
            Split::Range {
                start: range.start,
                mid,
                end: range.end,
            }
        } else {
            self.add_leaf(counter, *bounds, range, depth);
            Split::Leaf(*bounds)
        }
    }
}

/// Bucket of `center` along `axis`; the far edge of the centroid bound maps to the last bucket.
#[inline]
fn bucket_index(centroid_bounds: &Bounds3, center: Vec3, axis: usize, n_buckets: usize) -> usize {
    let b = (n_buckets as f32 * centroid_bounds.offset(center)[axis]) as usize;
    b.min(n_buckets - 1)
}

/// Move every element matching `pred` to the front; returns how many matched.
fn partition<T>(items: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut first = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(first, i);
            first += 1;
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn unit_cube_at(center: Vec3) -> Bounds3 {
        Bounds3::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
    }

    fn random_boxes(rng: &mut StdRng, n: usize) -> Vec<Bounds3> {
        (0..n)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                );
                let half = Vec3::new(
                    rng.gen_range(0.01..3.0),
                    rng.gen_range(0.01..3.0),
                    rng.gen_range(0.01..3.0),
                );
                Bounds3::new(center - half, center + half)
            })
            .collect()
    }

    /// Walks the subtree at `index`, checks tight bounds and child layout, and
    /// returns (bounds, index one past the subtree).
    fn check_subtree(out: &BuildOutput, prims: &[Bounds3], index: usize, leaves: &mut Vec<Range<usize>>) -> (Bounds3, usize) {
        let node = out.nodes[index];
        if node.is_leaf() {
            let union = node
                .primitive_range()
                .map(|slot| prims[out.permutation[slot]])
                .fold(Bounds3::EMPTY, |acc, b| Bounds3::union(&acc, &b));
            assert_eq!(node.bounds, union, "leaf {} bounds are not tight", index);
            leaves.push(node.primitive_range());
            return (node.bounds, index + 1);
        }

        let (left, after_left) = check_subtree(out, prims, index + 1, leaves);
        assert_eq!(after_left, node.second_child(), "right child must follow the left subtree");
        let (right, after_right) = check_subtree(out, prims, node.second_child(), leaves);
        assert_eq!(node.bounds, Bounds3::union(&left, &right), "interior {} bounds are not tight", index);
        assert!(node.bounds.contains_bounds(&left) && node.bounds.contains_bounds(&right));
        (node.bounds, after_right)
    }

    fn check_tree(out: &BuildOutput, prims: &[Bounds3]) -> Vec<Range<usize>> {
        let mut leaves = Vec::new();
        if prims.is_empty() {
            assert!(out.nodes.is_empty());
            return leaves;
        }
        let (_, end) = check_subtree(out, prims, 0, &mut leaves);
        assert_eq!(end, out.nodes.len(), "every node must be reachable from the root");
        leaves
    }

    fn assert_permutation(out: &BuildOutput, n: usize) {
        let mut seen = vec![false; n];
        for &index in &out.permutation {
            assert!(!seen[index], "primitive {} appears twice", index);
            seen[index] = true;
        }
        assert_eq!(out.permutation.len(), n);
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_empty_scene_has_no_nodes() {
        let out = build::<Bounds3>(&[], &BvhConfig::default());
        assert!(out.nodes.is_empty());
        assert!(out.permutation.is_empty());
        assert_eq!(out.stats, BuildStats::default());
    }

    #[test]
    fn test_three_cubes_single_leaf() {
        let prims = vec![
            unit_cube_at(Vec3::ZERO),
            unit_cube_at(Vec3::new(10.0, 0.0, 0.0)),
            unit_cube_at(Vec3::new(20.0, 0.0, 0.0)),
        ];
        let out = build(&prims, &BvhConfig::default());

        assert_eq!(out.nodes.len(), 1);
        let root = out.nodes[0];
        assert!(root.is_leaf());
        assert_eq!(root.count, 3);
        assert_eq!(root.offset, 0);
        assert_eq!(root.bounds.p_min, Vec3::splat(-0.5));
        assert_eq!(root.bounds.p_max, Vec3::new(20.5, 0.5, 0.5));
        assert_eq!(out.permutation, vec![0, 1, 2]);
    }

    #[test]
    fn test_random_scenes_are_complete_and_tight() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for n in [1, 2, 3, 4, 5, 7, 16, 63, 200, 1000] {
            let prims = random_boxes(&mut rng, n);
            let out = build(&prims, &BvhConfig::default());

            assert_permutation(&out, n);
            let leaves = check_tree(&out, &prims);

            // Leaf ranges tile the primitive array in order
            let mut next = 0;
            for range in &leaves {
                assert_eq!(range.start, next);
                assert!(!range.is_empty(), "leaf with no primitives");
                next = range.end;
            }
            assert_eq!(next, n);

            let root_union = prims.iter().fold(Bounds3::EMPTY, |acc, b| Bounds3::union(&acc, b));
            assert_eq!(out.nodes[0].bounds, root_union);
        }
    }

    #[test]
    fn test_leaf_size_bound_for_distinct_centroids() {
        let mut rng = StdRng::seed_from_u64(7);
        let prims = random_boxes(&mut rng, 500);
        let config = BvhConfig::default();
        let out = build(&prims, &config);

        for node in out.nodes.iter().filter(|n| n.is_leaf()) {
            // The SAH may keep a range of exactly the threshold whole, never more
            assert!(node.count > 0);
            assert!(node.count <= config.primitives_per_node, "leaf of {} primitives", node.count);
        }
    }

    #[test]
    fn test_stats_match_tree() {
        init_logger();
        let mut rng = StdRng::seed_from_u64(11);
        let prims = random_boxes(&mut rng, 300);
        let out = build(&prims, &BvhConfig::default());

        let leaves = out.nodes.iter().filter(|n| n.is_leaf()).count();
        assert_eq!(out.stats.leaf_nodes, leaves);
        assert_eq!(out.stats.interior_nodes, out.nodes.len() - leaves);
        assert_eq!(out.stats.total_nodes(), out.nodes.len());
        assert_eq!(out.stats.leaf_primitives, 300);
        // A binary tree has one fewer interior node than leaves
        assert_eq!(out.stats.interior_nodes + 1, out.stats.leaf_nodes);
        assert!(out.stats.primitives_per_leaf() > 1.0);
        assert!(out.stats.to_string().contains("Leaf nodes"));
    }

    #[test]
    fn test_coincident_centroids_make_one_leaf() {
        let prims = vec![unit_cube_at(Vec3::new(1.0, 2.0, 3.0)); 100];
        let out = build(&prims, &BvhConfig::default());

        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].count, 100);
        assert_permutation(&out, 100);
    }

    #[test]
    fn test_two_clusters_of_coincident_centroids() {
        let mut prims = vec![unit_cube_at(Vec3::ZERO); 50];
        prims.extend(vec![unit_cube_at(Vec3::new(10.0, 0.0, 0.0)); 50]);
        let out = build(&prims, &BvhConfig::default());

        assert_permutation(&out, 100);
        let leaves = check_tree(&out, &prims);
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|r| r.len() == 50));

        let root = out.nodes[0];
        assert!(!root.is_leaf());
        assert_eq!(root.axis, 0);
        assert_eq!(root.second_child(), 2);
    }

    #[test]
    fn test_stacked_duplicates_still_progress() {
        // Many primitives share one centroid while a few are spread out; the
        // builder must keep shrinking ranges and never emit an empty child
        let mut rng = StdRng::seed_from_u64(3);
        let mut prims = vec![unit_cube_at(Vec3::ZERO); 40];
        prims.extend(random_boxes(&mut rng, 40));
        let out = build(&prims, &BvhConfig::default());

        assert_permutation(&out, 80);
        check_tree(&out, &prims);
    }

    #[test]
    fn test_small_threshold_uses_equal_split() {
        let config = BvhConfig {
            primitives_per_node: 1,
            ..Default::default()
        };
        let prims = vec![unit_cube_at(Vec3::new(5.0, 0.0, 0.0)), unit_cube_at(Vec3::ZERO)];
        let out = build(&prims, &config);

        assert_eq!(out.nodes.len(), 3);
        assert!(!out.nodes[0].is_leaf());
        // Sorted along x: the cube at the origin ends up first
        assert_eq!(out.permutation, vec![1, 0]);
        assert_eq!(out.nodes[1].count, 1);
        assert_eq!(out.nodes[2].count, 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(99);
        let prims = random_boxes(&mut rng, 250);
        let a = build(&prims, &BvhConfig::default());
        let b = build(&prims, &BvhConfig::default());

        assert_eq!(a.permutation, b.permutation);
        assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn test_sah_keeps_threshold_range_as_leaf() {
        init_logger();
        // Heavily overlapping boxes: any split costs more than testing all four
        let prims: Vec<Bounds3> = [0.0, 0.1, 0.2, 0.3]
            .iter()
            .map(|&x| Bounds3::new(Vec3::new(x - 5.0, -5.0, -5.0), Vec3::new(x + 5.0, 5.0, 5.0)))
            .collect();
        let out = build(&prims, &BvhConfig::default());

        assert_eq!(out.nodes.len(), 1);
        let root = out.nodes[0];
        assert!(root.is_leaf());
        assert_eq!(root.count, 4);
        assert_eq!(root.bounds, Bounds3::new(Vec3::splat(-5.0), Vec3::new(0.3 + 5.0, 5.0, 5.0)));
        assert_eq!(out.stats.interior_nodes, 0);
        assert_eq!(out.stats.leaf_nodes, 1);
        assert_eq!(out.stats.max_leaf_size, 4);
        assert_permutation(&out, 4);
    }

    #[test]
    fn test_single_bucket_falls_back_to_equal_split() {
        init_logger();
        // One bucket puts every primitive on the same side of the only cut
        let config = BvhConfig {
            buckets: 1,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(13);
        let prims = random_boxes(&mut rng, 10);
        let out = build(&prims, &config);

        assert_permutation(&out, 10);
        let leaves = check_tree(&out, &prims);
        assert!(out.stats.interior_nodes > 0);
        for range in &leaves {
            assert!(!range.is_empty());
            assert!(range.len() < config.primitives_per_node);
        }
        // Equal splits of 10: 5 + 5, then 2 + 3 on each side
        assert_eq!(leaves.len(), 4);
    }

    #[test]
    #[should_panic(expected = "buckets must be at least 1")]
    fn test_zero_buckets_rejected() {
        let prims = vec![unit_cube_at(Vec3::ZERO); 10];
        build(
            &prims,
            &BvhConfig {
                primitives_per_node: 4,
                buckets: 0,
            },
        );
    }

    #[test]
    #[should_panic(expected = "primitives_per_node must be at least 1")]
    fn test_zero_leaf_threshold_rejected() {
        let config = BvhConfig {
            primitives_per_node: 0,
            ..Default::default()
        };
        BoundingHierarchyBuilder::new(&[unit_cube_at(Vec3::ZERO)], config);
    }

    #[test]
    fn test_bucket_index_clamps_to_last_bucket() {
        let centroid_bounds = Bounds3::new(Vec3::ZERO, Vec3::new(12.0, 1.0, 1.0));
        assert_eq!(bucket_index(&centroid_bounds, Vec3::ZERO, 0, 12), 0);
        assert_eq!(bucket_index(&centroid_bounds, Vec3::new(5.5, 0.0, 0.0), 0, 12), 5);
        assert_eq!(bucket_index(&centroid_bounds, Vec3::new(12.0, 0.0, 0.0), 0, 12), 11);
    }

    #[test]
    fn test_partition_moves_matches_to_front() {
        let mut values = vec![5, 1, 8, 2, 9, 3];
        let mid = partition(&mut values, |&v| v < 4);
        assert_eq!(mid, 3);
        assert!(values[..mid].iter().all(|&v| v < 4));
        assert!(values[mid..].iter().all(|&v| v >= 4));
    }
}
