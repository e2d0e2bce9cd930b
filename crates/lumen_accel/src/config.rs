//! Accelerator configuration.

use crate::{AccelError, Result};
use serde::{Deserialize, Serialize};

/// Primitives below which a node always becomes a leaf.
pub const DEFAULT_PRIMITIVES_PER_NODE: usize = 4;

/// Number of SAH buckets along the split axis.
pub const DEFAULT_BUCKETS: usize = 12;

/// BVH build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Ranges with fewer primitives than this become leaves without evaluating a split
    pub primitives_per_node: usize,
    /// Equal-width buckets used by the surface-area heuristic. With a single
    /// bucket no SAH split exists and ranges are split by count.
    pub buckets: usize,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            primitives_per_node: DEFAULT_PRIMITIVES_PER_NODE,
            buckets: DEFAULT_BUCKETS,
        }
    }
}

impl BvhConfig {
    pub fn validate(&self) -> Result<()> {
        if self.primitives_per_node == 0 {
            return Err(AccelError::InvalidConfig(
                "primitives_per_node must be at least 1".to_string(),
            ));
        }
        if self.buckets == 0 {
            return Err(AccelError::InvalidConfig(format!(
                "buckets must be at least 1, got {}",
                self.buckets
            )));
        }
        Ok(())
    }
}

/// Which backend an [`crate::Accelerator`] is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorKind {
    /// Software SAH bounding volume hierarchy
    #[default]
    BoundingHierarchy,
    /// Intel Embree (requires the `embree` feature)
    Embree,
}

impl AcceleratorKind {
    pub fn name(&self) -> &'static str {
        match self {
            AcceleratorKind::BoundingHierarchy => "bounding_hierarchy",
            AcceleratorKind::Embree => "embree",
        }
    }
}

/// Accelerator selection plus backend parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    pub backend: AcceleratorKind,
    pub bvh: BvhConfig,
}

impl AcceleratorConfig {
    pub fn validate(&self) -> Result<()> {
        self.bvh.validate()
    }
}
