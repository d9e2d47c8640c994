//! # Collision Configuration
//!
//! Tunables for every stage of the collision pipeline: BVH construction,
//! proximity filtering, projectile resolution, synthetic tree colliders and
//! debug visualisation. All sections default to the values the scene was
//! authored against, so a config file only needs to list what it overrides.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// How the BVH builder partitions triangles at each internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SplitStrategy {
    /// Split at the midpoint of the centroid bounds along the longest axis
    #[default]
    Center,
    /// Binned surface-area heuristic
    Sah,
}

/// BVH construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Leaves stop splitting once they hold this many triangles or fewer
    pub max_leaf_triangles: usize,
    /// Hard recursion cap; nodes at this depth become leaves regardless of size
    pub max_depth: u32,
    /// Partitioning strategy
    pub strategy: SplitStrategy,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 10,
            max_depth: 40,
            strategy: SplitStrategy::Center,
        }
    }
}

/// Hysteresis thresholds for the proximity filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Colliders within this distance of the query point enter the working set
    pub enter_threshold: f32,
    /// Colliders farther than this leave the working set
    pub exit_threshold: f32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            enter_threshold: 100.0,
            exit_threshold: 150.0,
        }
    }
}

/// Projectile integration and collision response parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Vertical acceleration applied every step (negative is down)
    pub gravity: f32,
    /// Projectiles whose center drops below this height expire
    pub world_floor: f32,
    /// Fraction of the post-reflection normal velocity removed on contact
    pub normal_damping: f32,
    /// Distances and push vectors shorter than this are treated as zero
    pub contact_epsilon: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            gravity: -30.0,
            world_floor: -80.0,
            normal_damping: 0.5,
            contact_epsilon: 1e-6,
        }
    }
}

/// Dimensions of the synthetic box standing in for a tree's foliage
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeColliderConfig {
    /// Extent along X
    pub width: f32,
    /// Extent along Y, measured up from the placement point
    pub height: f32,
    /// Extent along Z
    pub depth: f32,
}

impl Default for TreeColliderConfig {
    fn default() -> Self {
        Self {
            width: 2.0,
            height: 10.0,
            depth: 2.0,
        }
    }
}

/// Debug visualisation toggles applied to every live collider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Draw collider triangles as wireframe
    pub display_collider: bool,
    /// Draw BVH node bounds
    pub display_bvh: bool,
    /// BVH depth whose nodes are drawn
    pub visualize_depth: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            display_collider: false,
            display_bvh: false,
            visualize_depth: 10,
        }
    }
}

/// Top-level configuration for the collision core
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CollisionConfig {
    /// BVH construction
    pub bvh: BvhConfig,
    /// Proximity filtering
    pub proximity: ProximityConfig,
    /// Projectile resolution
    pub resolver: ResolverConfig,
    /// Synthetic tree colliders
    pub trees: TreeColliderConfig,
    /// Debug visualisation
    pub debug: DebugConfig,
}

impl Config for CollisionConfig {}

impl CollisionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bvh.max_leaf_triangles == 0 {
            return Err(ConfigError::Invalid(
                "bvh.max_leaf_triangles must be at least 1".to_string(),
            ));
        }

        let proximity = &self.proximity;
        if !(proximity.enter_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "proximity.enter_threshold must be non-negative, got {}",
                proximity.enter_threshold
            )));
        }
        if proximity.exit_threshold < proximity.enter_threshold {
            return Err(ConfigError::Invalid(format!(
                "proximity.exit_threshold ({}) must not be below enter_threshold ({})",
                proximity.exit_threshold, proximity.enter_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.resolver.normal_damping) {
            return Err(ConfigError::Invalid(format!(
                "resolver.normal_damping must be within [0, 1], got {}",
                self.resolver.normal_damping
            )));
        }

        let trees = &self.trees;
        if trees.width <= 0.0 || trees.height <= 0.0 || trees.depth <= 0.0 {
            return Err(ConfigError::Invalid(
                "tree collider dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
