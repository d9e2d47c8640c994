//! # Scene Collision
//!
//! Spatial collision for 3D scenes built from arbitrary triangle meshes.
//!
//! ## Features
//!
//! - **Mesh aggregation**: merge every mesh under a scene node into one world-space soup
//! - **BVH colliders**: per-object bounding volume hierarchies (center split or binned SAH)
//! - **Collider registry**: keyed, insertion-ordered store with owner lookup and debug shapes
//! - **Proximity filtering**: per-entity working sets with enter/exit hysteresis
//! - **Projectile resolution**: sphere-vs-mesh push-out with reflection and damping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scene_collision::prelude::*;
//!
//! let config = CollisionConfig::default();
//! let mut graph = SceneGraph::new();
//! let ground = graph.add_root("ground", &Transform::identity());
//! graph.add_mesh(
//!     ground,
//!     "grass",
//!     &Transform::identity(),
//!     Arc::new(MeshGeometry::new(
//!         vec![-50.0, 0.0, -50.0, -50.0, 0.0, 50.0, 50.0, 0.0, 50.0],
//!         vec![0, 1, 2],
//!     )),
//! );
//!
//! let doors = DoorConfiguration::default();
//! let factory = ColliderFactory::new(&config.bvh, &config.trees, &doors);
//! let mut registry = ColliderRegistry::with_debug_config(&config.debug);
//! registry.build_object(&factory, &graph, &ObjectSpec::new("ground", ground, ConstructionStrategy::Terrain));
//!
//! let mut sim = ProjectileSimulation::new(&config);
//! sim.launch(Vec3::new(0.0, 20.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 5.0, 1.0, ProjectileKind::Ball);
//! for event in sim.step(&registry, 1.0 / 60.0, None) {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

pub mod config;
pub mod debug;
pub mod foundation;
pub mod physics;
pub mod scene;

/// Common imports for collision users
pub mod prelude {
    pub use crate::{
        config::{Config, CollisionConfig, ConfigError},
        debug::{ColliderDebugVisualizer, DebugDrawSystem, DebugShape},
        foundation::math::{Mat4, Transform, Vec3},
        physics::{
            Collider, ColliderBuilder, ColliderCategory, ColliderFactory, ColliderRegistry,
            CollisionError, CollisionEvent, ConstructionStrategy, DebugDisplay, DoorConfiguration,
            DoorKind, MeshAggregator, ObjectSpec, Projectile, ProjectileEvent, ProjectileKind,
            ProjectileSimulation, ProximityFilter, SphereCollisionResolver, StepOutcome,
            TriangleMesh, WorkingSet,
        },
        scene::{AABB, Frustum, MeshGeometry, ModelTemplateCache, NodeKey, SceneGraph},
    };
}
