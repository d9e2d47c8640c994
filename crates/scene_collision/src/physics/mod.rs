//! Collision physics
//!
//! Collider construction from scene meshes, the collider registry, proximity
//! filtering and sphere-vs-mesh projectile resolution.

pub mod collider;
pub mod collider_registry;
pub mod collision;
pub mod door_config;
pub mod error;
pub mod projectile;
pub mod proximity;
pub mod simulation;
pub mod sphere_resolver;

pub use collider::{
    Collider,
    ColliderBuilder,
    ColliderCategory,
    ColliderFactory,
    ColliderPiece,
    ConstructionStrategy,
    DebugDisplay,
    ObjectSpec,
};
pub use collider_registry::{BuildReport, ColliderRegistry};
pub use collision::{
    BoundingSphere,
    Bvh,
    BvhRayHit,
    ClosestPoint,
    MeshAggregator,
    Ray,
    Triangle,
    TriangleMesh,
};
pub use door_config::{DoorConfiguration, DoorEntry, DoorKind, DoorState};
pub use error::{CollisionError, CollisionResult};
pub use projectile::{Projectile, ProjectileKind};
pub use proximity::{ProximityFilter, WorkingSet};
pub use simulation::{ProjectileEvent, ProjectileId, ProjectileSimulation};
pub use sphere_resolver::{CollisionEvent, SphereCollisionResolver, StepOutcome, StepResult};
