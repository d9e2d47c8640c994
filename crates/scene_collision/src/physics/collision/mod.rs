//! Collision geometry: primitives, aggregated meshes and the triangle BVH

pub mod bvh;
pub mod mesh;
pub mod primitives;

pub use bvh::{Bvh, BvhRayHit, ClosestPoint};
pub use mesh::{MeshAggregator, TriangleMesh};
pub use primitives::{BoundingSphere, Ray, Triangle};
