//! Scene input model
//!
//! The collision core does not render or load assets; it reads finalized
//! geometry from a [`SceneGraph`] and uses the bounding primitives defined
//! here for its spatial queries.

mod scene_graph;
mod template_cache;

pub use scene_graph::{AABB, Frustum, MeshGeometry, NodeKey, Plane, SceneGraph, SceneNode};
pub use template_cache::{ModelTemplate, ModelTemplateCache, TemplatePart};
