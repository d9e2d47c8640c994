//! Debug visualization of colliders and contacts

pub mod collision_debug;
pub mod draw;

pub use collision_debug::{ColliderDebugColors, ColliderDebugVisualizer};
pub use draw::{DebugDrawSystem, DebugShape, DebugShapeId};
