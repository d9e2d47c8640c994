//! Debug drawing primitives and system
//!
//! Shapes are plain data handed to whatever renderer sits above the collision
//! core. Temporary shapes expire after their duration; persistent shapes are
//! grouped under a key (one group per collider) and stay until cleared.

use crate::foundation::math::{Vec3, Vec4};
use crate::scene::AABB;
use std::collections::HashMap;

/// Key of a persistent shape group
pub type DebugShapeId = String;

/// Debug shape primitives that can be rendered for visualization
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Line segment from start to end
    Line {
        /// Segment start
        start: Vec3,
        /// Segment end
        end: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },

    /// Wireframe sphere
    Sphere {
        /// Sphere center
        center: Vec3,
        /// Sphere radius
        radius: f32,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },

    /// Axis-aligned wireframe box
    Box {
        /// Box center
        center: Vec3,
        /// Half-size along each axis
        extents: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },

    /// Point marker
    Point {
        /// Marker position
        position: Vec3,
        /// RGBA color
        color: Vec4,
        /// Marker size in pixels
        size: f32,
        /// Remaining lifetime in seconds
        duration: f32,
    },
}

impl DebugShape {
    /// Box shape covering `aabb`
    pub fn from_aabb(aabb: &AABB, color: Vec4, duration: f32) -> Self {
        DebugShape::Box {
            center: aabb.center(),
            extents: aabb.extents(),
            color,
            duration,
        }
    }

    /// Get remaining duration
    pub fn duration(&self) -> f32 {
        match self {
            DebugShape::Line { duration, .. }
            | DebugShape::Sphere { duration, .. }
            | DebugShape::Box { duration, .. }
            | DebugShape::Point { duration, .. } => *duration,
        }
    }

    /// Decrease duration by delta_time, returns true if expired
    pub fn tick(&mut self, delta_time: f32) -> bool {
        match self {
            DebugShape::Line { duration, .. }
            | DebugShape::Sphere { duration, .. }
            | DebugShape::Box { duration, .. }
            | DebugShape::Point { duration, .. } => {
                *duration -= delta_time;
                *duration <= 0.0
            }
        }
    }
}

/// Debug drawing system for rendering debug shapes
pub struct DebugDrawSystem {
    /// Temporary shapes that expire after their duration
    temporary_shapes: Vec<DebugShape>,

    /// Persistent shape groups that remain until manually removed
    persistent_shapes: HashMap<DebugShapeId, Vec<DebugShape>>,

    /// Master enable/disable flag
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Create a new debug draw system
    pub fn new() -> Self {
        Self {
            temporary_shapes: Vec::new(),
            persistent_shapes: HashMap::new(),
            enabled: true,
        }
    }

    /// Draw a line segment (temporary)
    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Line {
            start,
            end,
            color,
            duration,
        });
    }

    /// Draw a sphere (temporary)
    pub fn draw_sphere(&mut self, center: Vec3, radius: f32, color: Vec4, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Sphere {
            center,
            radius,
            color,
            duration,
        });
    }

    /// Draw a point (temporary)
    pub fn draw_point(&mut self, position: Vec3, color: Vec4, size: f32, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Point {
            position,
            color,
            size,
            duration,
        });
    }

    /// Replace the persistent group stored under `id`
    pub fn draw_persistent(&mut self, id: impl Into<String>, shapes: Vec<DebugShape>) {
        if !self.enabled {
            return;
        }

        self.persistent_shapes.insert(id.into(), shapes);
    }

    /// Persistent group stored under `id`
    pub fn persistent(&self, id: &str) -> Option<&[DebugShape]> {
        self.persistent_shapes.get(id).map(Vec::as_slice)
    }

    /// Remove a persistent group, returns whether it existed
    pub fn clear_persistent(&mut self, id: &str) -> bool {
        self.persistent_shapes.remove(id).is_some()
    }

    /// Update shape lifetimes and remove expired temporary shapes
    pub fn update(&mut self, delta_time: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.retain_mut(|shape| !shape.tick(delta_time));
    }

    /// Get all shapes for rendering (both temporary and persistent)
    pub fn get_shapes(&self) -> Vec<&DebugShape> {
        if !self.enabled {
            return Vec::new();
        }

        self.temporary_shapes
            .iter()
            .chain(self.persistent_shapes.values().flatten())
            .collect()
    }

    /// Get the number of active shapes
    pub fn shape_count(&self) -> usize {
        self.temporary_shapes.len() + self.persistent_shapes.values().map(Vec::len).sum::<usize>()
    }

    /// Clear all shapes (temporary and persistent)
    pub fn clear(&mut self) {
        self.temporary_shapes.clear();
        self.persistent_shapes.clear();
    }
}

impl Default for DebugDrawSystem {
    fn default() -> Self {
        Self::new()
    }
}
