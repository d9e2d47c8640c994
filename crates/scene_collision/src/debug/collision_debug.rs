//! Collider debug visualization
//!
//! Turns a collider's [`DebugDisplay`] flags into persistent shape groups:
//! triangle edges for the collider itself and node boxes for one BVH level.

use crate::debug::draw::{DebugDrawSystem, DebugShape};
use crate::foundation::math::{Vec3, Vec4};
use crate::physics::{Collider, DebugDisplay};

/// Color scheme for collider visualization
#[derive(Clone, Debug)]
pub struct ColliderDebugColors {
    /// Triangle wireframe
    pub wireframe: Vec4,
    /// BVH node boxes
    pub bvh: Vec4,
    /// Contact markers
    pub impact: Vec4,
}

impl Default for ColliderDebugColors {
    fn default() -> Self {
        Self {
            wireframe: Vec4::new(0.0, 1.0, 0.0, 0.3), // Green, semi-transparent
            bvh: Vec4::new(0.5, 0.8, 1.0, 0.15),      // Light blue, transparent
            impact: Vec4::new(1.0, 0.0, 0.0, 0.5),    // Red, semi-transparent
        }
    }
}

/// Collider-specific debug visualizer
pub struct ColliderDebugVisualizer {
    debug_draw: DebugDrawSystem,
    colors: ColliderDebugColors,
    visualize_depth: u32,
}

impl ColliderDebugVisualizer {
    /// Visualizer drawing BVH nodes at `visualize_depth`
    pub fn new(visualize_depth: u32) -> Self {
        Self {
            debug_draw: DebugDrawSystem::new(),
            colors: ColliderDebugColors::default(),
            visualize_depth,
        }
    }

    /// Set custom color scheme
    pub fn with_colors(mut self, colors: ColliderDebugColors) -> Self {
        self.colors = colors;
        self
    }

    /// BVH level currently drawn
    pub fn visualize_depth(&self) -> u32 {
        self.visualize_depth
    }

    /// Change the BVH level; takes effect on the next [`Self::draw_collider`]
    pub fn set_visualize_depth(&mut self, depth: u32) {
        self.visualize_depth = depth;
    }

    /// Regenerate the shape group of `collider` from its flags
    pub fn draw_collider(&mut self, collider: &Collider) {
        self.debug_draw.clear_persistent(&collider.id);
        if collider.debug.is_empty() {
            return;
        }

        let mut shapes = Vec::new();
        if collider.debug.contains(DebugDisplay::COLLIDER) {
            for tri in collider.bvh.triangles() {
                for (start, end) in [(tri.v0, tri.v1), (tri.v1, tri.v2), (tri.v2, tri.v0)] {
                    shapes.push(DebugShape::Line {
                        start,
                        end,
                        color: self.colors.wireframe,
                        duration: f32::INFINITY,
                    });
                }
            }
        }
        if collider.debug.contains(DebugDisplay::BVH) {
            shapes.extend(
                collider
                    .bvh
                    .nodes_at_depth(self.visualize_depth)
                    .iter()
                    .map(|aabb| DebugShape::from_aabb(aabb, self.colors.bvh, f32::INFINITY)),
            );
        }

        log::trace!("Debug shapes for '{}': {}", collider.id, shapes.len());
        self.debug_draw.draw_persistent(collider.id.clone(), shapes);
    }

    /// Drop the shape group of a collider
    pub fn clear_collider(&mut self, id: &str) -> bool {
        self.debug_draw.clear_persistent(id)
    }

    /// Short-lived marker at a contact point
    pub fn draw_impact(&mut self, position: Vec3, normal: Vec3, duration: f32) {
        self.debug_draw.draw_point(position, self.colors.impact, 6.0, duration);
        self.debug_draw.draw_line(position, position + normal, self.colors.impact, duration);
    }

    /// Clear all visualization
    pub fn clear(&mut self) {
        self.debug_draw.clear();
    }

    /// Update debug system (expire temporary shapes)
    pub fn update(&mut self, delta_time: f32) {
        self.debug_draw.update(delta_time);
    }

    /// Get all debug shapes for rendering
    pub fn get_shapes(&self) -> Vec<&DebugShape> {
        self.debug_draw.get_shapes()
    }

    /// Get reference to underlying debug draw system
    pub fn debug_draw(&self) -> &DebugDrawSystem {
        &self.debug_draw
    }
}

impl Default for ColliderDebugVisualizer {
    fn default() -> Self {
        Self::new(10)
    }
}
