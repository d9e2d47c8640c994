//! Projectile state

use crate::foundation::math::Vec3;
use crate::scene::NodeKey;
use super::collision::BoundingSphere;

/// How a projectile reacts to its first contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProjectileKind {
    /// Bounces until it falls out of the world
    #[default]
    Ball,
    /// Breaks on first contact
    Egg,
}

impl ProjectileKind {
    /// Whether any collision ends the projectile
    pub fn is_consumable(self) -> bool {
        matches!(self, ProjectileKind::Egg)
    }
}

/// A sphere moving under gravity
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Sphere center
    pub position: Vec3,
    /// Velocity in units per second
    pub velocity: Vec3,
    /// Sphere radius
    pub radius: f32,
    /// Contact behaviour
    pub kind: ProjectileKind,
    /// Scene node that threw it, if any
    pub owner: Option<NodeKey>,
}

impl Projectile {
    /// Projectile with an explicit velocity
    pub fn new(position: Vec3, velocity: Vec3, radius: f32, kind: ProjectileKind) -> Self {
        Self {
            position,
            velocity,
            radius,
            kind,
            owner: None,
        }
    }

    /// Projectile fired along `direction` at `speed`
    ///
    /// A zero direction launches it at rest.
    pub fn launch(position: Vec3, direction: Vec3, speed: f32, radius: f32, kind: ProjectileKind) -> Self {
        let velocity = direction
            .try_normalize(f32::EPSILON)
            .map_or_else(Vec3::zeros, |dir| dir * speed);
        Self::new(position, velocity, radius, kind)
    }

    /// Record who threw it
    pub fn with_owner(mut self, owner: NodeKey) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Current bounding sphere
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_launch_scales_direction() {
        let ball = Projectile::launch(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0), 30.0, 1.0, ProjectileKind::Ball);
        assert_relative_eq!(ball.velocity, Vec3::new(0.0, 0.0, 30.0));

        let dropped = Projectile::launch(Vec3::zeros(), Vec3::zeros(), 30.0, 1.0, ProjectileKind::Egg);
        assert_eq!(dropped.velocity, Vec3::zeros());
        assert!(dropped.kind.is_consumable());
    }
}
