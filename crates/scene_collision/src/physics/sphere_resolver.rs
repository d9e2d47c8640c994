//! Sphere-vs-mesh projectile resolver
//!
//! Advances one projectile by one step and resolves penetration against the
//! colliders of its working set. Colliders are tested in registry order and
//! the first one that produces contact wins; the rest are not examined that
//! step.

use crate::config::ResolverConfig;
use crate::foundation::math::{reflect, Vec3};
use crate::scene::{Frustum, NodeKey};
use super::collider::Collider;
use super::collider_registry::ColliderRegistry;
use super::collision::BoundingSphere;
use super::projectile::Projectile;
use super::proximity::WorkingSet;

// Rounding headroom, in units of f32 epsilon per unit of coordinate magnitude
const ROUNDING_ULPS: f32 = 64.0;

/// Contact reported to gameplay code
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// Collider that was hit
    pub collider_id: String,
    /// Scene object owning that collider
    pub owner: Option<NodeKey>,
    /// Push-out direction, `None` when the push was too small to define one
    pub normal: Option<Vec3>,
    /// Sphere center after resolution
    pub position: Vec3,
}

/// What happened to a projectile during one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Moved without contact
    Moving,
    /// Moved but outside the view frustum, so no contact test ran
    Culled,
    /// Hit something and bounced
    Collided(CollisionEvent),
    /// Hit something and must be removed
    Consumed(CollisionEvent),
    /// Fell below the world floor
    Expired,
}

impl StepOutcome {
    /// The contact, if any
    pub fn event(&self) -> Option<&CollisionEvent> {
        match self {
            StepOutcome::Collided(event) | StepOutcome::Consumed(event) => Some(event),
            _ => None,
        }
    }

    /// Whether the projectile should leave the simulation
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::Consumed(_) | StepOutcome::Expired)
    }
}

/// Result of [`SphereCollisionResolver::step`]
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Projectile state after the step
    pub projectile: Projectile,
    /// What happened
    pub outcome: StepOutcome,
}

/// Integrates projectiles and resolves sphere-vs-triangle contact
#[derive(Debug, Clone, Default)]
pub struct SphereCollisionResolver {
    config: ResolverConfig,
}

impl SphereCollisionResolver {
    /// Resolver with the given response parameters
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Response parameters in use
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Advance `projectile` by `dt` seconds under `gravity`
    ///
    /// When `frustum` is given and the sphere is outside it, the projectile
    /// still moves but no contact test runs.
    pub fn step(
        &self,
        mut projectile: Projectile,
        working_set: &WorkingSet,
        registry: &ColliderRegistry,
        dt: f32,
        gravity: f32,
        frustum: Option<&Frustum>,
    ) -> StepResult {
        projectile.velocity.y += gravity * dt;
        projectile.position += projectile.velocity * dt;

        if projectile.position.y < self.config.world_floor {
            log::debug!("Projectile expired below world floor at {:?}", projectile.position);
            return StepResult { projectile, outcome: StepOutcome::Expired };
        }

        if let Some(frustum) = frustum {
            if !frustum.intersects_sphere(projectile.position, projectile.radius) {
                return StepResult { projectile, outcome: StepOutcome::Culled };
            }
        }

        for (id, collider) in registry.iter() {
            if !working_set.contains(id) || !collider.blocks_projectiles() {
                continue;
            }
            if !collider.bounds.intersects_sphere(projectile.position, projectile.radius) {
                continue;
            }

            let Some(resolved) = self.push_out(&projectile, collider) else {
                continue;
            };

            let push = resolved - projectile.position;
            let normal = push.try_normalize(self.tolerance(projectile.position.amax()));
            projectile.position = resolved;
            if let Some(normal) = normal {
                self.respond(&mut projectile.velocity, &normal, dt);
            }

            let event = CollisionEvent {
                collider_id: id.to_string(),
                owner: registry.owner(id),
                normal,
                position: projectile.position,
            };
            log::trace!("Projectile hit '{}' at {:?}", id, event.position);

            let outcome = if projectile.kind.is_consumable() {
                log::debug!("Projectile consumed on '{}'", id);
                StepOutcome::Consumed(event)
            } else {
                StepOutcome::Collided(event)
            };
            return StepResult { projectile, outcome };
        }

        StepResult { projectile, outcome: StepOutcome::Moving }
    }

    /// Resolved sphere center after pushing out of every penetrating triangle
    fn push_out(&self, projectile: &Projectile, collider: &Collider) -> Option<Vec3> {
        let radius = projectile.radius;
        let mut center = projectile.position;
        let mut hit = false;

        collider.bvh.shapecast_sphere(&BoundingSphere::new(center, radius), |_, tri| {
            let closest = tri.closest_point(center);
            let delta = center - closest;
            let distance = delta.magnitude();
            let scale = tri.v0.amax().max(tri.v1.amax()).max(tri.v2.amax()).max(center.amax());
            // A center lying on the surface has no push direction
            if distance < radius && distance > self.tolerance(scale) {
                center = closest + delta * (radius / distance);
                hit = true;
            }
            false
        });

        hit.then_some(center)
    }

    /// Smallest length treated as non-zero for coordinates of magnitude `scale`
    ///
    /// Closest-point queries lose precision in proportion to coordinate size,
    /// so the configured epsilon is only a floor.
    fn tolerance(&self, scale: f32) -> f32 {
        self.config.contact_epsilon.max(scale * f32::EPSILON * ROUNDING_ULPS)
    }

    /// Reflect, damp the normal component, then scale by `max(1 - dt, 0)`
    fn respond(&self, velocity: &mut Vec3, normal: &Vec3, dt: f32) {
        let mut v = reflect(velocity, normal);
        let along = v.dot(normal);
        v += normal * (-along * self.config.normal_damping);
        *velocity = v * (1.0 - dt).max(0.0);
    }
}
