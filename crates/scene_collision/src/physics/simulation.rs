//! Projectile simulation
//!
//! Owns every live projectile together with its private working set and steps
//! them once per frame: refresh the working set, resolve, then drop the
//! projectiles that broke or left the world.

use slotmap::{new_key_type, SlotMap};

use crate::config::CollisionConfig;
use crate::foundation::math::Vec3;
use crate::scene::{Frustum, SceneGraph};
use super::collider_registry::ColliderRegistry;
use super::projectile::{Projectile, ProjectileKind};
use super::proximity::{ProximityFilter, WorkingSet};
use super::sphere_resolver::{CollisionEvent, SphereCollisionResolver, StepOutcome};

new_key_type! {
    /// Handle to a live projectile
    pub struct ProjectileId;
}

/// Something gameplay code should react to
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileEvent {
    /// A bouncing projectile hit a collider
    Hit {
        /// Projectile involved
        projectile: ProjectileId,
        /// Contact details
        collision: CollisionEvent,
    },
    /// A consumable projectile broke; spawn the break effect at `position`
    Broken {
        /// Projectile removed
        projectile: ProjectileId,
        /// Where the break effect goes
        position: Vec3,
        /// Contact details
        collision: CollisionEvent,
    },
    /// The projectile fell out of the world and was removed
    Expired {
        /// Projectile removed
        projectile: ProjectileId,
    },
}

struct LiveProjectile {
    projectile: Projectile,
    working_set: WorkingSet,
}

/// Steps projectiles against a collider registry
pub struct ProjectileSimulation {
    projectiles: SlotMap<ProjectileId, LiveProjectile>,
    filter: ProximityFilter,
    resolver: SphereCollisionResolver,
    gravity: f32,
}

impl ProjectileSimulation {
    /// Simulation using the proximity and resolver sections of `config`
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            projectiles: SlotMap::with_key(),
            filter: ProximityFilter::new(config.proximity),
            resolver: SphereCollisionResolver::new(config.resolver),
            gravity: config.resolver.gravity,
        }
    }

    /// Exempt extra colliders from proximity filtering; terrain is always exempt
    pub fn with_always_active<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.with_always_active(ids);
        self
    }

    /// Add a projectile fired along `direction`
    pub fn launch(
        &mut self,
        position: Vec3,
        direction: Vec3,
        speed: f32,
        radius: f32,
        kind: ProjectileKind,
    ) -> ProjectileId {
        self.spawn(Projectile::launch(position, direction, speed, radius, kind))
    }

    /// Add a fully specified projectile
    pub fn spawn(&mut self, projectile: Projectile) -> ProjectileId {
        self.projectiles.insert(LiveProjectile {
            projectile,
            working_set: WorkingSet::new(),
        })
    }

    /// Current state of a projectile
    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(id).map(|live| &live.projectile)
    }

    /// Working set a projectile used on its last step
    pub fn working_set(&self, id: ProjectileId) -> Option<&WorkingSet> {
        self.projectiles.get(id).map(|live| &live.working_set)
    }

    /// Number of live projectiles
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// True when nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Remove every projectile
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }

    /// Advance every projectile by `dt` seconds
    pub fn step(&mut self, registry: &ColliderRegistry, dt: f32, frustum: Option<&Frustum>) -> Vec<ProjectileEvent> {
        self.step_with(registry, None, dt, frustum)
    }

    /// [`Self::step`], reading live bounds of movable colliders from `graph`
    pub fn step_in_scene(
        &mut self,
        registry: &ColliderRegistry,
        graph: &SceneGraph,
        dt: f32,
        frustum: Option<&Frustum>,
    ) -> Vec<ProjectileEvent> {
        self.step_with(registry, Some(graph), dt, frustum)
    }

    fn step_with(
        &mut self,
        registry: &ColliderRegistry,
        graph: Option<&SceneGraph>,
        dt: f32,
        frustum: Option<&Frustum>,
    ) -> Vec<ProjectileEvent> {
        let mut events = Vec::new();
        let mut finished = Vec::new();

        for (id, live) in &mut self.projectiles {
            let position = live.projectile.position;
            let previous = std::mem::take(&mut live.working_set);
            live.working_set = match graph {
                Some(graph) => self.filter.filter_in_scene(position, registry, previous, graph),
                None => self.filter.filter(position, registry, previous),
            };

            let result = self.resolver.step(
                live.projectile.clone(),
                &live.working_set,
                registry,
                dt,
                self.gravity,
                frustum,
            );
            live.projectile = result.projectile;

            match result.outcome {
                StepOutcome::Moving | StepOutcome::Culled => {}
                StepOutcome::Collided(collision) => {
                    events.push(ProjectileEvent::Hit { projectile: id, collision });
                }
                StepOutcome::Consumed(collision) => {
                    events.push(ProjectileEvent::Broken {
                        projectile: id,
                        position: collision.position,
                        collision,
                    });
                    finished.push(id);
                }
                StepOutcome::Expired => {
                    events.push(ProjectileEvent::Expired { projectile: id });
                    finished.push(id);
                }
            }
        }

        for id in finished {
            self.projectiles.remove(id);
        }
        if !events.is_empty() {
            log::trace!("Projectile step: {} events, {} live", events.len(), self.projectiles.len());
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BvhConfig;
    use crate::physics::collider::{ColliderBuilder, ColliderCategory};
    use crate::physics::collision::TriangleMesh;
    use crate::scene::AABB;

    fn ground_registry() -> ColliderRegistry {
        let mesh = TriangleMesh::from_box(&AABB::new(
            Vec3::new(-100.0, -1.0, -100.0),
            Vec3::new(100.0, 0.0, 100.0),
        ));
        let collider = ColliderBuilder::new(&BvhConfig::default())
            .build("ground", ColliderCategory::StaticTerrain, &mesh)
            .unwrap()
            .unwrap();
        let mut registry = ColliderRegistry::new();
        registry.register(collider, None);
        registry
    }

    #[test]
    fn test_egg_breaks_and_is_removed() {
        let registry = ground_registry();
        let mut sim = ProjectileSimulation::new(&CollisionConfig::default());
        let egg = sim.launch(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 10.0, 1.0, ProjectileKind::Egg);

        let mut broken = None;
        for _ in 0..60 {
            for event in sim.step(&registry, 1.0 / 60.0, None) {
                if let ProjectileEvent::Broken { projectile, position, .. } = event {
                    broken = Some((projectile, position));
                }
            }
        }

        let (id, position) = broken.unwrap();
        assert_eq!(id, egg);
        assert!(position.y >= 1.0 - 1e-4);
        assert!(sim.projectile(egg).is_none());
        assert!(sim.is_empty());
    }

    #[test]
    fn test_projectiles_keep_separate_working_sets() {
        let mut registry = ground_registry();
        let shed = TriangleMesh::from_box(&AABB::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 10.0, 5.0)));
        let shed = ColliderBuilder::new(&BvhConfig::default())
            .build("shed", ColliderCategory::Generic, &shed)
            .unwrap()
            .unwrap();
        registry.register(shed, None);

        let mut sim = ProjectileSimulation::new(&CollisionConfig::default());
        let near = sim.launch(Vec3::new(0.0, 50.0, 0.0), Vec3::zeros(), 0.0, 1.0, ProjectileKind::Ball);
        let far = sim.launch(Vec3::new(0.0, 500.0, 0.0), Vec3::zeros(), 0.0, 1.0, ProjectileKind::Ball);

        sim.step(&registry, 0.01, None);

        let near_set = sim.working_set(near).unwrap();
        assert!(near_set.contains("ground") && near_set.contains("shed"));
        let far_set = sim.working_set(far).unwrap();
        assert_eq!(far_set.iter().collect::<Vec<_>>(), vec!["ground"]);
    }

    #[test]
    fn test_fall_without_colliders_expires() {
        let registry = ColliderRegistry::new();
        let mut sim = ProjectileSimulation::new(&CollisionConfig::default());
        let id = sim.launch(Vec3::zeros(), Vec3::zeros(), 0.0, 1.0, ProjectileKind::Ball);

        let mut expired = false;
        for _ in 0..600 {
            expired |= sim
                .step(&registry, 1.0 / 60.0, None)
                .iter()
                .any(|e| *e == ProjectileEvent::Expired { projectile: id });
        }
        assert!(expired);
        assert_eq!(sim.len(), 0);
    }
}
