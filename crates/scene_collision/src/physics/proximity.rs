//! Proximity filter
//!
//! Maintains, per moving entity, the set of colliders worth testing. A
//! collider joins the set once the query point comes within the enter
//! threshold of its bounds and leaves only after the point is beyond the exit
//! threshold; in between, membership does not change. Static terrain and any
//! explicitly exempted ids skip the distance test. Each call consumes the
//! previous set and returns the next one, so the set is owned by exactly one
//! querying entity.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::config::ProximityConfig;
use crate::foundation::math::Vec3;
use crate::scene::{AABB, SceneGraph};
use super::collider::{Collider, ColliderCategory};
use super::collider_registry::ColliderRegistry;

/// Ids of the colliders currently in play for one entity, in registry order
pub type WorkingSet = IndexSet<String>;

/// Hysteresis filter over registry colliders
#[derive(Debug, Clone)]
pub struct ProximityFilter {
    config: ProximityConfig,
    always_active: HashSet<String>,
}

impl ProximityFilter {
    /// Filter with the given thresholds and no exempt colliders
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            config,
            always_active: HashSet::new(),
        }
    }

    /// Exempt `ids` from distance checks
    ///
    /// [`ColliderCategory::StaticTerrain`] colliders are exempt without being
    /// listed here.
    pub fn with_always_active<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_active.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Exempt one more id
    pub fn add_always_active(&mut self, id: impl Into<String>) {
        self.always_active.insert(id.into());
    }

    /// Whether `id` is exempt
    pub fn is_always_active(&self, id: &str) -> bool {
        self.always_active.contains(id)
    }

    /// Thresholds in use
    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    fn next_membership(&self, distance: f32, was_present: bool) -> bool {
        if distance <= self.config.enter_threshold {
            true
        } else if distance > self.config.exit_threshold {
            false
        } else {
            was_present
        }
    }

    /// Next working set using each collider's build-time bounds
    pub fn filter(&self, position: Vec3, registry: &ColliderRegistry, previous: WorkingSet) -> WorkingSet {
        self.filter_with(position, registry, previous, |_, collider| Some(collider.bounds))
    }

    /// Next working set with caller-supplied bounds
    ///
    /// Colliders for which `bounds_of` returns `None` are treated as absent.
    pub fn filter_with<F>(
        &self,
        position: Vec3,
        registry: &ColliderRegistry,
        previous: WorkingSet,
        mut bounds_of: F,
    ) -> WorkingSet
    where
        F: FnMut(&str, &Collider) -> Option<AABB>,
    {
        let mut next = WorkingSet::with_capacity(previous.len());

        for (id, collider) in registry.iter() {
            if collider.category == ColliderCategory::StaticTerrain || self.always_active.contains(id) {
                next.insert(id.to_string());
                continue;
            }
            let Some(bounds) = bounds_of(id, collider) else {
                continue;
            };
            let distance = bounds.distance_to_point(position);
            if self.next_membership(distance, previous.contains(id)) {
                next.insert(id.to_string());
            }
        }

        next
    }

    /// Next working set, reading live bounds of movable colliders from the scene
    pub fn filter_in_scene(
        &self,
        position: Vec3,
        registry: &ColliderRegistry,
        previous: WorkingSet,
        graph: &SceneGraph,
    ) -> WorkingSet {
        self.filter_with(position, registry, previous, |id, collider| {
            if !collider.movable {
                return Some(collider.bounds);
            }
            registry
                .owner(id)
                .and_then(|owner| graph.world_bounds(owner))
                .or(Some(collider.bounds))
        })
    }

    /// Same hysteresis rule applied to arbitrary keyed regions
    pub fn filter_regions<K>(&self, position: Vec3, regions: &[(K, AABB)], previous: IndexSet<K>) -> IndexSet<K>
    where
        K: Hash + Eq + Clone,
    {
        regions
            .iter()
            .filter(|(key, bounds)| {
                self.next_membership(bounds.distance_to_point(position), previous.contains(key))
            })
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BvhConfig;
    use crate::foundation::math::Transform;
    use crate::physics::collider::{ColliderBuilder, ColliderCategory};
    use crate::physics::collision::TriangleMesh;
    use crate::scene::MeshGeometry;
    use std::sync::Arc;

    fn unit_box(id: &str, category: ColliderCategory) -> Collider {
        let mesh = TriangleMesh::from_box(&AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)));
        ColliderBuilder::new(&BvhConfig::default())
            .build(id, category, &mesh)
            .unwrap()
            .unwrap()
    }

    /// Point `d` units from the unit box along +x
    fn at(d: f32) -> Vec3 {
        Vec3::new(1.0 + d, 0.5, 0.5)
    }

    #[test]
    fn test_hysteresis_band() {
        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("bench", ColliderCategory::Generic), None);
        let filter = ProximityFilter::default();

        let mut set = WorkingSet::new();
        let mut trace = Vec::new();
        for d in [200.0, 120.0, 80.0, 120.0, 149.0, 151.0, 200.0] {
            set = filter.filter(at(d), &registry, set);
            trace.push(set.contains("bench"));
        }
        assert_eq!(trace, vec![false, false, true, true, true, false, false]);
    }

    #[test]
    fn test_inside_bounds_is_present() {
        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("bench", ColliderCategory::Generic), None);
        let filter = ProximityFilter::new(ProximityConfig { enter_threshold: 0.0, exit_threshold: 0.0 });

        let set = filter.filter(Vec3::new(0.5, 0.5, 0.5), &registry, WorkingSet::new());
        assert!(set.contains("bench"));
    }

    #[test]
    fn test_stale_ids_dropped_and_exempt_ids_kept() {
        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("ground", ColliderCategory::StaticTerrain), None);
        registry.register(unit_box("bench", ColliderCategory::Generic), None);
        let filter = ProximityFilter::default();

        let mut previous = WorkingSet::new();
        previous.insert("demolished".to_string());
        previous.insert("bench".to_string());

        let set = filter.filter(Vec3::new(1.0e6, 0.0, 0.0), &registry, previous);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["ground"]);
    }

    #[test]
    fn test_terrain_registered_later_is_exempt() {
        let filter = ProximityFilter::default();
        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("bench", ColliderCategory::Generic), None);
        let far = Vec3::new(0.0, 1.0e6, 0.0);

        let set = filter.filter(far, &registry, WorkingSet::new());
        assert!(set.is_empty());

        registry.register(unit_box("track", ColliderCategory::StaticTerrain), None);
        let set = filter.filter(far, &registry, set);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["track"]);
        assert!(!filter.is_always_active("track"));
    }

    #[test]
    fn test_explicit_ids_exempt_other_categories() {
        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("boundary", ColliderCategory::Generic), None);
        let filter = ProximityFilter::default().with_always_active(["boundary"]);

        let set = filter.filter(Vec3::new(-1.0e5, 0.0, 0.0), &registry, WorkingSet::new());
        assert!(set.contains("boundary"));
    }

    #[test]
    fn test_empty_registry_gives_empty_set() {
        let registry = ColliderRegistry::new();
        let filter = ProximityFilter::default().with_always_active(["ground"]);
        assert!(filter.filter(Vec3::zeros(), &registry, WorkingSet::new()).is_empty());
    }

    #[test]
    fn test_movable_collider_uses_live_owner_bounds() {
        let mut graph = SceneGraph::new();
        let cart = graph.add_root("cart", &Transform::identity());
        graph
            .add_mesh(
                cart,
                "body",
                &Transform::identity(),
                Arc::new(MeshGeometry::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], vec![0, 1, 2])),
            )
            .unwrap();

        let mut registry = ColliderRegistry::new();
        registry.register(unit_box("cart", ColliderCategory::Generic).with_movable(true), Some(cart));
        let filter = ProximityFilter::default();
        let query = Vec3::new(500.0, 0.0, 0.0);

        assert!(filter.filter_in_scene(query, &registry, WorkingSet::new(), &graph).is_empty());

        graph.set_local_transform(cart, &Transform::from_position(Vec3::new(450.0, 0.0, 0.0)));
        let set = filter.filter_in_scene(query, &registry, WorkingSet::new(), &graph);
        assert!(set.contains("cart"));
        assert!(filter.filter(query, &registry, WorkingSet::new()).is_empty());
    }

    #[test]
    fn test_region_filter() {
        let filter = ProximityFilter::default();
        let regions = [
            (1u32, AABB::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 10.0))),
            (2u32, AABB::new(Vec3::new(300.0, 0.0, 0.0), Vec3::new(310.0, 10.0, 10.0))),
        ];

        let set = filter.filter_regions(Vec3::new(50.0, 5.0, 5.0), &regions, IndexSet::new());
        assert!(set.contains(&1) && !set.contains(&2));

        let set = filter.filter_regions(Vec3::new(155.0, 5.0, 5.0), &regions, set);
        assert!(set.contains(&1));

        let set = filter.filter_regions(Vec3::new(175.0, 5.0, 5.0), &regions, set);
        assert!(set.is_empty());
    }
}
