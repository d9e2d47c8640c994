//! Collider registry
//!
//! Keyed store of every live collider plus a non-owning id → scene node map
//! used to report which object a projectile hit. Iteration follows
//! registration order, which is also the order the resolver tests colliders
//! in.

use indexmap::IndexMap;

use crate::config::DebugConfig;
use crate::debug::{ColliderDebugVisualizer, DebugShape};
use crate::scene::{NodeKey, SceneGraph};
use super::collider::{Collider, ColliderCategory, ColliderFactory, DebugDisplay, ObjectSpec};
use super::error::CollisionError;

/// Summary of a batch build
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Ids of colliders registered
    pub built: Vec<String>,
    /// Ids whose geometry had no triangles
    pub skipped_empty: Vec<String>,
    /// Ids that failed, with the reason
    pub failed: Vec<(String, CollisionError)>,
}

impl BuildReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: BuildReport) {
        self.built.extend(other.built);
        self.skipped_empty.extend(other.skipped_empty);
        self.failed.extend(other.failed);
    }

    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Store of live colliders
pub struct ColliderRegistry {
    colliders: IndexMap<String, Collider>,
    owners: IndexMap<String, NodeKey>,
    debug_flags: DebugDisplay,
    visualizer: ColliderDebugVisualizer,
}

impl ColliderRegistry {
    /// Empty registry with debug display off
    pub fn new() -> Self {
        Self {
            colliders: IndexMap::new(),
            owners: IndexMap::new(),
            debug_flags: DebugDisplay::empty(),
            visualizer: ColliderDebugVisualizer::default(),
        }
    }

    /// Empty registry using the given debug settings
    pub fn with_debug_config(config: &DebugConfig) -> Self {
        let mut registry = Self::new();
        registry.debug_flags = Self::flags_from_config(config);
        registry.visualizer.set_visualize_depth(config.visualize_depth);
        registry
    }

    fn flags_from_config(config: &DebugConfig) -> DebugDisplay {
        let mut flags = DebugDisplay::empty();
        flags.set(DebugDisplay::COLLIDER, config.display_collider);
        flags.set(DebugDisplay::BVH, config.display_bvh);
        flags
    }

    /// Add a collider, replacing any collider with the same id
    ///
    /// Returns the replaced collider.
    pub fn register(&mut self, mut collider: Collider, owner: Option<NodeKey>) -> Option<Collider> {
        let id = collider.id.clone();
        let previous = self.take(&id);
        if previous.is_some() {
            log::warn!("Collider '{}' registered twice, replacing the old one", id);
        }

        collider.debug = self.debug_flags;
        self.visualizer.draw_collider(&collider);
        if let Some(owner) = owner {
            self.owners.insert(id.clone(), owner);
        }
        log::trace!("Registered collider '{}' ({:?})", id, collider.category);
        self.colliders.insert(id, collider);

        previous
    }

    /// Look up a collider
    pub fn get(&self, id: &str) -> Option<&Collider> {
        self.colliders.get(id)
    }

    /// Look up a collider for metadata changes
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Collider> {
        self.colliders.get_mut(id)
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.colliders.contains_key(id)
    }

    /// Colliders in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Collider)> {
        self.colliders.iter().map(|(id, c)| (id.as_str(), c))
    }

    /// All colliders in registration order
    pub fn get_all(&self) -> Vec<&Collider> {
        self.colliders.values().collect()
    }

    /// Position of `id` in registration order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.colliders.get_index_of(id)
    }

    /// Scene node owning `id`
    pub fn owner(&self, id: &str) -> Option<NodeKey> {
        self.owners.get(id).copied()
    }

    /// Number of colliders
    pub fn count(&self) -> usize {
        self.colliders.len()
    }

    /// True when no colliders are registered
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn take(&mut self, id: &str) -> Option<Collider> {
        let collider = self.colliders.shift_remove(id)?;
        self.owners.shift_remove(id);
        self.visualizer.clear_collider(id);
        Some(collider)
    }

    /// Remove a collider and its debug shapes; `false` if it was not registered
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.take(id).is_some();
        if removed {
            log::trace!("Removed collider '{}'", id);
        }
        removed
    }

    /// Remove every collider owned by `owner`
    pub fn remove_owner(&mut self, owner: NodeKey) -> usize {
        let ids: Vec<String> = self
            .owners
            .iter()
            .filter(|(_, o)| **o == owner)
            .map(|(id, _)| id.clone())
            .collect();
        ids.iter().filter(|id| self.remove(id)).count()
    }

    /// Replace a collider after its geometry changed
    pub fn rebuild(&mut self, collider: Collider, owner: Option<NodeKey>) {
        self.remove(&collider.id);
        self.register(collider, owner);
    }

    /// Ids exempt from proximity filtering
    pub fn always_active(&self) -> Vec<String> {
        self.colliders
            .values()
            .filter(|c| c.category == ColliderCategory::StaticTerrain)
            .map(|c| c.id.clone())
            .collect()
    }

    /// Update a door's open flag; `false` if `id` is not a door
    pub fn set_door_open(&mut self, id: &str, open: bool) -> bool {
        match self.colliders.get_mut(id).and_then(|c| c.door.as_mut()) {
            Some(door) => {
                door.open = open;
                true
            }
            None => false,
        }
    }

    /// Apply debug flags to every live collider and regenerate its shapes
    pub fn set_debug_display(&mut self, flags: DebugDisplay, visualize_depth: u32) {
        self.debug_flags = flags;
        self.visualizer.set_visualize_depth(visualize_depth);
        for collider in self.colliders.values_mut() {
            collider.debug = flags;
            self.visualizer.draw_collider(collider);
        }
    }

    /// [`Self::set_debug_display`] driven by a config section
    pub fn apply_debug_config(&mut self, config: &DebugConfig) {
        self.set_debug_display(Self::flags_from_config(config), config.visualize_depth);
    }

    /// Debug shapes of every live collider
    pub fn debug_shapes(&self) -> Vec<&DebugShape> {
        self.visualizer.get_shapes()
    }

    /// Visualizer for contact markers
    pub fn visualizer_mut(&mut self) -> &mut ColliderDebugVisualizer {
        &mut self.visualizer
    }

    /// Build and register every collider of one scene object
    ///
    /// Failed pieces are logged and skipped; the others still register.
    pub fn build_object(
        &mut self,
        factory: &ColliderFactory<'_>,
        graph: &SceneGraph,
        spec: &ObjectSpec,
    ) -> BuildReport {
        let owner = graph.contains(spec.root).then_some(spec.root);
        let mut report = BuildReport::default();

        for piece in factory.build_object(graph, spec) {
            match piece.result {
                Ok(Some(collider)) => {
                    self.register(collider, owner);
                    report.built.push(piece.id);
                }
                Ok(None) => report.skipped_empty.push(piece.id),
                Err(err) => {
                    log::warn!("Failed to build collider '{}' of '{}': {}", piece.id, spec.id, err);
                    report.failed.push((piece.id, err));
                }
            }
        }

        report
    }

    /// Build several objects; one failing never stops the rest
    pub fn build_scene<'s, I>(
        &mut self,
        factory: &ColliderFactory<'_>,
        graph: &SceneGraph,
        specs: I,
    ) -> BuildReport
    where
        I: IntoIterator<Item = &'s ObjectSpec>,
    {
        let mut report = BuildReport::default();
        for spec in specs {
            report.merge(self.build_object(factory, graph, spec));
        }
        log::info!(
            "Collider build: {} built, {} empty, {} failed",
            report.built.len(),
            report.skipped_empty.len(),
            report.failed.len()
        );
        report
    }
}

impl Default for ColliderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
