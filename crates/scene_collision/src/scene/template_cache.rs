//! Explicit cache of loaded model templates
//!
//! Loaded models are shared by cloning their parts into the scene graph. The
//! cache is an ordinary value owned by whoever drives scene assembly and is
//! passed to [`SceneGraph::instantiate`](super::SceneGraph::instantiate); there
//! is no process-wide template store.
//!
//! Invalidation rules: removing or replacing a template only affects future
//! instantiations. Nodes already instantiated keep their own `Arc` to the old
//! geometry, and colliders built from them are frozen snapshots, so callers
//! that reload a model must rebuild the affected colliders themselves.

use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::math::Mat4;
use super::scene_graph::MeshGeometry;

/// One mesh of a loaded model, relative to the model's origin
#[derive(Debug, Clone)]
pub struct TemplatePart {
    /// Part name, copied onto the instantiated node
    pub name: String,
    /// Part transform relative to the model origin
    pub local: Mat4,
    /// Shared geometry
    pub geometry: Arc<MeshGeometry>,
}

/// A loaded model: a flat list of mesh parts
#[derive(Debug, Clone, Default)]
pub struct ModelTemplate {
    /// Mesh parts in load order
    pub parts: Vec<TemplatePart>,
}

impl ModelTemplate {
    /// Single-part template with an identity transform
    pub fn single(name: impl Into<String>, geometry: Arc<MeshGeometry>) -> Self {
        Self {
            parts: vec![TemplatePart {
                name: name.into(),
                local: Mat4::identity(),
                geometry,
            }],
        }
    }
}

/// Caller-owned cache of model templates keyed by asset name
#[derive(Debug, Default)]
pub struct ModelTemplateCache {
    templates: HashMap<String, Arc<ModelTemplate>>,
}

impl ModelTemplateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a template, returning the one it replaced
    pub fn insert(&mut self, name: impl Into<String>, template: ModelTemplate) -> Option<Arc<ModelTemplate>> {
        self.templates.insert(name.into(), Arc::new(template))
    }

    /// Look up a template
    pub fn get(&self, name: &str) -> Option<Arc<ModelTemplate>> {
        self.templates.get(name).cloned()
    }

    /// Return the cached template or load and cache it
    ///
    /// A failed load caches nothing, so the next call retries.
    pub fn get_or_load<E, F>(&mut self, name: &str, load: F) -> Result<Arc<ModelTemplate>, E>
    where
        F: FnOnce() -> Result<ModelTemplate, E>,
    {
        if let Some(template) = self.templates.get(name) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(load()?);
        self.templates.insert(name.to_string(), Arc::clone(&template));
        log::debug!("Cached model template '{}' ({} parts)", name, template.parts.len());
        Ok(template)
    }

    /// Drop one template; returns whether it was cached
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.templates.remove(name).is_some()
    }

    /// Drop every template
    pub fn clear(&mut self) {
        self.templates.clear();
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::scene::SceneGraph;

    fn triangle() -> Arc<MeshGeometry> {
        Arc::new(MeshGeometry::non_indexed(vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]))
    }

    #[test]
    fn test_get_or_load_only_loads_once() {
        let mut cache = ModelTemplateCache::new();
        let mut loads = 0;

        for _ in 0..3 {
            let result: Result<_, ()> = cache.get_or_load("bench", || {
                loads += 1;
                Ok(ModelTemplate::single("seat", triangle()))
            });
            assert!(result.is_ok());
        }

        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache = ModelTemplateCache::new();
        let result: Result<_, &str> = cache.get_or_load("broken", || Err("missing file"));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_keeps_existing_instances() {
        let mut cache = ModelTemplateCache::new();
        cache.insert("bench", ModelTemplate::single("seat", triangle()));

        let mut graph = SceneGraph::new();
        let bench = graph
            .instantiate(&cache, "bench", None, "bench_1", &Transform::from_position(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();

        assert!(cache.invalidate("bench"));
        assert!(!cache.invalidate("bench"));

        // Existing instance still has geometry, new instances cannot be made
        assert!(graph.world_bounds(bench).is_some());
        assert!(graph.instantiate(&cache, "bench", None, "bench_2", &Transform::identity()).is_none());
    }
}
