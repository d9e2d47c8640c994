//! Collider construction
//!
//! A [`Collider`] is a frozen, queryable snapshot of an object's triangles in
//! world space. [`ColliderBuilder`] turns one aggregated mesh into one collider;
//! [`ColliderFactory`] applies a [`ConstructionStrategy`] to a whole scene object
//! and may produce several colliders (door leaves, tree instances).

use std::collections::HashSet;

use bitflags::bitflags;

use crate::config::{BvhConfig, TreeColliderConfig};
use crate::foundation::math::Vec3;
use crate::scene::{AABB, NodeKey, SceneGraph};
use super::collision::{Bvh, MeshAggregator, TriangleMesh};
use super::door_config::{DoorConfiguration, DoorState};
use super::error::CollisionResult;

bitflags! {
    /// Debug visualisation toggles for a collider
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DebugDisplay: u8 {
        /// Wireframe of the collider triangles
        const COLLIDER = 0b0000_0001;
        /// BVH node boxes at the configured depth
        const BVH      = 0b0000_0010;
    }
}

/// What kind of scene object a collider stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderCategory {
    /// Ground or track; exempt from proximity filtering
    StaticTerrain,
    /// A single door leaf carrying [`DoorState`]
    Door,
    /// Synthetic box around a tree placement
    Tree,
    /// Anything else
    Generic,
}

/// Queryable collision geometry of one object
#[derive(Debug, Clone)]
pub struct Collider {
    /// Unique identifier within the registry
    pub id: String,
    /// Object category
    pub category: ColliderCategory,
    /// Door metadata, present only for [`ColliderCategory::Door`]
    pub door: Option<DoorState>,
    /// Triangle hierarchy in world space
    pub bvh: Bvh,
    /// World-space bounds of the input vertices at build time
    pub bounds: AABB,
    /// Owner moves after construction; proximity uses its live bounds
    pub movable: bool,
    /// Active debug visualisation
    pub debug: DebugDisplay,
}

impl Collider {
    /// Attach door metadata
    pub fn with_door(mut self, state: DoorState) -> Self {
        self.door = Some(state);
        self
    }

    /// Flag the collider as belonging to a moving object
    pub fn with_movable(mut self, movable: bool) -> Self {
        self.movable = movable;
        self
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.bvh.triangle_count()
    }

    /// Whether sphere resolution should test this collider at all
    pub fn blocks_projectiles(&self) -> bool {
        self.door.as_ref().map_or(true, DoorState::blocks_projectiles)
    }
}

/// Builds colliders from aggregated meshes
#[derive(Debug, Clone)]
pub struct ColliderBuilder {
    config: BvhConfig,
}

impl ColliderBuilder {
    /// Builder using the given BVH parameters
    pub fn new(config: &BvhConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Build a collider for `mesh`
    ///
    /// Returns `Ok(None)` when the mesh has no triangles; the caller decides
    /// whether to retry once geometry is available.
    pub fn build(
        &self,
        id: impl Into<String>,
        category: ColliderCategory,
        mesh: &TriangleMesh,
    ) -> CollisionResult<Option<Collider>> {
        let id = id.into();
        if mesh.is_empty() {
            log::debug!("Skipping collider '{}': no triangles", id);
            return Ok(None);
        }
        mesh.validate(&id)?;

        // Every input vertex, including ones no triangle references
        let Some(bounds) = mesh.bounds() else {
            return Ok(None);
        };
        let bvh = Bvh::build(mesh, &self.config);

        log::debug!(
            "Built collider '{}' ({:?}): {} triangles, BVH depth {}",
            id,
            category,
            bvh.triangle_count(),
            bvh.depth()
        );

        Ok(Some(Collider {
            id,
            category,
            door: None,
            bvh,
            bounds,
            movable: false,
            debug: DebugDisplay::empty(),
        }))
    }
}

/// How a scene object is split into colliders
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructionStrategy {
    /// One always-active terrain collider
    Terrain,
    /// Door leaves become their own colliders, the rest merges into one
    Structure,
    /// One synthetic box per placement point
    TreeInstances {
        /// World-space base of each tree
        placements: Vec<Vec3>,
    },
    /// One merged collider
    Generic {
        /// Whether the object moves after construction
        movable: bool,
    },
}

/// A scene object to build colliders for
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    /// Object identifier, also the owner key's name in logs
    pub id: String,
    /// Root node of the object
    pub root: NodeKey,
    /// Splitting strategy
    pub strategy: ConstructionStrategy,
}

impl ObjectSpec {
    /// Describe an object
    pub fn new(id: impl Into<String>, root: NodeKey, strategy: ConstructionStrategy) -> Self {
        Self { id: id.into(), root, strategy }
    }
}

/// Outcome of building one piece of an object
#[derive(Debug)]
pub struct ColliderPiece {
    /// Identifier the piece was built under
    pub id: String,
    /// The collider, nothing for empty geometry, or the failure
    pub result: CollisionResult<Option<Collider>>,
}

impl ColliderPiece {
    fn new(id: String, result: CollisionResult<Option<Collider>>) -> Self {
        Self { id, result }
    }
}

/// Applies construction strategies to scene objects
pub struct ColliderFactory<'a> {
    builder: ColliderBuilder,
    trees: TreeColliderConfig,
    doors: &'a DoorConfiguration,
}

impl<'a> ColliderFactory<'a> {
    /// Factory with BVH and tree settings and a door table
    pub fn new(bvh: &BvhConfig, trees: &TreeColliderConfig, doors: &'a DoorConfiguration) -> Self {
        Self {
            builder: ColliderBuilder::new(bvh),
            trees: *trees,
            doors,
        }
    }

    /// The single-mesh builder used by this factory
    pub fn builder(&self) -> &ColliderBuilder {
        &self.builder
    }

    /// Build every collider `spec` calls for
    ///
    /// Each piece succeeds or fails on its own.
    pub fn build_object(&self, graph: &SceneGraph, spec: &ObjectSpec) -> Vec<ColliderPiece> {
        let aggregator = MeshAggregator::new(graph);

        match &spec.strategy {
            ConstructionStrategy::Terrain => {
                let result = aggregator.aggregate(spec.root).and_then(|mesh| {
                    self.builder.build(&spec.id, ColliderCategory::StaticTerrain, &mesh)
                });
                vec![ColliderPiece::new(spec.id.clone(), result)]
            }
            ConstructionStrategy::Structure => self.build_structure(graph, spec),
            ConstructionStrategy::TreeInstances { placements } => placements
                .iter()
                .enumerate()
                .map(|(i, base)| {
                    let id = format!("{}::tree{}", spec.id, i);
                    let mesh = TriangleMesh::from_placement(
                        *base,
                        self.trees.width,
                        self.trees.height,
                        self.trees.depth,
                    );
                    let result = self.builder.build(&id, ColliderCategory::Tree, &mesh);
                    ColliderPiece::new(id, result)
                })
                .collect(),
            ConstructionStrategy::Generic { movable } => {
                let result = aggregator.aggregate(spec.root).and_then(|mesh| {
                    self.builder.build(&spec.id, ColliderCategory::Generic, &mesh)
                });
                let result = result.map(|c| c.map(|c| c.with_movable(*movable)));
                vec![ColliderPiece::new(spec.id.clone(), result)]
            }
        }
    }

    fn build_structure(&self, graph: &SceneGraph, spec: &ObjectSpec) -> Vec<ColliderPiece> {
        let aggregator = MeshAggregator::new(graph);
        let mut pieces = Vec::new();
        let mut door_nodes = HashSet::new();

        for key in graph.descendants(spec.root) {
            let Some(node) = graph.node(key) else { continue };
            let Some(entry) = self.doors.lookup(&node.name) else { continue };
            // A door nested in a claimed door is already part of its collider
            if key == spec.root || has_claimed_ancestor(graph, key, spec.root, &door_nodes) {
                continue;
            }
            door_nodes.insert(key);

            let id = node.name.clone();
            let result = aggregator.aggregate(key).and_then(|mesh| {
                self.builder.build(&id, ColliderCategory::Door, &mesh)
            });
            let result = result.map(|c| c.map(|c| c.with_door(entry.state())));
            pieces.push(ColliderPiece::new(id, result));
        }

        let id = format!("{}::structure", spec.id);
        let result = aggregator
            .aggregate_excluding(spec.root, &door_nodes)
            .and_then(|mesh| self.builder.build(&id, ColliderCategory::Generic, &mesh));
        pieces.push(ColliderPiece::new(id, result));

        pieces
    }
}

/// Whether any ancestor of `key` below `root` is in `claimed`
fn has_claimed_ancestor(
    graph: &SceneGraph,
    key: NodeKey,
    root: NodeKey,
    claimed: &HashSet<NodeKey>,
) -> bool {
    let mut parent = graph.node(key).and_then(|node| node.parent);
    while let Some(current) = parent {
        if current == root {
            return false;
        }
        if claimed.contains(&current) {
            return true;
        }
        parent = graph.node(current).and_then(|node| node.parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::physics::door_config::{DoorEntry, DoorKind};
    use crate::physics::error::CollisionError;
    use crate::scene::MeshGeometry;
    use std::sync::Arc;

    fn quad() -> Arc<MeshGeometry> {
        Arc::new(MeshGeometry::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2, 0, 2, 3],
        ))
    }

    fn doors() -> DoorConfiguration {
        DoorConfiguration {
            doors: vec![DoorEntry {
                feature: "entrance".to_string(),
                names: vec!["door_1".to_string(), "door_2".to_string()],
                open: false,
                kind: DoorKind::Normal,
            }],
        }
    }

    #[test]
    fn test_builder_bounds_contain_every_vertex() {
        let mesh = TriangleMesh::from_box(&AABB::new(
            Vec3::new(-3.0, 0.0, 2.0),
            Vec3::new(4.0, 7.5, 9.0),
        ));
        let collider = ColliderBuilder::new(&BvhConfig::default())
            .build("crate", ColliderCategory::Generic, &mesh)
            .unwrap()
            .unwrap();

        for v in &mesh.vertices {
            assert!(collider.bounds.contains_point(*v));
        }
        assert_eq!(collider.triangle_count(), 12);
        assert!(collider.debug.is_empty());
    }

    #[test]
    fn test_bounds_include_unreferenced_vertices() {
        let mesh = TriangleMesh::from_buffers(
            vec![
                Vec3::zeros(),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(50.0, 50.0, 50.0),
            ],
            vec![0, 1, 2],
        );
        let collider = ColliderBuilder::new(&BvhConfig::default())
            .build("marker", ColliderCategory::Generic, &mesh)
            .unwrap()
            .unwrap();

        assert!(collider.bounds.contains_point(Vec3::new(50.0, 50.0, 50.0)));
        assert_eq!(collider.bounds.max, Vec3::new(50.0, 50.0, 50.0));
        assert_eq!(collider.triangle_count(), 1);
    }

    #[test]
    fn test_builder_empty_mesh_is_none() {
        let result = ColliderBuilder::new(&BvhConfig::default())
            .build("nothing", ColliderCategory::Generic, &TriangleMesh::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_builder_rejects_non_finite() {
        let mesh = TriangleMesh::from_buffers(
            vec![Vec3::zeros(), Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
        );
        let err = ColliderBuilder::new(&BvhConfig::default())
            .build("nan", ColliderCategory::Generic, &mesh)
            .unwrap_err();
        assert_eq!(err, CollisionError::NonFiniteVertex { object: "nan".to_string() });
    }

    #[test]
    fn test_structure_splits_out_doors() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("gym", &Transform::identity());
        graph.add_mesh(root, "walls", &Transform::identity(), quad()).unwrap();
        graph
            .add_mesh(root, "door_1", &Transform::from_position(Vec3::new(5.0, 0.0, 0.0)), quad())
            .unwrap();

        let table = doors();
        let factory = ColliderFactory::new(&BvhConfig::default(), &TreeColliderConfig::default(), &table);
        let pieces = factory.build_object(&graph, &ObjectSpec::new("gym", root, ConstructionStrategy::Structure));

        let ids: Vec<&str> = pieces.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["door_1", "gym::structure"]);

        let door = pieces[0].result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(door.category, ColliderCategory::Door);
        assert_eq!(door.door.as_ref().unwrap().group, "entrance");
        assert!(door.bounds.min.x >= 5.0);

        let structure = pieces[1].result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(structure.triangle_count(), 2);
        assert!(structure.bounds.max.x <= 1.0);
    }

    #[test]
    fn test_nested_door_is_aggregated_once() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("gym", &Transform::identity());
        graph.add_mesh(root, "walls", &Transform::identity(), quad()).unwrap();
        let outer = graph.add_mesh(root, "door_1", &Transform::identity(), quad()).unwrap();
        graph
            .add_mesh(outer, "door_2", &Transform::from_position(Vec3::new(0.0, 2.0, 0.0)), quad())
            .unwrap();

        let table = doors();
        let factory = ColliderFactory::new(&BvhConfig::default(), &TreeColliderConfig::default(), &table);
        let pieces = factory.build_object(&graph, &ObjectSpec::new("gym", root, ConstructionStrategy::Structure));

        let ids: Vec<&str> = pieces.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["door_1", "gym::structure"]);

        let door = pieces[0].result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(door.triangle_count(), 4);
        assert_eq!(door.bounds.max.y, 3.0);

        let structure = pieces[1].result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(structure.triangle_count(), 2);
    }

    #[test]
    fn test_tree_instances_use_synthetic_boxes() {
        let graph = SceneGraph::new();
        let table = DoorConfiguration::default();
        let factory = ColliderFactory::new(&BvhConfig::default(), &TreeColliderConfig::default(), &table);
        let spec = ObjectSpec::new(
            "forest",
            NodeKey::default(),
            ConstructionStrategy::TreeInstances {
                placements: vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(-10.0, 2.0, 5.0)],
            },
        );

        let pieces = factory.build_object(&graph, &spec);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[1].id, "forest::tree1");

        let tree = pieces[1].result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(tree.category, ColliderCategory::Tree);
        assert_eq!(tree.bounds.min, Vec3::new(-11.0, 2.0, 4.0));
        assert_eq!(tree.bounds.max, Vec3::new(-9.0, 12.0, 6.0));
    }

    #[test]
    fn test_generic_movable_flag_and_failure() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("cart", &Transform::identity());
        graph.add_mesh(root, "body", &Transform::identity(), quad()).unwrap();
        let table = DoorConfiguration::default();
        let factory = ColliderFactory::new(&BvhConfig::default(), &TreeColliderConfig::default(), &table);

        let pieces = factory.build_object(
            &graph,
            &ObjectSpec::new("cart", root, ConstructionStrategy::Generic { movable: true }),
        );
        assert!(pieces[0].result.as_ref().unwrap().as_ref().unwrap().movable);

        graph.add_pending_mesh(root, "wheels", &Transform::identity()).unwrap();
        let pieces = factory.build_object(
            &graph,
            &ObjectSpec::new("cart", root, ConstructionStrategy::Generic { movable: true }),
        );
        assert!(matches!(pieces[0].result, Err(CollisionError::GeometryNotReady { .. })));
    }
}
