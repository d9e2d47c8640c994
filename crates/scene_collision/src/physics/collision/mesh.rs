//! Mesh aggregation
//!
//! Collapses every mesh beneath a scene node into a single world-space
//! triangle soup. Only positions and indices survive; normals, UVs and any
//! skinning data are never read because colliders only care about shape.

use std::collections::HashSet;

use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::physics::error::{CollisionError, CollisionResult};
use crate::scene::{AABB, MeshGeometry, NodeKey, SceneGraph};
use super::primitives::Triangle;

/// World-space triangle soup ready for BVH construction
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions in world space
    pub vertices: Vec<Vec3>,
    /// Triangle indices, three per triangle
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh from already-validated world-space buffers
    pub fn from_buffers(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Closed box spanning `bounds`, 12 outward-facing triangles
    pub fn from_box(bounds: &AABB) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let vertices = vec![
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // -z
            4, 5, 6,  4, 6, 7, // +z
            0, 1, 5,  0, 5, 4, // -y
            3, 7, 6,  3, 6, 2, // +y
            0, 4, 7,  0, 7, 3, // -x
            1, 2, 6,  1, 6, 5, // +x
        ];
        Self { vertices, indices }
    }

    /// Box standing on `base`: centred in x/z, extending `height` upward
    pub fn from_placement(base: Vec3, width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width * 0.5, 0.0, depth * 0.5);
        Self::from_box(&AABB::new(base - half, base + half + Vec3::new(0.0, height, 0.0)))
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    /// Triangle `i`, `None` past the end
    pub fn triangle(&self, i: usize) -> Option<Triangle> {
        let idx = self.indices.get(i * 3..i * 3 + 3)?;
        Some(Triangle::new(
            *self.vertices.get(idx[0] as usize)?,
            *self.vertices.get(idx[1] as usize)?,
            *self.vertices.get(idx[2] as usize)?,
        ))
    }

    /// Iterate all triangles in index order
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).filter_map(move |i| self.triangle(i))
    }

    /// Bounds of every vertex, `None` when there are none
    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(self.vertices.iter().copied())
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Check index range and vertex finiteness
    pub fn validate(&self, object: &str) -> CollisionResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(CollisionError::MalformedIndices {
                object: object.to_string(),
                len: self.indices.len(),
            });
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(CollisionError::IndexOutOfRange {
                object: object.to_string(),
                index,
                vertex_count: self.vertices.len(),
            });
        }
        if self.vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(CollisionError::NonFiniteVertex { object: object.to_string() });
        }
        Ok(())
    }
}

/// Merges the meshes of a scene subtree into one [`TriangleMesh`]
///
/// Aggregation reads world matrices as they are at call time; the result does
/// not follow later transform changes.
pub struct MeshAggregator<'a> {
    graph: &'a SceneGraph,
}

impl<'a> MeshAggregator<'a> {
    /// Aggregator over a scene graph
    pub fn new(graph: &'a SceneGraph) -> Self {
        Self { graph }
    }

    /// Merge every mesh at or beneath `root`
    pub fn aggregate(&self, root: NodeKey) -> CollisionResult<TriangleMesh> {
        self.aggregate_excluding(root, &HashSet::new())
    }

    /// Merge every mesh beneath `root`, skipping the subtrees rooted at `excluded`
    pub fn aggregate_excluding(
        &self,
        root: NodeKey,
        excluded: &HashSet<NodeKey>,
    ) -> CollisionResult<TriangleMesh> {
        if !self.graph.contains(root) {
            return Err(CollisionError::UnknownNode);
        }

        let mut mesh = TriangleMesh::new();
        let mut stack = vec![root];

        while let Some(key) = stack.pop() {
            if excluded.contains(&key) {
                continue;
            }
            let node = self.graph.node(key).ok_or(CollisionError::UnknownNode)?;
            if !node.ready {
                return Err(CollisionError::GeometryNotReady { object: node.name.clone() });
            }

            if let Some(geometry) = node.geometry.as_deref() {
                let world = self.graph.world_matrix(key).ok_or(CollisionError::UnknownNode)?;
                let before = mesh.triangle_count();
                Self::append_geometry(&mut mesh, geometry, &world, &node.name)?;
                log::trace!(
                    "Aggregated '{}': {} triangles",
                    node.name,
                    mesh.triangle_count() - before
                );
            }

            stack.extend(node.children.iter().rev().copied());
        }

        Ok(mesh)
    }

    fn append_geometry(
        mesh: &mut TriangleMesh,
        geometry: &MeshGeometry,
        world: &Mat4,
        name: &str,
    ) -> CollisionResult<()> {
        let vertex_count = geometry.vertex_count();
        let local_indices: Vec<u32> = match &geometry.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(CollisionError::MalformedIndices {
                        object: name.to_string(),
                        len: indices.len(),
                    });
                }
                if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                    return Err(CollisionError::IndexOutOfRange {
                        object: name.to_string(),
                        index,
                        vertex_count,
                    });
                }
                indices.clone()
            }
            // Trailing vertices that do not form a full triangle are ignored
            None => (0..(vertex_count / 3 * 3) as u32).collect(),
        };

        if local_indices.is_empty() {
            return Ok(());
        }

        let offset = mesh.vertices.len() as u32;
        for i in 0..vertex_count {
            let Some(local) = geometry.vertex(i) else { break };
            let world_vertex = transform_point(world, &local);
            if !world_vertex.iter().all(|c| c.is_finite()) {
                return Err(CollisionError::NonFiniteVertex { object: name.to_string() });
            }
            mesh.vertices.push(world_vertex);
        }
        mesh.indices.extend(local_indices.into_iter().map(|i| i + offset));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn quad() -> Arc<MeshGeometry> {
        Arc::new(MeshGeometry::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2, 0, 2, 3],
        ))
    }

    #[test]
    fn test_aggregate_offsets_indices_and_applies_world_matrix() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("gym", &Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        graph.add_mesh(root, "a", &Transform::identity(), quad()).unwrap();
        graph
            .add_mesh(root, "b", &Transform::from_position(Vec3::new(10.0, 0.0, 0.0)), quad())
            .unwrap();

        let mesh = MeshAggregator::new(&graph).aggregate(root).unwrap();

        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_relative_eq!(mesh.vertices[4], Vec3::new(10.0, 0.0, 5.0));
        assert!(mesh.validate("gym").is_ok());
    }

    #[test]
    fn test_non_indexed_and_empty_leaves() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("props", &Transform::identity());
        graph
            .add_mesh(
                root,
                "tri",
                &Transform::identity(),
                Arc::new(MeshGeometry::non_indexed(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 5.0, 5.0,
                ])),
            )
            .unwrap();
        graph
            .add_mesh(root, "empty", &Transform::identity(), Arc::new(MeshGeometry::default()))
            .unwrap();

        let mesh = MeshAggregator::new(&graph).aggregate(root).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_group_without_meshes_is_empty() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("lights", &Transform::identity());
        graph.add_child(root, "lamp", &Transform::identity()).unwrap();

        let mesh = MeshAggregator::new(&graph).aggregate(root).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_excluded_subtree_is_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("hall", &Transform::identity());
        graph.add_mesh(root, "wall", &Transform::identity(), quad()).unwrap();
        let door = graph.add_mesh(root, "door_1", &Transform::identity(), quad()).unwrap();

        let excluded: HashSet<NodeKey> = [door].into_iter().collect();
        let mesh = MeshAggregator::new(&graph).aggregate_excluding(root, &excluded).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_streaming_geometry_is_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("track", &Transform::identity());
        let pending = graph.add_pending_mesh(root, "lanes", &Transform::identity()).unwrap();

        let err = MeshAggregator::new(&graph).aggregate(root).unwrap_err();
        assert_eq!(err, CollisionError::GeometryNotReady { object: "lanes".to_string() });

        graph.mark_ready(pending, Some(quad()));
        assert_eq!(MeshAggregator::new(&graph).aggregate(root).unwrap().triangle_count(), 2);
    }

    #[test]
    fn test_out_of_range_index_names_the_node() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("bad", &Transform::identity());
        graph
            .add_mesh(
                root,
                "broken_leaf",
                &Transform::identity(),
                Arc::new(MeshGeometry::new(vec![0.0; 9], vec![0, 1, 7])),
            )
            .unwrap();

        let err = MeshAggregator::new(&graph).aggregate(root).unwrap_err();
        assert!(matches!(
            err,
            CollisionError::IndexOutOfRange { ref object, index: 7, vertex_count: 3 } if object == "broken_leaf"
        ));
    }

    #[test]
    fn test_box_mesh_faces_outward() {
        let bounds = AABB::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 4.0, 1.0));
        let mesh = TriangleMesh::from_box(&bounds);
        let center = bounds.center();

        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.triangles() {
            let outward = tri.centroid() - center;
            assert!(tri.normal().unwrap().dot(&outward) > 0.0);
        }
    }
}
