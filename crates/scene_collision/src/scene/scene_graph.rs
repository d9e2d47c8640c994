//! Scene graph and bounding primitives
//!
//! A minimal node hierarchy standing in for the renderer's scene: named nodes
//! with local transforms and optional triangle geometry. The collision core
//! only reads from it (world matrices, geometry, readiness) when aggregating
//! meshes or refreshing the bounds of movable colliders.

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{transform_point, vec_max, vec_min, Mat4, Transform, Vec3};
use super::template_cache::ModelTemplateCache;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB that any expansion will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vec3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest AABB containing every point, `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut bounds = Self::empty();
        for point in points {
            bounds.expand_point(&point);
        }
        bounds.is_valid().then_some(bounds)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to include a point
    pub fn expand_point(&mut self, point: &Vec3) {
        self.min = vec_min(&self.min, point);
        self.max = vec_max(&self.max, point);
    }

    /// Union of two boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: vec_min(&self.min, &other.min),
            max: vec_max(&self.max, &other.max),
        }
    }

    /// Box grown by `amount` on every side
    pub fn expanded(&self, amount: f32) -> AABB {
        let delta = Vec3::new(amount, amount, amount);
        AABB::new(self.min - delta, self.max + delta)
    }

    /// Surface area, used by the SAH builder
    pub fn surface_area(&self) -> f32 {
        let size = self.max - self.min;
        2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
    }

    /// Index of the longest axis (0 = x, 1 = y, 2 = z)
    pub fn longest_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Whether min <= max on every axis
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Point of the box closest to `point` (the point itself when inside)
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Euclidean distance from `point` to the box surface, 0 when inside
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (self.closest_point(point) - point).magnitude()
    }

    /// Check if a sphere overlaps this box
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        (self.closest_point(center) - center).magnitude_squared() <= radius * radius
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            // 0 when the origin is inside the box
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for a clip space with depth in [-1, 1].
    /// Plane normals point into the frustum.
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let row = |i: usize| vp_matrix.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [
            &r3 + &r0, // left
            &r3 - &r0, // right
            &r3 + &r1, // bottom
            &r3 - &r1, // top
            &r3 + &r2, // near
            &r3 - &r2, // far
        ]
        .map(|coeffs| Plane::from_coefficients(coeffs.x, coeffs.y, coeffs.z, coeffs.w));

        Self { planes }
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        for plane in &self.planes {
            // Corner farthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            // If this point is outside the plane, the entire AABB is outside
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }

        true
    }

    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -radius)
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane `a x + b y + c z + d = 0`, normalised so the normal has unit length
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            // Degenerate plane never culls anything
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self { normal: normal / length, distance: d / length }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`]
    pub struct NodeKey;
}

/// Triangle geometry attached to a scene node, in the node's local space
///
/// Positions are a flat `[x, y, z, x, y, z, ...]` array. Without an index
/// buffer every three consecutive vertices form a triangle.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    /// Flat vertex positions
    pub positions: Vec<f32>,
    /// Optional triangle index buffer
    pub indices: Option<Vec<u32>>,
}

impl MeshGeometry {
    /// Indexed geometry
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { positions, indices: Some(indices) }
    }

    /// Geometry whose vertices are consumed three at a time
    pub fn non_indexed(positions: Vec<f32>) -> Self {
        Self { positions, indices: None }
    }

    /// Number of complete vertices in the position buffer
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles described by the index buffer (or vertex buffer)
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Vertex `i` as a vector
    pub fn vertex(&self, i: usize) -> Option<Vec3> {
        let base = i * 3;
        self.positions
            .get(base..base + 3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }
}

/// A single node of the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Object name as authored in the source asset
    pub name: String,
    /// Transform relative to the parent node
    pub local: Mat4,
    /// Parent node, `None` for roots
    pub parent: Option<NodeKey>,
    /// Child nodes in insertion order
    pub children: Vec<NodeKey>,
    /// Renderable geometry, if this node is a mesh
    pub geometry: Option<Arc<MeshGeometry>>,
    /// False while the node's asset is still streaming in
    pub ready: bool,
}

impl SceneNode {
    fn new(name: impl Into<String>, local: Mat4, parent: Option<NodeKey>) -> Self {
        Self {
            name: name.into(),
            local,
            parent,
            children: Vec::new(),
            geometry: None,
            ready: true,
        }
    }
}

/// Hierarchy of named nodes with transforms and geometry
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node
    pub fn add_root(&mut self, name: impl Into<String>, transform: &Transform) -> NodeKey {
        self.nodes.insert(SceneNode::new(name, transform.to_matrix(), None))
    }

    /// Add a node under `parent`; `None` if the parent does not exist
    pub fn add_child(
        &mut self,
        parent: NodeKey,
        name: impl Into<String>,
        transform: &Transform,
    ) -> Option<NodeKey> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let key = self.nodes.insert(SceneNode::new(name, transform.to_matrix(), Some(parent)));
        self.nodes[parent].children.push(key);
        Some(key)
    }

    /// Add a mesh node with finalized geometry under `parent`
    pub fn add_mesh(
        &mut self,
        parent: NodeKey,
        name: impl Into<String>,
        transform: &Transform,
        geometry: Arc<MeshGeometry>,
    ) -> Option<NodeKey> {
        let key = self.add_child(parent, name, transform)?;
        self.nodes[key].geometry = Some(geometry);
        Some(key)
    }

    /// Add a mesh node whose asset is still loading; see [`SceneGraph::mark_ready`]
    pub fn add_pending_mesh(
        &mut self,
        parent: NodeKey,
        name: impl Into<String>,
        transform: &Transform,
    ) -> Option<NodeKey> {
        let key = self.add_child(parent, name, transform)?;
        self.nodes[key].ready = false;
        Some(key)
    }

    /// Attach loaded geometry to a pending node and flag it ready
    pub fn mark_ready(&mut self, key: NodeKey, geometry: Option<Arc<MeshGeometry>>) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) => {
                if geometry.is_some() {
                    node.geometry = geometry;
                }
                node.ready = true;
                true
            }
            None => false,
        }
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, key: NodeKey, transform: &Transform) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) => {
                node.local = transform.to_matrix();
                true
            }
            None => false,
        }
    }

    /// Borrow a node
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Whether the key refers to a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cumulative world matrix of a node (parent chain applied)
    pub fn world_matrix(&self, key: NodeKey) -> Option<Mat4> {
        let mut node = self.nodes.get(key)?;
        let mut matrix = node.local;
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            matrix = node.local * matrix;
        }
        Some(matrix)
    }

    /// First node with the given name, in slot order
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(key, _)| key)
    }

    /// `root` and all nodes beneath it, depth-first pre-order
    pub fn descendants(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            out.push(key);
            if let Some(node) = self.nodes.get(key) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Current world-space bounds of all geometry under `root`
    pub fn world_bounds(&self, root: NodeKey) -> Option<AABB> {
        let mut bounds = AABB::empty();
        for key in self.descendants(root) {
            let Some(geometry) = self.nodes[key].geometry.as_ref() else {
                continue;
            };
            let Some(world) = self.world_matrix(key) else {
                continue;
            };
            for i in 0..geometry.vertex_count() {
                if let Some(v) = geometry.vertex(i) {
                    bounds.expand_point(&transform_point(&world, &v));
                }
            }
        }
        bounds.is_valid().then_some(bounds)
    }

    /// Remove a node and its whole subtree; returns the number of nodes removed
    pub fn remove(&mut self, key: NodeKey) -> usize {
        let doomed = self.descendants(key);
        if let Some(parent) = self.nodes.get(key).and_then(|node| node.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|child| *child != key);
            }
        }
        doomed
            .into_iter()
            .filter(|k| self.nodes.remove(*k).is_some())
            .count()
    }

    /// Instantiate a cached model template as a new group node
    ///
    /// The group is named `name` and each template part becomes a child mesh.
    /// Returns `None` if the template is not cached or the parent is missing.
    pub fn instantiate(
        &mut self,
        cache: &ModelTemplateCache,
        template: &str,
        parent: Option<NodeKey>,
        name: impl Into<String>,
        transform: &Transform,
    ) -> Option<NodeKey> {
        let model = cache.get(template)?;
        let group = match parent {
            Some(parent) => self.add_child(parent, name, transform)?,
            None => self.add_root(name, transform),
        };
        for part in &model.parts {
            let key = self.add_child(group, part.name.clone(), &Transform::identity())?;
            let node = &mut self.nodes[key];
            node.local = part.local;
            node.geometry = Some(Arc::clone(&part.geometry));
        }
        Some(group)
    }
}
