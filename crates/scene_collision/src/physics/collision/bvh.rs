//! Bounding volume hierarchy over a triangle soup
//!
//! Binary tree of axis-aligned boxes built top-down once per collider. The
//! tree owns a copy of its triangles so a collider stays valid no matter what
//! happens to the scene geometry it was built from.

use crate::config::{BvhConfig, SplitStrategy};
use crate::foundation::math::Vec3;
use crate::scene::AABB;
use super::mesh::TriangleMesh;
use super::primitives::{BoundingSphere, Ray, Triangle};

const SAH_BINS: usize = 12;

/// BVH node
#[derive(Debug, Clone)]
enum BvhNode {
    /// Leaf node containing triangle indices
    Leaf {
        bounds: AABB,
        triangles: Vec<u32>,
    },
    /// Internal node with two children
    Internal {
        bounds: AABB,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &AABB {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Nearest ray hit against the hierarchy
#[derive(Debug, Clone, Copy)]
pub struct BvhRayHit {
    /// Index of the triangle hit
    pub triangle: u32,
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Face normal of the triangle hit, facing the ray origin
    pub normal: Vec3,
}

/// Result of a closest-point query
#[derive(Debug, Clone, Copy)]
pub struct ClosestPoint {
    /// Index of the nearest triangle
    pub triangle: u32,
    /// Closest point on that triangle
    pub point: Vec3,
    /// Distance from the query point
    pub distance: f32,
}

/// Triangle BVH used by every collider
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    triangles: Vec<Triangle>,
    triangle_bounds: Vec<AABB>,
    depth: u32,
    node_count: usize,
}

struct BuildContext<'a> {
    bounds: &'a [AABB],
    centroids: &'a [Vec3],
    config: &'a BvhConfig,
    depth: u32,
    node_count: usize,
}

impl Bvh {
    /// Build a hierarchy over every triangle of `mesh`
    ///
    /// An empty mesh yields an empty hierarchy that answers every query with
    /// nothing.
    pub fn build(mesh: &TriangleMesh, config: &BvhConfig) -> Self {
        let triangles: Vec<Triangle> = mesh.triangles().collect();
        let triangle_bounds: Vec<AABB> = triangles.iter().map(Triangle::bounds).collect();

        if triangles.is_empty() {
            return Self {
                root: None,
                triangles,
                triangle_bounds,
                depth: 0,
                node_count: 0,
            };
        }

        let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
        let indices: Vec<u32> = (0..triangles.len() as u32).collect();

        let mut ctx = BuildContext {
            bounds: &triangle_bounds,
            centroids: &centroids,
            config,
            depth: 0,
            node_count: 0,
        };
        let root = Self::build_recursive(&mut ctx, indices, 0);
        let (depth, node_count) = (ctx.depth, ctx.node_count);

        Self {
            root: Some(root),
            triangles,
            triangle_bounds,
            depth,
            node_count,
        }
    }

    fn build_recursive(ctx: &mut BuildContext<'_>, indices: Vec<u32>, depth: u32) -> BvhNode {
        ctx.node_count += 1;
        ctx.depth = ctx.depth.max(depth);

        let mut bounds = AABB::empty();
        for &i in &indices {
            bounds = bounds.union(&ctx.bounds[i as usize]);
        }

        if indices.len() <= ctx.config.max_leaf_triangles.max(1) || depth >= ctx.config.max_depth {
            return BvhNode::Leaf { bounds, triangles: indices };
        }

        let (left, right) = match ctx.config.strategy {
            SplitStrategy::Center => Self::split_center(ctx.centroids, indices),
            SplitStrategy::Sah => Self::split_sah(ctx.bounds, ctx.centroids, indices),
        };

        let left = Self::build_recursive(ctx, left, depth + 1);
        let right = Self::build_recursive(ctx, right, depth + 1);

        BvhNode::Internal {
            bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn centroid_bounds(centroids: &[Vec3], indices: &[u32]) -> AABB {
        let mut bounds = AABB::empty();
        for &i in indices {
            bounds.expand_point(&centroids[i as usize]);
        }
        bounds
    }

    /// Split at the midpoint of the centroid bounds along their longest axis
    fn split_center(centroids: &[Vec3], indices: Vec<u32>) -> (Vec<u32>, Vec<u32>) {
        let cb = Self::centroid_bounds(centroids, &indices);
        let axis = cb.longest_axis();
        let mid = cb.center()[axis];

        let (left, right): (Vec<u32>, Vec<u32>) =
            indices.iter().partition(|&&i| centroids[i as usize][axis] < mid);

        if left.is_empty() || right.is_empty() {
            return Self::split_median(centroids, indices, axis);
        }
        (left, right)
    }

    /// Binned surface-area heuristic over all three axes
    fn split_sah(bounds: &[AABB], centroids: &[Vec3], indices: Vec<u32>) -> (Vec<u32>, Vec<u32>) {
        let cb = Self::centroid_bounds(centroids, &indices);
        let mut best: Option<(f32, usize, usize)> = None;

        for axis in 0..3 {
            let lo = cb.min[axis];
            let extent = cb.max[axis] - lo;
            if extent <= f32::EPSILON {
                continue;
            }
            let bin_of = |i: u32| {
                let t = (centroids[i as usize][axis] - lo) / extent;
                ((t * SAH_BINS as f32) as usize).min(SAH_BINS - 1)
            };

            let mut counts = [0usize; SAH_BINS];
            let mut bin_bounds = [AABB::empty(); SAH_BINS];
            for &i in &indices {
                let b = bin_of(i);
                counts[b] += 1;
                bin_bounds[b] = bin_bounds[b].union(&bounds[i as usize]);
            }

            // Sweep from the right to get suffix areas and counts
            let mut right_area = [0.0f32; SAH_BINS];
            let mut right_count = [0usize; SAH_BINS];
            let mut acc = AABB::empty();
            let mut n = 0;
            for b in (1..SAH_BINS).rev() {
                acc = acc.union(&bin_bounds[b]);
                n += counts[b];
                right_area[b] = if n > 0 { acc.surface_area() } else { 0.0 };
                right_count[b] = n;
            }

            let mut acc = AABB::empty();
            let mut n = 0;
            for split in 1..SAH_BINS {
                acc = acc.union(&bin_bounds[split - 1]);
                n += counts[split - 1];
                if n == 0 || right_count[split] == 0 {
                    continue;
                }
                let cost = acc.surface_area() * n as f32
                    + right_area[split] * right_count[split] as f32;
                if best.map_or(true, |(c, _, _)| cost < c) {
                    best = Some((cost, axis, split));
                }
            }
        }

        let Some((_, axis, split)) = best else {
            return Self::split_median(centroids, indices, cb.longest_axis());
        };

        let lo = cb.min[axis];
        let extent = cb.max[axis] - lo;
        let (left, right): (Vec<u32>, Vec<u32>) = indices.iter().partition(|&&i| {
            let t = (centroids[i as usize][axis] - lo) / extent;
            ((t * SAH_BINS as f32) as usize).min(SAH_BINS - 1) < split
        });

        if left.is_empty() || right.is_empty() {
            return Self::split_median(centroids, indices, axis);
        }
        (left, right)
    }

    /// Object-median split, always yields two non-empty halves for 2+ triangles
    fn split_median(centroids: &[Vec3], mut indices: Vec<u32>, axis: usize) -> (Vec<u32>, Vec<u32>) {
        indices.sort_by(|&a, &b| {
            centroids[a as usize][axis]
                .partial_cmp(&centroids[b as usize][axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let right = indices.split_off(indices.len() / 2);
        (indices, right)
    }

    /// Indices of triangles whose bounds overlap `query`
    pub fn query_aabb(&self, query: &AABB) -> Vec<u32> {
        let mut hits = Vec::new();
        self.visit_overlapping(query, |i| {
            hits.push(i);
            false
        });
        hits
    }

    /// Visit every triangle whose bounds overlap the sphere's bounding box
    ///
    /// Traversal stops as soon as `visit` returns `true`; the return value says
    /// whether that happened.
    pub fn shapecast_sphere<F>(&self, sphere: &BoundingSphere, mut visit: F) -> bool
    where
        F: FnMut(u32, &Triangle) -> bool,
    {
        let query = sphere.bounding_box();
        self.visit_overlapping(&query, |i| visit(i, &self.triangles[i as usize]))
    }

    fn visit_overlapping<F>(&self, query: &AABB, mut visit: F) -> bool
    where
        F: FnMut(u32) -> bool,
    {
        let Some(root) = self.root.as_ref() else {
            return false;
        };

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bounds().intersects(query) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &i in triangles {
                        if self.triangle_bounds[i as usize].intersects(query) && visit(i) {
                            return true;
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        false
    }

    /// Nearest triangle hit along `ray`
    pub fn raycast_first(&self, ray: &Ray) -> Option<BvhRayHit> {
        let root = self.root.as_ref()?;
        let mut best: Option<(u32, f32)> = None;

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let Some(entry) = node.bounds().intersect_ray(ray.origin, ray.direction) else {
                continue;
            };
            if best.is_some_and(|(_, t)| entry > t) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &i in triangles {
                        if let Some((t, _, _)) = self.triangles[i as usize].intersect_ray(ray) {
                            if best.map_or(true, |(_, bt)| t < bt) {
                                best = Some((i, t));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best.map(|(i, distance)| {
            let normal = self.triangles[i as usize]
                .normal()
                .map(|n| if n.dot(&ray.direction) > 0.0 { -n } else { n })
                .unwrap_or(-ray.direction);
            BvhRayHit {
                triangle: i,
                distance,
                point: ray.point_at(distance),
                normal,
            }
        })
    }

    /// Closest point on the mesh within `max_distance` of `point`
    pub fn closest_point(&self, point: Vec3, max_distance: f32) -> Option<ClosestPoint> {
        let root = self.root.as_ref()?;
        let mut best_dist_sq = max_distance * max_distance;
        let mut best = None;
        self.closest_recursive(root, point, &mut best_dist_sq, &mut best);

        best.map(|(triangle, closest)| ClosestPoint {
            triangle,
            point: closest,
            distance: best_dist_sq.sqrt(),
        })
    }

    fn closest_recursive(
        &self,
        node: &BvhNode,
        query: Vec3,
        best_dist_sq: &mut f32,
        best: &mut Option<(u32, Vec3)>,
    ) {
        let bounds_dist_sq = (node.bounds().closest_point(query) - query).magnitude_squared();
        if bounds_dist_sq > *best_dist_sq {
            return;
        }

        match node {
            BvhNode::Leaf { triangles, .. } => {
                for &i in triangles {
                    let closest = self.triangles[i as usize].closest_point(query);
                    let dist_sq = (query - closest).magnitude_squared();
                    if dist_sq <= *best_dist_sq {
                        *best_dist_sq = dist_sq;
                        *best = Some((i, closest));
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                // Visit closer child first
                let left_dist = left.bounds().distance_to_point(query);
                let right_dist = right.bounds().distance_to_point(query);
                let (near, far) = if left_dist <= right_dist { (left, right) } else { (right, left) };
                self.closest_recursive(near, query, best_dist_sq, best);
                self.closest_recursive(far, query, best_dist_sq, best);
            }
        }
    }

    /// Bounds of every triangle, `None` when empty
    pub fn bounds(&self) -> Option<AABB> {
        self.root.as_ref().map(|root| *root.bounds())
    }

    /// Depth of the deepest node (root is 0)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Bounds of every node at `depth`, plus leaves that end above it
    pub fn nodes_at_depth(&self, depth: u32) -> Vec<AABB> {
        let mut out = Vec::new();
        let Some(root) = self.root.as_ref() else {
            return out;
        };

        let mut stack = vec![(root, 0u32)];
        while let Some((node, d)) = stack.pop() {
            match node {
                BvhNode::Internal { left, right, .. } if d < depth => {
                    stack.push((right.as_ref(), d + 1));
                    stack.push((left.as_ref(), d + 1));
                }
                _ => out.push(*node.bounds()),
            }
        }
        out
    }

    /// Triangle `i`
    pub fn triangle(&self, i: u32) -> Option<&Triangle> {
        self.triangles.get(i as usize)
    }

    /// All triangles in build order
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when the hierarchy holds no triangles
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
