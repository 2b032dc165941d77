//! Convex polyhedra as polygon soups, used to build focused shadow volumes.
//!
//! A body is seeded from a view frustum, clipped against the scene bounds and
//! then extruded toward the light so every potential shadow caster between the
//! visible region and the light ends up inside it.

use glam::Vec3;

use crate::{Aabb, Frustum, MERGE_EPSILON, Plane};

/// Planar convex polygon stored as an ordered vertex loop.
pub type Polygon = Vec<Vec3>;

/// Tolerance used when classifying a vertex against a clip plane.
const CLIP_EPSILON: f32 = 1.0e-5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyhedron {
    polygons: Vec<Polygon>,
    verts: Vec<Vec3>,
    debug_box: Option<[Vec3; 8]>,
}

impl Polyhedron {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every polygon, vertex and the debug box.
    pub fn clear(&mut self) {
        self.polygons.clear();
        self.verts.clear();
        self.debug_box = None;
    }

    /// Seed the body with the six faces of `frustum`.
    pub fn add(&mut self, frustum: &Frustum) {
        for face in frustum.faces() {
            self.add_polygon(face.to_vec());
        }
    }

    /// Append a convex polygon; degenerate polygons are ignored.
    pub fn add_polygon(&mut self, polygon: Polygon) {
        if polygon.len() < 3 {
            return;
        }
        for v in &polygon {
            push_unique(&mut self.verts, *v);
        }
        self.polygons.push(polygon);
    }

    /// Clip the body against the six half-spaces of `aabb`.
    ///
    /// Each cut is closed with a cap polygon so the body stays watertight.
    /// An empty result means the regions do not overlap.
    pub fn intersect(&mut self, aabb: &Aabb) {
        if aabb.is_empty() {
            self.polygons.clear();
            self.verts.clear();
            return;
        }
        for plane in aabb.planes() {
            self.clip(&plane);
            if self.polygons.is_empty() {
                break;
            }
        }
        self.rebuild_verts();
    }

    /// Clip the body against a single half-space, keeping the inner side.
    pub fn clip(&mut self, plane: &Plane) {
        let mut clipped = Vec::with_capacity(self.polygons.len() + 1);
        let mut cap_points = Vec::new();

        for polygon in &self.polygons {
            let out = clip_polygon(polygon, plane, &mut cap_points);
            if out.len() >= 3 {
                clipped.push(out);
            }
        }

        if !clipped.is_empty() {
            let mut unique = Vec::with_capacity(cap_points.len());
            for p in cap_points {
                push_unique(&mut unique, p);
            }
            if unique.len() >= 3 {
                clipped.push(order_around_normal(unique, plane.normal));
            }
        }

        self.polygons = clipped;
    }

    /// For every current vertex, add the point where the ray along
    /// `direction` leaves `aabb`.
    pub fn extrude(&mut self, direction: Vec3, aabb: &Aabb) {
        if aabb.is_empty() || direction.length_squared() == 0.0 {
            return;
        }
        let originals = self.verts.clone();
        for v in originals {
            if let Some(exit) = aabb.ray_exit(v, direction) {
                push_unique(&mut self.verts, exit);
            }
        }
    }

    /// Merge vertices closer than [`MERGE_EPSILON`].
    pub fn make_unique_verts(&mut self) {
        let mut unique = Vec::with_capacity(self.verts.len());
        for v in self.verts.drain(..) {
            push_unique(&mut unique, v);
        }
        self.verts = unique;
    }

    pub fn verts(&self) -> &[Vec3] {
        &self.verts
    }

    pub fn vert_count(&self) -> usize {
        self.verts.len()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Store an eight-corner box (in [`crate::Corner`] bit order) for debug
    /// visualization.
    pub fn set_debug_box(&mut self, corners: [Vec3; 8]) {
        self.debug_box = Some(corners);
    }

    pub fn debug_box(&self) -> Option<&[Vec3; 8]> {
        self.debug_box.as_ref()
    }

    fn rebuild_verts(&mut self) {
        self.verts.clear();
        for polygon in &self.polygons {
            for v in polygon {
                push_unique(&mut self.verts, *v);
            }
        }
    }
}

fn push_unique(verts: &mut Vec<Vec3>, v: Vec3) {
    if !verts.iter().any(|u| u.distance_squared(v) <= MERGE_EPSILON * MERGE_EPSILON) {
        verts.push(v);
    }
}

/// Sutherland-Hodgman clip of one polygon; points created on the plane are
/// collected into `cap_points`.
fn clip_polygon(polygon: &[Vec3], plane: &Plane, cap_points: &mut Vec<Vec3>) -> Polygon {
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let da = plane.signed_distance(a);
        let db = plane.signed_distance(b);
        let a_inside = da >= -CLIP_EPSILON;
        let b_inside = db >= -CLIP_EPSILON;

        if a_inside {
            out.push(a);
            if da <= CLIP_EPSILON {
                cap_points.push(a);
            }
        }
        if a_inside != b_inside && (da - db).abs() > f32::EPSILON {
            let t = da / (da - db);
            let p = a + (b - a) * t;
            out.push(p);
            cap_points.push(p);
        }
    }
    out
}

/// Order coplanar points into a convex loop around their centroid.
fn order_around_normal(points: Vec<Vec3>, normal: Vec3) -> Polygon {
    let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    let mut keyed: Vec<(f32, Vec3)> = points
        .into_iter()
        .map(|p| {
            let d = p - centroid;
            (d.dot(v).atan2(d.dot(u)), p)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum_along_x(near: f32, far: f32) -> Frustum {
        let mut frustum = Frustum::new();
        frustum.set_cam_internals(60.0, 1.5, near, far);
        frustum.calc_frustum(Vec3::ZERO, Vec3::X, Vec3::Z);
        frustum
    }

    #[test]
    fn test_add_frustum_seeds_eight_verts() {
        let mut body = Polyhedron::new();
        body.add(&frustum_along_x(1.0, 50.0));
        assert_eq!(body.vert_count(), 8);
        assert_eq!(body.polygons().len(), 6);
        assert!(!body.is_empty());
    }

    #[test]
    fn test_intersect_stays_inside_both_regions() {
        let frustum = frustum_along_x(1.0, 50.0);
        let aabb = Aabb::new(Vec3::new(-5.0, -4.0, -2.0), Vec3::new(20.0, 30.0, 3.0));
        let mut body = Polyhedron::new();
        body.add(&frustum);
        body.intersect(&aabb);

        assert!(!body.is_empty());
        for v in body.verts() {
            assert!(aabb.contains_point(*v, 1e-3), "{v} outside box");
            assert!(frustum.contains_point(*v, 1e-3), "{v} outside frustum");
        }
        // The cut reaches the box's far x face.
        assert!(body.verts().iter().any(|v| (v.x - 20.0).abs() < 1e-3));
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let mut body = Polyhedron::new();
        body.add(&frustum_along_x(1.0, 50.0));
        body.intersect(&Aabb::new(Vec3::new(-30.0, -1.0, -1.0), Vec3::new(-20.0, 1.0, 1.0)));
        assert!(body.is_empty());
        assert_eq!(body.vert_count(), 0);
    }

    #[test]
    fn test_intersect_box_fully_inside_yields_box() {
        let mut body = Polyhedron::new();
        body.add(&frustum_along_x(1.0, 50.0));
        let aabb = Aabb::new(Vec3::new(10.0, -1.0, -1.0), Vec3::new(12.0, 1.0, 1.0));
        body.intersect(&aabb);
        assert_eq!(body.vert_count(), 8);
        for corner in aabb.corners() {
            assert!(body.verts().iter().any(|v| v.distance(corner) < 1e-3));
        }
    }

    #[test]
    fn test_extrude_reaches_box_boundary() {
        let aabb = Aabb::new(Vec3::new(-10.0, -10.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        let mut body = Polyhedron::new();
        body.add(&frustum_along_x(1.0, 5.0));
        body.intersect(&aabb);
        let before = body.vert_count();
        body.extrude(Vec3::Z, &aabb);
        assert!(body.vert_count() > before);
        assert!(body.verts().iter().any(|v| (v.z - 10.0).abs() < 1e-4));
        for v in body.verts() {
            assert!(aabb.contains_point(*v, 1e-3));
        }
    }

    #[test]
    fn test_make_unique_verts_merges_close_points() {
        let mut body = Polyhedron::new();
        body.verts = vec![Vec3::ZERO, Vec3::splat(1.0e-6), Vec3::ONE];
        body.make_unique_verts();
        assert_eq!(body.vert_count(), 2);
    }

    #[test]
    fn test_intersect_is_deterministic() {
        let frustum = frustum_along_x(0.5, 80.0);
        let aabb = Aabb::new(Vec3::new(-3.0, -7.0, -1.0), Vec3::new(40.0, 9.0, 6.0));
        let run = || {
            let mut body = Polyhedron::new();
            body.add(&frustum);
            body.intersect(&aabb);
            body.extrude(Vec3::new(0.3, -0.2, 0.9), &aabb);
            body
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut body = Polyhedron::new();
        body.add(&frustum_along_x(1.0, 5.0));
        body.set_debug_box([Vec3::ZERO; 8]);
        body.clear();
        assert!(body.is_empty());
        assert!(body.polygons().is_empty());
        assert!(body.debug_box().is_none());
    }
}
