use glam::{Mat4, Vec3};

use crate::Plane;

/// Corner of an [`Aabb`], encoded by axis selection bits: bit 0 picks the
/// max x, bit 1 the max y, bit 2 the max z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Corner {
    MinMinMin = 0,
    MaxMinMin = 1,
    MinMaxMin = 2,
    MaxMaxMin = 3,
    MinMinMax = 4,
    MaxMinMax = 5,
    MinMaxMax = 6,
    MaxMaxMax = 7,
}

impl Corner {
    /// All eight corners in bit-pattern order.
    pub const ALL: [Corner; 8] = [
        Corner::MinMinMin,
        Corner::MaxMinMin,
        Corner::MinMaxMin,
        Corner::MaxMaxMin,
        Corner::MinMinMax,
        Corner::MaxMinMax,
        Corner::MinMaxMax,
        Corner::MaxMaxMax,
    ];

    /// Axis selection bits of this corner.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Axis-aligned bounding box in scene (model world) space.
///
/// An empty box has `min > max` on every axis; it is what [`Aabb::empty`]
/// returns and what growing starts from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create a box from two opposite corners, sorting components so that
    /// `min <= max` on every axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The empty box, neutral element of [`Aabb::union`].
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Smallest box enclosing every point; empty for no points.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand_to_include(p);
        }
        aabb
    }

    /// Returns true if no point is contained.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `p`.
    pub fn expand_to_include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half size along each axis.
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// The corner selected by `corner`'s axis bits.
    pub fn corner(&self, corner: Corner) -> Vec3 {
        let bits = corner.bits();
        Vec3::new(
            if bits & 1 != 0 { self.max.x } else { self.min.x },
            if bits & 2 != 0 { self.max.y } else { self.min.y },
            if bits & 4 != 0 { self.max.z } else { self.min.z },
        )
    }

    /// All eight corners in bit-pattern order.
    pub fn corners(&self) -> [Vec3; 8] {
        Corner::ALL.map(|c| self.corner(c))
    }

    /// The six bounding half-spaces with inward normals, ordered
    /// -x, +x, -y, +y, -z, +z faces.
    pub fn planes(&self) -> [Plane; 6] {
        [
            Plane::from_point_normal(self.min, Vec3::X),
            Plane::from_point_normal(self.max, Vec3::NEG_X),
            Plane::from_point_normal(self.min, Vec3::Y),
            Plane::from_point_normal(self.max, Vec3::NEG_Y),
            Plane::from_point_normal(self.min, Vec3::Z),
            Plane::from_point_normal(self.max, Vec3::NEG_Z),
        ]
    }

    /// Returns true if `p` lies inside or within `epsilon` of the boundary.
    pub fn contains_point(&self, p: Vec3, epsilon: f32) -> bool {
        p.cmpge(self.min - Vec3::splat(epsilon)).all() && p.cmple(self.max + Vec3::splat(epsilon)).all()
    }

    /// Axis-aligned box enclosing this box after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::from_points(self.corners().map(|c| matrix.transform_point3(c)))
    }

    /// Point where the ray `origin + t * direction` (t >= 0) leaves the box.
    ///
    /// `origin` is expected to lie inside the box. Returns `None` for a zero
    /// direction or when the exit lies behind the origin.
    pub fn ray_exit(&self, origin: Vec3, direction: Vec3) -> Option<Vec3> {
        let mut t_exit = f32::INFINITY;
        for axis in 0..3 {
            let d = direction[axis];
            if d == 0.0 {
                continue;
            }
            let bound = if d > 0.0 { self.max[axis] } else { self.min[axis] };
            t_exit = t_exit.min((bound - origin[axis]) / d);
        }
        if !t_exit.is_finite() || t_exit < 0.0 {
            return None;
        }
        Some(origin + direction * t_exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_new_sorts_components() {
        let aabb = Aabb::new(Vec3::new(3.0, -1.0, 2.0), Vec3::new(1.0, 4.0, -2.0));
        assert_eq!(aabb.min, Vec3::new(1.0, -1.0, -2.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 4.0, 2.0));
    }

    #[test]
    fn test_corner_bit_pattern() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.corner(Corner::MinMinMin), aabb.min);
        assert_eq!(aabb.corner(Corner::MaxMaxMax), aabb.max);
        assert_eq!(aabb.corner(Corner::MaxMinMin), Vec3::new(1.0, -2.0, -3.0));
        assert_eq!(aabb.corner(Corner::MinMaxMin), Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(aabb.corner(Corner::MinMinMax), Vec3::new(-1.0, -2.0, 3.0));
        for (i, c) in aabb.corners().iter().enumerate() {
            assert_eq!(*c, aabb.corner(Corner::ALL[i]));
        }
    }

    #[test]
    fn test_planes_face_inward() {
        let aabb = unit();
        let center = aabb.center();
        for plane in aabb.planes() {
            assert!(plane.signed_distance(center) > 0.0);
            assert!(plane.signed_distance(Vec3::splat(5.0)).min(plane.signed_distance(Vec3::splat(-5.0))) < 0.0);
        }
    }

    #[test]
    fn test_contains_point_with_tolerance() {
        let aabb = unit();
        assert!(aabb.contains_point(Vec3::splat(0.5), 0.0));
        assert!(aabb.contains_point(Vec3::new(1.0, 0.0, 0.5), 0.0));
        assert!(!aabb.contains_point(Vec3::new(1.01, 0.5, 0.5), 0.0));
        assert!(aabb.contains_point(Vec3::new(1.01, 0.5, 0.5), 0.02));
    }

    #[test]
    fn test_empty_and_from_points() {
        assert!(Aabb::empty().is_empty());
        let aabb = Aabb::from_points([Vec3::new(1.0, 5.0, -1.0), Vec3::new(-2.0, 0.0, 3.0)]);
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, Vec3::new(-2.0, 0.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(Aabb::empty().union(&aabb), aabb);
    }

    #[test]
    fn test_ray_exit_hits_far_face() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let exit = aabb.ray_exit(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0)).unwrap();
        assert!((exit - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        let exit = aabb.ray_exit(Vec3::new(0.5, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)).unwrap();
        assert!((exit - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-6);
        assert!(aabb.ray_exit(Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_transformed_translation() {
        let moved = unit().transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(11.0, 1.0, 1.0));
    }
}
