use glam::Vec3;

/// An oriented plane `normal · p + distance = 0`.
///
/// Points with a positive signed distance lie on the inner side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal pointing toward the inside of the bounded region.
    pub normal: Vec3,
    /// Signed offset along the normal.
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given (not necessarily unit) normal.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Plane through three points, normal following the right-hand rule on
    /// `a -> b -> c`.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_point_normal(a, (b - a).cross(c - a))
    }

    /// Plane through three points whose normal faces `interior`.
    pub fn from_points_facing(a: Vec3, b: Vec3, c: Vec3, interior: Vec3) -> Self {
        let plane = Self::from_points(a, b, c);
        if plane.signed_distance(interior) < 0.0 {
            plane.flipped()
        } else {
            plane
        }
    }

    /// The same plane with the opposite orientation.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Signed distance from the plane, positive on the inner side.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_distance_sign() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, 0.0, 2.0), Vec3::Z);
        assert!((plane.signed_distance(Vec3::new(5.0, 1.0, 3.0)) - 1.0).abs() < 1e-6);
        assert!((plane.signed_distance(Vec3::ZERO) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_points_facing_flips_toward_interior() {
        let plane = Plane::from_points_facing(
            Vec3::ZERO,
            Vec3::Y,
            Vec3::X,
            Vec3::new(0.2, 0.2, 1.0),
        );
        assert!(plane.normal.z > 0.99);
    }
}
