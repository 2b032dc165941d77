//! Perspective view frustum built from camera internals and a camera pose.
//!
//! Unlike a culling frustum extracted from a view-projection matrix, this one
//! keeps its eight corner points, which the shadow fitter clips against the
//! scene bounds.

use glam::Vec3;

use crate::Plane;

/// Corner of a [`Frustum`]; near plane first, counter-clockwise from bottom
/// left when looking along the view direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrustumCorner {
    NearBottomLeft = 0,
    NearBottomRight = 1,
    NearTopRight = 2,
    NearTopLeft = 3,
    FarBottomLeft = 4,
    FarBottomRight = 5,
    FarTopRight = 6,
    FarTopLeft = 7,
}

/// Camera position and orientation in scene space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            direction: Vec3::X,
            up: Vec3::Z,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    corners: [Vec3; 8],
    /// Inward planes: near, far, left, right, bottom, top.
    planes: [Plane; 6],
    drawing_corners: Option<[Vec3; 8]>,
}

impl Default for Frustum {
    fn default() -> Self {
        Self {
            fov: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            corners: [Vec3::ZERO; 8],
            planes: [Plane::from_point_normal(Vec3::ZERO, Vec3::Z); 6],
            drawing_corners: None,
        }
    }
}

impl Frustum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the camera internals. `fov_deg` is the vertical field of view.
    pub fn set_cam_internals(&mut self, fov_deg: f32, aspect: f32, near: f32, far: f32) {
        self.fov = fov_deg.to_radians();
        self.aspect = aspect;
        self.near = near;
        self.far = far;
    }

    /// Recompute corners and planes for the given pose.
    pub fn calc_frustum(&mut self, eye: Vec3, view_dir: Vec3, view_up: Vec3) {
        let forward = view_dir.normalize_or(Vec3::X);
        let mut right = forward.cross(view_up);
        if right.length_squared() < 1.0e-12 {
            right = forward.any_orthonormal_vector();
        }
        let right = right.normalize();
        let up = right.cross(forward);

        let tang = (self.fov * 0.5).tan();
        let near_h = self.near * tang;
        let near_w = near_h * self.aspect;
        let far_h = self.far * tang;
        let far_w = far_h * self.aspect;

        let near_center = eye + forward * self.near;
        let far_center = eye + forward * self.far;

        self.corners = [
            near_center - up * near_h - right * near_w,
            near_center - up * near_h + right * near_w,
            near_center + up * near_h + right * near_w,
            near_center + up * near_h - right * near_w,
            far_center - up * far_h - right * far_w,
            far_center - up * far_h + right * far_w,
            far_center + up * far_h + right * far_w,
            far_center + up * far_h - right * far_w,
        ];

        let interior = (near_center + far_center) * 0.5;
        let c = &self.corners;
        self.planes = [
            Plane::from_point_normal(near_center, forward),
            Plane::from_point_normal(far_center, -forward),
            Plane::from_points_facing(c[0], c[4], c[7], interior),
            Plane::from_points_facing(c[1], c[2], c[6], interior),
            Plane::from_points_facing(c[0], c[1], c[5], interior),
            Plane::from_points_facing(c[3], c[7], c[6], interior),
        ];
    }

    /// Shorthand for [`Frustum::calc_frustum`] with a [`CameraPose`].
    pub fn calc_from_pose(&mut self, pose: &CameraPose) {
        self.calc_frustum(pose.eye, pose.direction, pose.up);
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    pub fn corner(&self, corner: FrustumCorner) -> Vec3 {
        self.corners[corner as usize]
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// The six quadrilateral faces as corner loops: near, far, left, right,
    /// bottom, top.
    pub fn faces(&self) -> [[Vec3; 4]; 6] {
        let c = &self.corners;
        [
            [c[0], c[1], c[2], c[3]],
            [c[4], c[7], c[6], c[5]],
            [c[0], c[3], c[7], c[4]],
            [c[1], c[5], c[6], c[2]],
            [c[0], c[4], c[5], c[1]],
            [c[3], c[2], c[6], c[7]],
        ]
    }

    /// Returns true if `p` is inside or within `epsilon` of every plane.
    pub fn contains_point(&self, p: Vec3, epsilon: f32) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(p) >= -epsilon)
    }

    /// Keep a copy of the current corners for debug drawing while frozen.
    pub fn save_drawing_corners(&mut self) {
        self.drawing_corners = Some(self.corners);
    }

    pub fn reset_drawing_corners(&mut self) {
        self.drawing_corners = None;
    }

    pub fn drawing_corners(&self) -> Option<&[Vec3; 8]> {
        self.drawing_corners.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_x() -> Frustum {
        let mut frustum = Frustum::new();
        frustum.set_cam_internals(90.0, 1.0, 1.0, 10.0);
        frustum.calc_frustum(Vec3::ZERO, Vec3::X, Vec3::Z);
        frustum
    }

    #[test]
    fn test_corner_layout() {
        let frustum = looking_down_x();
        // 90 degree fov: half height equals distance.
        let nbl = frustum.corner(FrustumCorner::NearBottomLeft);
        assert!((nbl - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-5);
        let ftr = frustum.corner(FrustumCorner::FarTopRight);
        assert!((ftr - Vec3::new(10.0, -10.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn test_planes_contain_interior() {
        let frustum = looking_down_x();
        assert!(frustum.contains_point(Vec3::new(5.0, 0.0, 0.0), 0.0));
        assert!(!frustum.contains_point(Vec3::new(0.5, 0.0, 0.0), 0.0));
        assert!(!frustum.contains_point(Vec3::new(11.0, 0.0, 0.0), 0.0));
        assert!(!frustum.contains_point(Vec3::new(5.0, 6.0, 0.0), 0.0));
        assert!(!frustum.contains_point(Vec3::new(5.0, 0.0, -6.0), 0.0));
        for corner in frustum.corners() {
            assert!(frustum.contains_point(*corner, 1e-4));
        }
    }

    #[test]
    fn test_plane_normals_are_unit() {
        let frustum = looking_down_x();
        for plane in frustum.planes() {
            assert!((plane.normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_up_parallel_to_view_is_handled() {
        let mut frustum = Frustum::new();
        frustum.set_cam_internals(60.0, 1.5, 0.5, 5.0);
        frustum.calc_frustum(Vec3::ZERO, Vec3::Z, Vec3::Z);
        assert!(frustum.corners().iter().all(|c| c.is_finite()));
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, 2.0), 0.0));
    }

    #[test]
    fn test_drawing_corners_survive_recompute() {
        let mut frustum = looking_down_x();
        frustum.save_drawing_corners();
        let saved = *frustum.drawing_corners().unwrap();
        frustum.calc_frustum(Vec3::ONE, Vec3::Y, Vec3::Z);
        assert_eq!(*frustum.drawing_corners().unwrap(), saved);
        assert_ne!(*frustum.corners(), saved);
        frustum.reset_drawing_corners();
        assert!(frustum.drawing_corners().is_none());
    }
}
