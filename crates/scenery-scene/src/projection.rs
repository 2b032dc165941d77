//! Sky projections mapping view directions onto the screen.
//!
//! The host owns the real projector. A perspective projection lets the scene
//! be drawn directly; every other kind is sampled through a cubemap.

use glam::{Mat4, Vec3, Vec4};

/// Screen rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Square viewport anchored at the origin.
    pub fn square(size: u32) -> Self {
        Self::new(0, 0, size, size)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Whether the current projection is a plain perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayKind {
    Perspective,
    NonLinear,
}

pub trait SkyProjection {
    fn kind(&self) -> DisplayKind;

    /// Vertical field of view in degrees.
    fn fov_degrees(&self) -> f32;

    fn viewport(&self) -> Viewport;

    /// Project a horizontal-frame direction into window coordinates, with
    /// depth in `[0, 1]` as z. `None` when the direction is outside the
    /// projection's domain.
    fn project(&self, direction: Vec3) -> Option<Vec3>;

    /// Linear approximation of the view rotation (horizontal frame to eye
    /// space).
    fn approximate_linear_transform(&self) -> Mat4;

    /// Matrix taking window coordinates from [`SkyProjection::project`] into
    /// clip space.
    fn screen_matrix(&self) -> Mat4 {
        let vp = self.viewport();
        let w = vp.width.max(1) as f32;
        let h = vp.height.max(1) as f32;
        Mat4::from_cols(
            Vec4::new(2.0 / w, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / h, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 2.0, 0.0),
            Vec4::new(-2.0 * vp.x as f32 / w - 1.0, -2.0 * vp.y as f32 / h - 1.0, -1.0, 1.0),
        )
    }

    fn aspect(&self) -> f32 {
        self.viewport().aspect()
    }
}

fn view_rotation(direction: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_to_rh(Vec3::ZERO, direction, up)
}

fn to_window(viewport: &Viewport, ndc_x: f32, ndc_y: f32, depth: f32) -> Vec3 {
    Vec3::new(
        viewport.x as f32 + (ndc_x + 1.0) * 0.5 * viewport.width as f32,
        viewport.y as f32 + (ndc_y + 1.0) * 0.5 * viewport.height as f32,
        depth,
    )
}

/// Rectilinear projection.
#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveProjection {
    pub view_direction: Vec3,
    pub view_up: Vec3,
    pub fov_deg: f32,
    pub viewport: Viewport,
}

impl PerspectiveProjection {
    const NEAR: f32 = 0.001;
    const FAR: f32 = 10.0;

    pub fn new(view_direction: Vec3, fov_deg: f32, viewport: Viewport) -> Self {
        Self {
            view_direction,
            view_up: Vec3::Z,
            fov_deg,
            viewport,
        }
    }
}

impl SkyProjection for PerspectiveProjection {
    fn kind(&self) -> DisplayKind {
        DisplayKind::Perspective
    }

    fn fov_degrees(&self) -> f32 {
        self.fov_deg
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn project(&self, direction: Vec3) -> Option<Vec3> {
        let eye = self.approximate_linear_transform().transform_vector3(direction);
        let proj = Mat4::perspective_rh_gl(
            self.fov_deg.to_radians(),
            self.viewport.aspect(),
            Self::NEAR,
            Self::FAR,
        );
        let clip = proj * eye.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(to_window(&self.viewport, ndc.x, ndc.y, (ndc.z + 1.0) * 0.5))
    }

    fn approximate_linear_transform(&self) -> Mat4 {
        view_rotation(self.view_direction, self.view_up)
    }
}

/// Conformal fisheye projection, `r = 2 tan(theta / 2)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StereographicProjection {
    pub view_direction: Vec3,
    pub view_up: Vec3,
    pub fov_deg: f32,
    pub viewport: Viewport,
}

impl StereographicProjection {
    pub fn new(view_direction: Vec3, fov_deg: f32, viewport: Viewport) -> Self {
        Self {
            view_direction,
            view_up: Vec3::Z,
            fov_deg,
            viewport,
        }
    }
}

impl SkyProjection for StereographicProjection {
    fn kind(&self) -> DisplayKind {
        DisplayKind::NonLinear
    }

    fn fov_degrees(&self) -> f32 {
        self.fov_deg
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn project(&self, direction: Vec3) -> Option<Vec3> {
        let v = self
            .approximate_linear_transform()
            .transform_vector3(direction)
            .normalize_or_zero();
        let cos_theta = -v.z;
        if v == Vec3::ZERO || cos_theta <= -0.9999 {
            return None;
        }
        let r = 2.0 * ((1.0 - cos_theta) / (1.0 + cos_theta)).max(0.0).sqrt();
        let r_edge = 2.0 * (self.fov_deg.to_radians() * 0.25).tan();
        let planar = glam::Vec2::new(v.x, v.y).normalize_or_zero() * (r / r_edge);
        let theta = cos_theta.clamp(-1.0, 1.0).acos();
        Some(to_window(
            &self.viewport,
            planar.x / self.viewport.aspect(),
            planar.y,
            theta / std::f32::consts::PI,
        ))
    }

    fn approximate_linear_transform(&self) -> Mat4 {
        view_rotation(self.view_direction, self.view_up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(0, 0, 800, 600)
    }

    #[test]
    fn test_perspective_centers_view_direction() {
        let proj = PerspectiveProjection::new(Vec3::X, 60.0, viewport());
        let p = proj.project(Vec3::X).unwrap();
        assert!((p.x - 400.0).abs() < 1e-3);
        assert!((p.y - 300.0).abs() < 1e-3);
        assert!(p.z > 0.0 && p.z < 1.0);
        assert!(proj.project(Vec3::NEG_X).is_none());
    }

    #[test]
    fn test_perspective_up_is_screen_up() {
        let proj = PerspectiveProjection::new(Vec3::X, 60.0, viewport());
        let p = proj.project(Vec3::new(1.0, 0.0, 0.2)).unwrap();
        assert!(p.y > 300.0);
    }

    #[test]
    fn test_stereographic_covers_wide_angles() {
        let proj = StereographicProjection::new(Vec3::X, 180.0, viewport());
        assert_eq!(proj.kind(), DisplayKind::NonLinear);
        let center = proj.project(Vec3::X).unwrap();
        assert!((center.x - 400.0).abs() < 1e-3);
        // 90 degrees off axis lands on the vertical edge for a 180 degree fov.
        let top = proj.project(Vec3::Z).unwrap();
        assert!((top.y - 600.0).abs() < 1e-2);
        let side = proj.project(Vec3::Y).unwrap();
        assert!(side.x.is_finite());
        assert!(proj.project(Vec3::NEG_X).is_none());
    }

    #[test]
    fn test_screen_matrix_maps_viewport_corners() {
        let proj = PerspectiveProjection::new(Vec3::X, 60.0, Viewport::new(10, 20, 200, 100));
        let m = proj.screen_matrix();
        let lo = m.project_point3(Vec3::new(10.0, 20.0, 0.0));
        let hi = m.project_point3(Vec3::new(210.0, 120.0, 1.0));
        assert!((lo - Vec3::new(-1.0, -1.0, -1.0)).length() < 1e-5);
        assert!((hi - Vec3::new(1.0, 1.0, 1.0)).length() < 1e-5);
    }
}
