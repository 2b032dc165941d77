//! Fitting the light's projection tightly around a focus body.

use glam::{Mat4, Vec3, Vec4};
use scenery_math::{Aabb, Polyhedron};
use scenery_scene::DisplayKind;

/// Maps clip coordinates in `[-1, 1]` to texture coordinates in `[0, 1]`.
pub const BIAS_MATRIX: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, 0.5, 0.0, 0.0, //
    0.0, 0.0, 0.5, 0.0, //
    0.5, 0.5, 0.5, 1.0,
]);

/// Steps per unit of the quantised crop scale; reduces shimmering when the
/// camera moves.
pub const CROP_QUANTIZER: f32 = 64.0;

const MIN_RANGE: f32 = 1.0e-6;

/// Crop result for one split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropFit {
    pub crop: Mat4,
    /// `crop · light_projection`, used to render the split.
    pub projection: Mat4,
    /// World space to shadow-map texture space.
    pub lookup: Mat4,
    /// Bounds of the body in light clip space, far Z already extended.
    pub light_bounds: Aabb,
}

/// Light clip-space bounds of the body's vertices with the far plane pushed
/// out, or `None` for an empty body.
fn light_space_bounds(body: &Polyhedron, light_mvp: &Mat4, display: DisplayKind) -> Option<Aabb> {
    if body.is_empty() {
        return None;
    }
    let mut bounds = Aabb::from_points(body.verts().iter().map(|v| light_mvp.project_point3(*v)));
    bounds.max.z = match display {
        DisplayKind::Perspective => {
            let range = bounds.max.z - bounds.min.z;
            (bounds.max.z + range * 0.05).min(1.0)
        }
        DisplayKind::NonLinear => 1.0,
    };
    Some(bounds)
}

/// Crop matrix mapping `bounds` onto the unit square (X/Y) and `[0, 1]` (Z).
/// With `resolution`, the scale is quantised and the offset snapped to the
/// half-texel grid.
pub(crate) fn crop_from_bounds(bounds: &Aabb, resolution: Option<u32>) -> Mat4 {
    let size = bounds.size().max(Vec3::splat(MIN_RANGE));
    let mut scale_x = 2.0 / size.x;
    let mut scale_y = 2.0 / size.y;
    let scale_z = 1.0 / size.z;
    let offset_z = -bounds.min.z * scale_z;

    if resolution.is_some() {
        scale_x = 1.0 / (1.0 / scale_x * CROP_QUANTIZER).ceil() * CROP_QUANTIZER;
        scale_y = 1.0 / (1.0 / scale_y * CROP_QUANTIZER).ceil() * CROP_QUANTIZER;
    }

    let mut offset_x = -0.5 * (bounds.max.x + bounds.min.x) * scale_x;
    let mut offset_y = -0.5 * (bounds.max.y + bounds.min.y) * scale_y;
    if let Some(resolution) = resolution {
        let half_tex = 0.5 * resolution as f32;
        offset_x = (offset_x * half_tex).ceil() / half_tex;
        offset_y = (offset_y * half_tex).ceil() / half_tex;
    }

    Mat4::from_cols(
        Vec4::new(scale_x, 0.0, 0.0, 0.0),
        Vec4::new(0.0, scale_y, 0.0, 0.0),
        Vec4::new(0.0, 0.0, scale_z, 0.0),
        Vec4::new(offset_x, offset_y, offset_z, 1.0),
    )
}

/// Fit the light projection to `body` and record the fitted box, in world
/// space, as the body's debug box.
pub fn compute_crop_matrix(
    body: &mut Polyhedron,
    light_projection: &Mat4,
    light_view: &Mat4,
    display: DisplayKind,
    resolution: u32,
) -> Option<CropFit> {
    let light_mvp = *light_projection * *light_view;
    let bounds = light_space_bounds(body, &light_mvp, display)?;

    let inverse = light_mvp.inverse();
    body.set_debug_box(bounds.corners().map(|c| inverse.project_point3(c)));

    let crop = crop_from_bounds(&bounds, Some(resolution));
    let projection = crop * *light_projection;
    Some(CropFit {
        crop,
        projection,
        lookup: BIAS_MATRIX * projection * *light_view,
        light_bounds: bounds,
    })
}

#[cfg(test)]
mod tests {
    use scenery_math::{CameraPose, Frustum};

    use super::*;
    use crate::focus::{LightVolume, compute_focus_body, light_view};

    fn scene() -> Aabb {
        Aabb::new(Vec3::new(-50.0, -50.0, 0.0), Vec3::new(50.0, 50.0, 20.0))
    }

    fn focus_body(light: Vec3, near: f32, far: f32) -> Polyhedron {
        let mut frustum = Frustum::new();
        frustum.set_cam_internals(60.0, 1.5, near, far);
        frustum.calc_from_pose(&CameraPose {
            eye: Vec3::new(0.0, 0.0, 1.7),
            direction: Vec3::new(1.0, 0.3, -0.1),
            up: Vec3::Z,
        });
        let mut body = Polyhedron::new();
        compute_focus_body(&mut body, &frustum, light, &scene());
        body
    }

    #[test]
    fn test_unquantised_crop_contains_body() {
        let light = Vec3::new(0.4, -0.3, 0.7).normalize();
        let proj = LightVolume::from_scene(light, &scene()).projection();
        let view = light_view(light);
        for (near, far) in [(0.3, 10.0), (10.0, 40.0), (40.0, 120.0)] {
            let body = focus_body(light, near, far);
            let mvp = proj * view;
            let bounds = light_space_bounds(&body, &mvp, DisplayKind::Perspective).unwrap();
            let crop = crop_from_bounds(&bounds, None);
            for v in body.verts() {
                let p = (crop * mvp).project_point3(*v);
                assert!(p.x.abs() <= 1.0 + 1e-4 && p.y.abs() <= 1.0 + 1e-4, "{p}");
                assert!((-1e-4..=1.0 + 1e-4).contains(&p.z), "{p}");
            }
        }
    }

    #[test]
    fn test_quantised_crop_within_one_texel() {
        let light = Vec3::new(-0.2, 0.5, 0.6).normalize();
        let proj = LightVolume::from_scene(light, &scene()).projection();
        let view = light_view(light);
        let mut body = focus_body(light, 0.3, 30.0);
        let fit = compute_crop_matrix(&mut body, &proj, &view, DisplayKind::Perspective, 1024).unwrap();
        let slack = 2.0 / 1024.0 + 1e-4;
        for v in body.verts() {
            let p = (fit.projection * view).project_point3(*v);
            assert!(p.x.abs() <= 1.0 + slack && p.y.abs() <= 1.0 + slack, "{p}");
        }
        assert!(body.debug_box().is_some());
    }

    #[test]
    fn test_lookup_maps_into_unit_cube() {
        let light = Vec3::new(0.1, 0.2, 0.9).normalize();
        let proj = LightVolume::from_scene(light, &scene()).projection();
        let view = light_view(light);
        let mut body = focus_body(light, 0.3, 20.0);
        let fit = compute_crop_matrix(&mut body, &proj, &view, DisplayKind::Perspective, 2048).unwrap();
        for v in body.verts() {
            let t = fit.lookup.project_point3(*v);
            assert!(t.x >= -1e-3 && t.x <= 1.0 + 1e-3, "{t}");
            assert!(t.y >= -1e-3 && t.y <= 1.0 + 1e-3, "{t}");
        }
    }

    #[test]
    fn test_far_plane_extension() {
        let light = Vec3::new(0.3, 0.3, 0.8).normalize();
        let proj = LightVolume::from_scene(light, &scene()).projection();
        let view = light_view(light);
        let body = focus_body(light, 0.3, 15.0);
        let mvp = proj * view;
        let persp = light_space_bounds(&body, &mvp, DisplayKind::Perspective).unwrap();
        let fisheye = light_space_bounds(&body, &mvp, DisplayKind::NonLinear).unwrap();
        assert_eq!(fisheye.max.z, 1.0);
        assert!(persp.max.z <= 1.0);
        assert_eq!(persp.min, fisheye.min);
    }

    #[test]
    fn test_quantised_scale_never_grows() {
        let bounds = Aabb::new(Vec3::new(-0.31, -0.7, -0.5), Vec3::new(0.44, 0.1, 0.5));
        let exact = crop_from_bounds(&bounds, None);
        let quantised = crop_from_bounds(&bounds, Some(1024));
        assert!(quantised.x_axis.x <= exact.x_axis.x);
        assert!(quantised.y_axis.y <= exact.y_axis.y);
        assert_eq!(quantised.z_axis.z, exact.z_axis.z);
    }

    #[test]
    fn test_empty_body_has_no_crop() {
        let mut body = Polyhedron::new();
        let fit = compute_crop_matrix(
            &mut body,
            &Mat4::IDENTITY,
            &Mat4::IDENTITY,
            DisplayKind::Perspective,
            512,
        );
        assert!(fit.is_none());
    }
}
