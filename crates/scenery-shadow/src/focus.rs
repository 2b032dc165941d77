//! Light-space volume and per-split focus bodies.

use glam::{Mat4, Vec3};
use scenery_math::{Aabb, Frustum, Polyhedron};

/// World up for the light's view, switching to +Y when the light is
/// (nearly) vertical.
pub fn light_up(light_direction: Vec3) -> Vec3 {
    if light_direction.normalize_or(Vec3::Z).z.abs() > 0.999 {
        Vec3::Y
    } else {
        Vec3::Z
    }
}

/// View matrix looking from the light direction towards the origin.
pub fn light_view(light_direction: Vec3) -> Mat4 {
    Mat4::look_at_rh(light_direction, Vec3::ZERO, light_up(light_direction))
}

/// Orthographic volume enclosing the whole scene as seen from the light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightVolume {
    /// Half-size of the square cross section.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl LightVolume {
    pub fn from_scene(light_direction: Vec3, scene: &Aabb) -> Self {
        let eye = light_direction;
        let forward = (-eye).normalize_or(Vec3::NEG_Z);
        let left = forward
            .cross(light_up(light_direction))
            .normalize_or(Vec3::X);
        // Same basis as `light_view`.
        let up = left.cross(forward);

        let mut extent = 0.0f32;
        let mut near = f32::MAX;
        let mut far = f32::MIN;
        for corner in scene.corners() {
            let to_corner = corner - eye;
            let dist = to_corner.dot(forward);
            near = near.min(dist);
            far = far.max(dist);
            extent = extent
                .max(to_corner.dot(left).abs())
                .max(to_corner.dot(up).abs());
        }
        Self { extent, near, far }
    }

    pub fn projection(&self) -> Mat4 {
        let e = self.extent;
        Mat4::orthographic_rh_gl(-e, e, -e, e, self.near, self.far)
    }
}

/// Fill `body` with the region that can cast or receive shadows inside one
/// split: the split frustum clipped to the scene, extruded towards the
/// light.
pub fn compute_focus_body(
    body: &mut Polyhedron,
    split_frustum: &Frustum,
    light_direction: Vec3,
    scene: &Aabb,
) {
    body.add(split_frustum);
    body.intersect(scene);
    body.extrude(light_direction, scene);
}
