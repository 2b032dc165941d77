//! Splitting the shadowed part of the view frustum into cascades.
//!
//! Split boundaries blend a logarithmic and a uniform distribution; each
//! split's far plane reaches slightly into the next split so that lookups
//! near a boundary never fall between two maps.

use glam::{Mat4, Vec3, Vec4};
use scenery_math::{Aabb, CameraPose, Frustum, Polyhedron};

/// Factor by which a split's far plane extends past the next split's near.
pub const SPLIT_OVERLAP: f32 = 1.005;

/// View-depth range covered by one cascade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitRange {
    pub near: f32,
    pub far: f32,
}

/// Split `[near, far]` into `count` ranges. `weight` 1 is fully logarithmic,
/// 0 fully uniform.
pub fn compute_splits(near: f32, far: f32, count: usize, weight: f32) -> Vec<SplitRange> {
    let count = count.max(1);
    let ratio = far / near;
    let range = far - near;

    let mut splits = vec![SplitRange { near, far }; count];
    for i in 1..count {
        let s = i as f32 / count as f32;
        let z = weight * (near * ratio.powf(s)) + (1.0 - weight) * (near + range * s);
        splits[i].near = z;
        splits[i - 1].far = z * SPLIT_OVERLAP;
    }
    splits[0].near = near;
    splits[count - 1].far = far;
    splits
}

/// Split weight picked from the scene's horizontal extent: larger scenes
/// favour the logarithmic distribution.
pub fn auto_split_weight(scene: &Aabb) -> f32 {
    let extent = scene.max.x.max(scene.max.y);
    if extent <= 100.0 {
        0.5
    } else if extent <= 200.0 {
        0.6
    } else if extent <= 400.0 {
        0.7
    } else {
        0.99
    }
}

/// An explicit weight of zero or more wins over the automatic one.
pub fn resolve_split_weight(override_weight: Option<f32>, scene: &Aabb) -> f32 {
    match override_weight {
        Some(w) if w >= 0.0 => w,
        _ => auto_split_weight(scene),
    }
}

/// Window depth of each split's far boundary under `projection`, for the
/// shader to pick a split. The boundary sits at the centre of the overlap;
/// unused entries stay zero.
pub fn split_clip_depths(splits: &[SplitRange], projection: &Mat4) -> Vec4 {
    let p10 = projection.z_axis.z;
    let p14 = projection.w_axis.z;
    let mut depths = [0.0; 4];
    for (i, split) in splits.iter().take(4).enumerate() {
        let z = match splits.get(i + 1) {
            Some(next) => split.far - (split.far - next.near) * 0.5,
            None => split.far,
        };
        depths[i] = 0.5 * (-z * p10 + p14) / z + 0.5;
    }
    Vec4::from_array(depths)
}

/// Near and far view distances of the part of the camera's shadow frustum
/// that lies inside the scene, or `None` when they do not overlap.
pub fn adjust_frustum(
    pose: &CameraPose,
    fov_deg: f32,
    aspect: f32,
    cam_near: f32,
    shadow_far: f32,
    scene: &Aabb,
) -> Option<(f32, f32)> {
    let mut frustum = Frustum::new();
    frustum.set_cam_internals(fov_deg, aspect, cam_near, shadow_far);
    frustum.calc_from_pose(pose);

    let mut body = Polyhedron::new();
    body.add(&frustum);
    body.intersect(scene);
    body.make_unique_verts();
    if body.is_empty() {
        return None;
    }

    let dir = pose.direction.normalize_or(Vec3::X);
    let (min, max) = body
        .verts()
        .iter()
        .map(|v| (*v - pose.eye).dot(dir))
        .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some((min, max))
}
