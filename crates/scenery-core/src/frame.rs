//! Per-frame view, projection and lighting state.

use glam::{Mat3, Mat4, Vec3};
use scenery_lighting::LightingState;
use scenery_math::{Aabb, CameraPose};
use scenery_render::PassUniforms;
use scenery_scene::{DisplayKind, SceneInfo, SkyProjection, SkySnapshot, Viewport};
use scenery_shadow::{ShadowFrame, ShadowInputs};

use crate::Observer;

/// Widest view the shadow cascades are fitted to; fisheye fields of view
/// reach 180 degrees and beyond.
pub const MAX_SHADOW_FOV_DEG: f32 = 170.0;

/// Everything the stages of one frame share. Built once at the start of a
/// draw and passed down explicitly.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub display: DisplayKind,
    pub viewport: Viewport,
    pub fov_deg: f32,
    pub aspect: f32,
    pub camera: CameraPose,
    /// Translation taking world space to the observer.
    pub observer_offset: Vec3,
    /// Perspective projection of the direct path.
    pub projection: Mat4,
    /// View rotation followed by the observer translation.
    pub model_view: Mat4,
    pub cam_near: f32,
    pub cam_far: f32,
    pub shadow_far: f32,
    pub alpha_threshold: f32,
    pub lighting: LightingState,
    pub julian_day: f64,
}

impl FrameState {
    pub fn new(
        projection: &dyn SkyProjection,
        display: DisplayKind,
        observer: &Observer,
        info: &SceneInfo,
        lighting: LightingState,
        julian_day: f64,
    ) -> Self {
        let viewport = projection.viewport();
        let fov_deg = projection.fov_degrees();
        let aspect = projection.aspect();
        let rotation = projection.approximate_linear_transform();
        let observer_offset = observer.translation().as_vec3();
        let camera = CameraPose {
            eye: observer.eye_position(),
            direction: rotation.transpose().transform_vector3(Vec3::NEG_Z),
            up: Vec3::Z,
        };
        Self {
            display,
            viewport,
            fov_deg,
            aspect,
            camera,
            observer_offset,
            projection: Mat4::perspective_rh_gl(
                fov_deg.to_radians(),
                aspect,
                info.cam_near_z,
                info.cam_far_z,
            ),
            model_view: rotation * Mat4::from_translation(observer_offset),
            cam_near: info.cam_near_z,
            cam_far: info.cam_far_z,
            shadow_far: info.shadow_far_z,
            alpha_threshold: info.transparency_threshold,
            lighting,
            julian_day,
        }
    }

    pub fn shadow_inputs<'a>(&self, sky: &'a SkySnapshot, scene_bounds: Aabb) -> ShadowInputs<'a> {
        ShadowInputs {
            sky,
            camera: self.camera,
            fov_deg: self.fov_deg.min(MAX_SHADOW_FOV_DEG),
            aspect: self.aspect,
            cam_near: self.cam_near,
            shadow_far: self.shadow_far,
            scene_bounds,
            display: self.display,
            alpha_threshold: self.alpha_threshold,
        }
    }

    /// Program inputs of a shaded pass seen through `projection` and
    /// `model_view`.
    pub fn scene_uniforms(
        &self,
        projection: Mat4,
        model_view: Mat4,
        shadow: Option<&ShadowFrame>,
    ) -> PassUniforms {
        let normal_matrix = Mat3::from_mat4(model_view).inverse().transpose();
        PassUniforms {
            projection,
            model_view,
            mvp: projection * model_view,
            normal_matrix,
            light_direction_view: normal_matrix * self.lighting.light_direction,
            alpha_threshold: self.alpha_threshold,
            torch_attenuation: self.lighting.torch_attenuation,
            shadow: shadow.map(|frame| frame.uniforms(&projection)),
            cube_mvps: None,
        }
    }
}
