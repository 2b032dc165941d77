//! Shadow map rendering: target lifecycle and the per-frame cascade passes.

use glam::{Mat4, Vec3};
use scenery_config::{ShadowConfig, ShadowFilterQuality};
use scenery_lighting::{ShadowCaster, select_shadow_caster};
use scenery_math::{Aabb, CameraPose, Frustum, Polyhedron};
use scenery_render::{
    Attachment, BatchDraw, ClearFlags, CullMode, DepthBias, DrawCommand, Pass, PassUniforms,
    RasterState, RenderBackend, RenderTarget, SHADOW_SLOT_BASE, ShadowUniforms, TargetDesc,
    TargetKind,
};
use scenery_scene::{DisplayKind, Notifier, SkySnapshot, Viewport};

use crate::cascade::{
    SplitRange, adjust_frustum, compute_splits, resolve_split_weight, split_clip_depths,
};
use crate::crop::compute_crop_matrix;
use crate::focus::{LightVolume, compute_focus_body, light_view};

/// Polygon offset applied while rendering shadow casters.
pub const SHADOW_DEPTH_BIAS: DepthBias = DepthBias {
    factor: 0.5,
    units: 2.0,
};

/// Texture units below which shadowed shading may not fit.
pub const MIN_TEXTURE_UNITS: u32 = 8;

pub const SHADOWS_UNAVAILABLE_NOTICE: &str =
    "Shadow mapping can not be used on your hardware, check logs for details";

/// Shadow parameters taken from the configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub resolution: u32,
    pub splits: usize,
    /// Scene override, falling back to the configured one.
    pub split_weight: Option<f32>,
    pub filter: ShadowFilterQuality,
}

impl ShadowSettings {
    pub fn from_config(config: &ShadowConfig) -> Self {
        Self {
            resolution: config.shadowmap_size,
            splits: config.clamped_splits() as usize,
            split_weight: config.split_weight_override(),
            filter: config.filter_quality,
        }
    }
}

/// Camera and scene data a shadow frame is computed from.
#[derive(Clone, Debug)]
pub struct ShadowInputs<'a> {
    pub sky: &'a SkySnapshot,
    pub camera: CameraPose,
    pub fov_deg: f32,
    pub aspect: f32,
    pub cam_near: f32,
    pub shadow_far: f32,
    pub scene_bounds: Aabb,
    pub display: DisplayKind,
    pub alpha_threshold: f32,
}

/// One cascade of the current frame.
#[derive(Clone, Debug)]
pub struct ShadowSplit {
    pub range: SplitRange,
    pub frustum: Frustum,
    pub body: Polyhedron,
    /// Split projection, `crop · light_projection`.
    pub projection: Mat4,
    /// World space to shadow-map texture space.
    pub lookup: Mat4,
    /// Whether casters were drawn; an empty focus body leaves the map clear.
    pub drawn: bool,
}

/// Everything the shading pass needs from the last shadow render.
#[derive(Clone, Debug)]
pub struct ShadowFrame {
    pub caster: ShadowCaster,
    pub light_direction: Vec3,
    pub light_view: Mat4,
    pub light_projection: Mat4,
    pub splits: Vec<ShadowSplit>,
    /// Filter quality to shade with this frame.
    pub filter: ShadowFilterQuality,
}

impl ShadowFrame {
    pub fn ranges(&self) -> Vec<SplitRange> {
        self.splits.iter().map(|s| s.range).collect()
    }

    /// Shader inputs, with split depths taken under the camera projection.
    pub fn uniforms(&self, camera_projection: &Mat4) -> ShadowUniforms {
        ShadowUniforms {
            split_depths: split_clip_depths(&self.ranges(), camera_projection),
            lookup: self.splits.iter().map(|s| s.lookup).collect(),
            first_slot: SHADOW_SLOT_BASE,
        }
    }
}

enum ShadowState<T> {
    Uninitialized,
    Ready { targets: Vec<T> },
    Disabled,
}

pub struct ShadowRenderer<B: RenderBackend> {
    state: ShadowState<B::Target>,
    settings: ShadowSettings,
    reinit: bool,
    frozen: bool,
    notified: bool,
    frame: Option<ShadowFrame>,
}

impl<B: RenderBackend> ShadowRenderer<B> {
    pub fn new(settings: ShadowSettings) -> Self {
        Self {
            state: ShadowState::Uninitialized,
            settings,
            reinit: true,
            frozen: false,
            notified: false,
            frame: None,
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Apply new settings. A resolution or split count change reallocates the
    /// targets on the next frame.
    pub fn configure(&mut self, settings: ShadowSettings) {
        if settings.resolution != self.settings.resolution || settings.splits != self.settings.splits
        {
            tracing::debug!(
                resolution = settings.resolution,
                splits = settings.splits,
                "shadow maps need reinitialisation"
            );
            self.reinit = true;
            self.notified = false;
        }
        self.settings = settings;
    }

    /// Force reallocation on the next frame.
    pub fn request_reinit(&mut self) {
        self.reinit = true;
    }

    /// Release the targets; they are allocated again on the next render.
    pub fn disable(&mut self) {
        if matches!(self.state, ShadowState::Ready { .. }) {
            tracing::info!("releasing shadow maps");
        }
        self.state = ShadowState::Disabled;
        self.frame = None;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ShadowState::Ready { .. })
    }

    /// Pin the current cascades, caster and maps.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
        if let Some(frame) = self.frame.as_mut() {
            for split in &mut frame.splits {
                if frozen {
                    split.frustum.save_drawing_corners();
                } else {
                    split.frustum.reset_drawing_corners();
                }
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn frame(&self) -> Option<&ShadowFrame> {
        self.frame.as_ref()
    }

    pub fn targets(&self) -> &[B::Target] {
        match &self.state {
            ShadowState::Ready { targets } => targets,
            ShadowState::Uninitialized | ShadowState::Disabled => &[],
        }
    }

    fn init(&mut self, backend: &mut B, notifier: &dyn Notifier) -> bool {
        self.state = ShadowState::Disabled;
        self.frame = None;

        let caps = backend.capabilities();
        if caps.max_texture_units < MIN_TEXTURE_UNITS {
            tracing::warn!(
                units = caps.max_texture_units,
                "few texture units available, shadowed shading may fail"
            );
        }

        let mut targets = Vec::with_capacity(self.settings.splits);
        for i in 0..self.settings.splits {
            let desc = TargetDesc::new(
                format!("shadow-map-{i}"),
                TargetKind::Depth2d,
                self.settings.resolution,
            );
            match backend.create_target(&desc) {
                Ok(target) => targets.push(target),
                Err(err) => {
                    tracing::error!(split = i, error = %err, "shadow map allocation failed");
                    drop(targets);
                    if !self.notified {
                        notifier.notify(SHADOWS_UNAVAILABLE_NOTICE);
                        self.notified = true;
                    }
                    return false;
                }
            }
        }

        tracing::info!(
            splits = self.settings.splits,
            resolution = self.settings.resolution,
            "shadow maps initialised"
        );
        self.state = ShadowState::Ready { targets };
        true
    }

    /// Render every cascade. Returns `false` when shadows are unavailable
    /// this frame.
    pub fn render(
        &mut self,
        backend: &mut B,
        inputs: &ShadowInputs<'_>,
        depth_batches: &[BatchDraw],
        notifier: &dyn Notifier,
    ) -> bool {
        if self.reinit || !self.is_ready() {
            self.reinit = false;
            if !self.init(backend, notifier) {
                return false;
            }
        }
        if self.frozen && self.frame.is_some() {
            return true;
        }

        let ShadowState::Ready { targets } = &self.state else {
            return false;
        };

        let (caster, light_direction) = select_shadow_caster(inputs.sky);
        let filter = if caster == ShadowCaster::Venus {
            ShadowFilterQuality::LOWEST
        } else {
            self.settings.filter
        };

        let (near, far) = adjust_frustum(
            &inputs.camera,
            inputs.fov_deg,
            inputs.aspect,
            inputs.cam_near,
            inputs.shadow_far,
            &inputs.scene_bounds,
        )
        .unwrap_or((inputs.cam_near, inputs.shadow_far));
        let weight = resolve_split_weight(self.settings.split_weight, &inputs.scene_bounds);
        let ranges = compute_splits(near, far, targets.len(), weight);

        let light_view = light_view(light_direction);
        let light_projection =
            LightVolume::from_scene(light_direction, &inputs.scene_bounds).projection();
        let viewport = Viewport::square(self.settings.resolution);
        let raster = RasterState {
            depth_test: true,
            depth_write: true,
            cull: CullMode::Front,
            depth_bias: Some(SHADOW_DEPTH_BIAS),
        };

        let mut splits = Vec::with_capacity(ranges.len());
        for (range, target) in ranges.into_iter().zip(targets) {
            let mut frustum = Frustum::new();
            frustum.set_cam_internals(inputs.fov_deg, inputs.aspect, range.near, range.far);
            frustum.calc_from_pose(&inputs.camera);

            let mut body = Polyhedron::new();
            compute_focus_body(&mut body, &frustum, light_direction, &inputs.scene_bounds);

            let mut pass = Pass::new(
                "shadow-split",
                RenderTarget::Offscreen {
                    color: None,
                    depth: Some(Attachment::Target(target)),
                },
                viewport,
            )
            .with_clear(ClearFlags::DEPTH)
            .with_raster(raster);

            let fit = compute_crop_matrix(
                &mut body,
                &light_projection,
                &light_view,
                inputs.display,
                self.settings.resolution,
            );
            let (projection, lookup) = match fit {
                Some(fit) => {
                    pass.uniforms = PassUniforms {
                        projection: fit.projection,
                        model_view: light_view,
                        mvp: fit.projection * light_view,
                        alpha_threshold: inputs.alpha_threshold,
                        ..PassUniforms::default()
                    };
                    pass.commands = depth_batches.iter().cloned().map(DrawCommand::Batch).collect();
                    (fit.projection, fit.lookup)
                }
                None => (light_projection, Mat4::IDENTITY),
            };

            if let Err(err) = backend.execute(&pass) {
                tracing::error!(error = %err, "shadow pass failed");
                return false;
            }
            splits.push(ShadowSplit {
                range,
                frustum,
                drawn: !body.is_empty(),
                body,
                projection,
                lookup,
            });
        }

        tracing::trace!(caster = caster.name(), splits = splits.len(), "shadow maps rendered");
        self.frame = Some(ShadowFrame {
            caster,
            light_direction,
            light_view,
            light_projection,
            splits,
            filter,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use scenery_render::{
        BackendCapabilities, BlendMode, ProgramKey, ProgramPass, RecordedTargetRef,
        RecordingBackend, TextureBindings,
    };
    use scenery_scene::{BodyState, RecordingNotifier};

    use super::*;

    fn settings() -> ShadowSettings {
        ShadowSettings::from_config(&ShadowConfig::default())
    }

    fn sky(sun_alt: f32, moon_alt: f32) -> SkySnapshot {
        SkySnapshot {
            sun: BodyState::from_alt_az(sun_alt, 135.0, 0.0),
            moon: BodyState::from_alt_az(moon_alt, 200.0, 0.0),
            venus: BodyState::from_alt_az(-20.0, 250.0, 0.0),
            lightscape_brightness: None,
            julian_day: 2_460_000.5,
        }
    }

    fn inputs(sky: &SkySnapshot) -> ShadowInputs<'_> {
        ShadowInputs {
            sky,
            camera: CameraPose {
                eye: Vec3::new(0.0, 0.0, 1.7),
                direction: Vec3::X,
                up: Vec3::Z,
            },
            fov_deg: 60.0,
            aspect: 1.5,
            cam_near: 0.3,
            shadow_far: 2000.0,
            scene_bounds: Aabb::new(Vec3::new(-50.0, -50.0, 0.0), Vec3::new(50.0, 50.0, 20.0)),
            display: DisplayKind::Perspective,
            alpha_threshold: 0.5,
        }
    }

    fn batches() -> Vec<BatchDraw> {
        vec![BatchDraw {
            program: ProgramKey {
                pass: ProgramPass::Depth,
                alpha_test: true,
                ..Default::default()
            },
            material: None,
            textures: TextureBindings::default(),
            blend: BlendMode::Opaque,
            cull_back_faces: true,
            first_index: 0,
            index_count: 36,
        }]
    }

    #[test]
    fn test_first_frame_allocates_and_renders_each_split() {
        let mut backend = RecordingBackend::new();
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        assert!(shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier));

        assert_eq!(backend.live_targets(), 4);
        assert_eq!(backend.passes().len(), 4);
        for (i, pass) in backend.passes().iter().enumerate() {
            assert_eq!(pass.clear, ClearFlags::DEPTH);
            assert_eq!(pass.raster.cull, CullMode::Front);
            assert_eq!(pass.raster.depth_bias, Some(SHADOW_DEPTH_BIAS));
            assert_eq!(
                pass.target,
                RecordedTargetRef::Offscreen {
                    color: None,
                    depth: Some((shadows.targets()[i].id(), None))
                }
            );
        }
        let frame = shadows.frame().unwrap();
        assert_eq!(frame.caster, ShadowCaster::Sun);
        assert_eq!(frame.filter, ShadowFilterQuality::Low);
        assert!(frame.splits.iter().any(|s| s.drawn));
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_depth_pass_mvp_is_crop_projection_times_view() {
        let mut backend = RecordingBackend::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &RecordingNotifier::new());
        let frame = shadows.frame().unwrap();
        let pass = &backend.passes()[0];
        assert_eq!(pass.uniforms.mvp, frame.splits[0].projection * frame.light_view);
        assert_eq!(pass.uniforms.alpha_threshold, 0.5);
        assert_eq!(pass.batches().count(), 1);
    }

    #[test]
    fn test_allocation_failure_releases_and_notifies_once() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(Some(2));
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);

        assert!(!shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier));
        assert_eq!(backend.live_targets(), 0);
        assert_eq!(backend.released_count(), 2);
        assert!(!shadows.is_ready());

        backend.fail_allocations_after(Some(0));
        assert!(!shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier));
        assert_eq!(notifier.messages(), vec![SHADOWS_UNAVAILABLE_NOTICE.to_string()]);
        assert!(backend.passes().is_empty());
    }

    #[test]
    fn test_oversized_maps_fail() {
        let mut backend = RecordingBackend::with_capabilities(BackendCapabilities {
            max_texture_size: 512,
            ..Default::default()
        });
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        assert!(!shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier));
        assert_eq!(notifier.messages().len(), 1);
    }

    #[test]
    fn test_venus_forces_lowest_filter() {
        let mut backend = RecordingBackend::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(ShadowSettings {
            filter: ShadowFilterQuality::High,
            ..settings()
        });
        let sky = sky(-30.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &RecordingNotifier::new());
        let frame = shadows.frame().unwrap();
        assert_eq!(frame.caster, ShadowCaster::Venus);
        assert_eq!(frame.filter, ShadowFilterQuality::Off);
    }

    #[test]
    fn test_empty_focus_body_clears_without_drawing() {
        let mut backend = RecordingBackend::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        let mut away = inputs(&sky);
        away.camera.eye = Vec3::new(500.0, 0.0, 1.7);
        assert!(shadows.render(&mut backend, &away, &batches(), &RecordingNotifier::new()));
        for pass in backend.passes() {
            assert_eq!(pass.clear, ClearFlags::DEPTH);
            assert!(pass.commands.is_empty());
        }
        assert!(shadows.frame().unwrap().splits.iter().all(|s| !s.drawn));
    }

    #[test]
    fn test_resolution_change_reallocates() {
        let mut backend = RecordingBackend::new();
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        assert_eq!(backend.created().len(), 4);

        shadows.configure(ShadowSettings {
            resolution: 512,
            splits: 2,
            ..settings()
        });
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        assert_eq!(backend.live_targets(), 2);
        assert_eq!(backend.released_count(), 4);
        assert!(backend.created()[4..].iter().all(|d| d.size == 512));
    }

    #[test]
    fn test_filter_change_keeps_targets() {
        let mut backend = RecordingBackend::new();
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        shadows.configure(ShadowSettings {
            filter: ShadowFilterQuality::High,
            ..settings()
        });
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        assert_eq!(backend.created().len(), 4);
        assert_eq!(shadows.frame().unwrap().filter, ShadowFilterQuality::High);
    }

    #[test]
    fn test_frozen_skips_recomputation() {
        let mut backend = RecordingBackend::new();
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let day = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&day), &batches(), &notifier);
        shadows.set_frozen(true);
        assert!(shadows.frame().unwrap().splits[0].frustum.drawing_corners().is_some());

        let night = sky(-30.0, 20.0);
        assert!(shadows.render(&mut backend, &inputs(&night), &batches(), &notifier));
        assert_eq!(backend.passes().len(), 4);
        assert_eq!(shadows.frame().unwrap().caster, ShadowCaster::Sun);

        shadows.set_frozen(false);
        shadows.render(&mut backend, &inputs(&night), &batches(), &notifier);
        assert_eq!(shadows.frame().unwrap().caster, ShadowCaster::Moon);
    }

    #[test]
    fn test_disable_releases_targets() {
        let mut backend = RecordingBackend::new();
        let notifier = RecordingNotifier::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier);
        shadows.disable();
        assert_eq!(backend.live_targets(), 0);
        assert!(shadows.frame().is_none());
        assert!(shadows.render(&mut backend, &inputs(&sky), &batches(), &notifier));
        assert_eq!(backend.live_targets(), 4);
    }

    #[test]
    fn test_frame_uniforms() {
        let mut backend = RecordingBackend::new();
        let mut shadows = ShadowRenderer::<RecordingBackend>::new(settings());
        let sky = sky(40.0, -10.0);
        shadows.render(&mut backend, &inputs(&sky), &batches(), &RecordingNotifier::new());
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.5, 0.3, 10000.0);
        let uniforms = shadows.frame().unwrap().uniforms(&projection);
        assert_eq!(uniforms.lookup.len(), 4);
        assert_eq!(uniforms.first_slot, SHADOW_SLOT_BASE);
        assert!(uniforms.split_depths.x < uniforms.split_depths.w);
    }
}
