//! Cubemap lifecycle, face generation and reprojection onto the sky
//! projection.

use glam::{Mat4, Vec3};
use scenery_config::{CubemapConfig, CubemapMode};
use scenery_render::{
    BatchDraw, BlendMode, ClearFlags, CubeMeshDraw, CullMode, DrawCommand, Pass, PassUniforms,
    RasterState, RenderBackend, RenderError, RenderTarget,
};
use scenery_scene::{Notifier, SkyProjection, Viewport};

use crate::face::face_rotations;
use crate::mesh::CubeMesh;
use crate::resources::CubemapTargets;

/// One second in Julian days.
pub const JD_SECOND: f64 = 1.0 / 86_400.0;

pub const MODE_FALLBACK_NOTICE: &str =
    "Selected cubemapping mode is not supported. Falling back to '6 Textures' mode.";

pub const CUBEMAP_UNAVAILABLE_NOTICE: &str =
    "Cubemap rendering can not be used on your hardware, check logs for details";

/// Window depth given to cube vertices the projection cannot map; outside
/// the clip volume after the screen matrix.
const UNPROJECTED_DEPTH: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubemapSettings {
    pub mode: CubemapMode,
    pub size: u32,
    pub lazy: bool,
    pub lazy_interval_secs: f64,
}

impl CubemapSettings {
    pub fn from_config(config: &CubemapConfig) -> Self {
        Self {
            mode: config.mode,
            size: config.size,
            lazy: config.lazy_drawing,
            lazy_interval_secs: config.lazy_interval_secs,
        }
    }
}

/// View parameters of a face refresh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceView {
    pub face: Option<u32>,
    pub projection: Mat4,
    pub model_view: Mat4,
}

/// Scene inputs of a cubemap refresh.
pub struct CubeGeneration<'a, T> {
    /// Translation from world space to the observer, i.e. the negated eye.
    pub observer_offset: Vec3,
    pub cam_near: f32,
    pub cam_far: f32,
    pub julian_day: f64,
    pub batches: &'a [BatchDraw],
    pub shadow_maps: &'a [T],
}

#[allow(clippy::too_many_arguments)]
fn face_pass<'a, T>(
    target: RenderTarget<'a, T>,
    viewport: Viewport,
    raster: RasterState,
    uniforms: PassUniforms,
    shadow_maps: &[&'a T],
    batches: &[BatchDraw],
    layered: bool,
) -> Pass<'a, T> {
    let mut pass = Pass::new("cubemap-face", target, viewport)
        .with_clear(ClearFlags::ALL)
        .with_raster(raster)
        .with_uniforms(uniforms);
    pass.shadow_maps = shadow_maps.to_vec();
    pass.commands = batches
        .iter()
        .map(|batch| {
            let mut batch = batch.clone();
            batch.program.layered = layered;
            DrawCommand::Batch(batch)
        })
        .collect();
    pass
}

pub struct CubemapRenderer<B: RenderBackend> {
    settings: CubemapSettings,
    targets: Option<CubemapTargets<B::Target>>,
    rotations: [Mat4; 6],
    mesh: CubeMesh,
    projected: Vec<Vec3>,
    reinit: bool,
    layered_unsupported: bool,
    notified: bool,
    last_update: f64,
    needs_update: bool,
}

impl<B: RenderBackend> CubemapRenderer<B> {
    pub fn new(settings: CubemapSettings) -> Self {
        let mesh = CubeMesh::default();
        Self {
            settings,
            targets: None,
            rotations: face_rotations(settings.mode),
            projected: vec![Vec3::ZERO; mesh.vertex_count()],
            mesh,
            reinit: true,
            layered_unsupported: false,
            notified: false,
            last_update: 0.0,
            needs_update: true,
        }
    }

    pub fn settings(&self) -> &CubemapSettings {
        &self.settings
    }

    /// Apply new settings. A mode or size change rebuilds the targets on the
    /// next frame; lazy refresh settings apply immediately.
    pub fn configure(&mut self, settings: CubemapSettings) {
        if settings.mode != self.settings.mode || settings.size != self.settings.size {
            tracing::debug!(mode = ?settings.mode, size = settings.size, "cubemap needs reinitialisation");
            self.reinit = true;
            self.notified = false;
        }
        self.settings = settings;
    }

    pub fn request_reinit(&mut self) {
        self.reinit = true;
    }

    pub fn reinit_requested(&self) -> bool {
        self.reinit
    }

    pub fn is_created(&self) -> bool {
        self.targets.is_some()
    }

    /// Mode of the live targets, which may differ from the configured one
    /// after a fallback.
    pub fn active_mode(&self) -> Option<CubemapMode> {
        self.targets.as_ref().map(CubemapTargets::mode)
    }

    pub fn targets(&self) -> Option<&CubemapTargets<B::Target>> {
        self.targets.as_ref()
    }

    pub fn mesh(&self) -> &CubeMesh {
        &self.mesh
    }

    pub fn face_rotations(&self) -> &[Mat4; 6] {
        &self.rotations
    }

    /// Release every target; used when the display returns to perspective.
    pub fn release(&mut self) {
        if self.targets.take().is_some() {
            tracing::info!("releasing cubemap");
        }
    }

    /// Force a refresh on the next frame.
    pub fn invalidate(&mut self) {
        self.last_update = 0.0;
        self.needs_update = true;
    }

    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    /// Decide whether this frame regenerates the faces.
    pub fn schedule_refresh(&mut self, julian_day: f64, moved: bool) -> bool {
        self.needs_update = if self.settings.lazy {
            moved
                || (julian_day - self.last_update).abs()
                    > self.settings.lazy_interval_secs * JD_SECOND
                || self.reinit
        } else {
            true
        };
        self.needs_update
    }

    /// Whether the next frame must re-render the faces. Without lazy
    /// drawing this holds every frame.
    pub fn needs_update(&self) -> bool {
        !self.settings.lazy || self.needs_update || self.targets.is_none()
    }

    fn fallback_notice(&mut self, notifier: &dyn Notifier, message: &str) {
        if !self.notified {
            notifier.notify(message);
            self.notified = true;
        }
    }

    /// Build the targets if missing or stale. Returns `false` when no mode
    /// could be created.
    pub fn ensure_resources(&mut self, backend: &mut B, notifier: &dyn Notifier) -> bool {
        if self.targets.is_some() && !self.reinit {
            return true;
        }
        self.reinit = false;
        self.targets = None;

        let mut mode = self.settings.mode;
        if mode == CubemapMode::CubemapGeometryAccelerated
            && (!backend.capabilities().layered_rendering || self.layered_unsupported)
        {
            tracing::warn!("layered rendering unavailable, using separate face textures");
            self.fallback_notice(notifier, MODE_FALLBACK_NOTICE);
            mode = CubemapMode::Textures;
        }

        let size = self.settings.size;
        let targets = match CubemapTargets::allocate(backend, mode, size) {
            Ok(targets) => targets,
            Err(err) if mode != CubemapMode::Textures => {
                tracing::warn!(mode = ?mode, error = %err, "cubemap allocation failed, retrying with face textures");
                self.fallback_notice(notifier, MODE_FALLBACK_NOTICE);
                match CubemapTargets::allocate(backend, CubemapMode::Textures, size) {
                    Ok(targets) => targets,
                    Err(err) => {
                        tracing::error!(error = %err, "cubemap allocation failed");
                        self.fallback_notice(notifier, CUBEMAP_UNAVAILABLE_NOTICE);
                        return false;
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "cubemap allocation failed");
                self.fallback_notice(notifier, CUBEMAP_UNAVAILABLE_NOTICE);
                return false;
            }
        };

        self.rotations = face_rotations(targets.mode());
        tracing::info!(mode = ?targets.mode(), size, "cubemap initialised");
        self.targets = Some(targets);
        self.invalidate();
        true
    }

    /// Render the scene into every face from the observer position.
    /// `uniforms` fills in the per-view program inputs.
    pub fn generate<F>(
        &mut self,
        backend: &mut B,
        scene: &CubeGeneration<'_, B::Target>,
        mut uniforms: F,
    ) -> Result<(), RenderError>
    where
        F: FnMut(&FaceView) -> PassUniforms,
    {
        let Some(targets) = self.targets.as_ref() else {
            return Err(RenderError::ResourceAllocation {
                label: "cubemap".to_string(),
                reason: "not created".to_string(),
            });
        };

        let projection =
            Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, scene.cam_near, scene.cam_far);
        let translate = Mat4::from_translation(scene.observer_offset);
        let viewport = Viewport::square(self.settings.size);
        let raster = RasterState {
            depth_test: true,
            depth_write: true,
            cull: CullMode::Back,
            depth_bias: None,
        };
        let shadow_maps: Vec<&B::Target> = scene.shadow_maps.iter().collect();

        if let Some(target) = targets.layered_target() {
            let view = FaceView {
                face: None,
                projection,
                model_view: translate,
            };
            let mut pass_uniforms = uniforms(&view);
            pass_uniforms.cube_mvps = Some(self.rotations.map(|r| projection * r * translate));
            let pass = face_pass(
                target,
                viewport,
                raster,
                pass_uniforms,
                &shadow_maps,
                scene.batches,
                true,
            );
            if let Err(err) = backend.execute(&pass) {
                if matches!(err, RenderError::UnsupportedHardware(_)) {
                    tracing::warn!(error = %err, "layered cube pass rejected");
                    self.layered_unsupported = true;
                    self.reinit = true;
                }
                return Err(err);
            }
        } else {
            for (face, rotation) in (0u32..).zip(self.rotations.iter()) {
                let Some(target) = targets.face_target(face) else {
                    continue;
                };
                let view = FaceView {
                    face: Some(face),
                    projection,
                    model_view: *rotation * translate,
                };
                let pass = face_pass(
                    target,
                    viewport,
                    raster,
                    uniforms(&view),
                    &shadow_maps,
                    scene.batches,
                    false,
                );
                backend.execute(&pass)?;
            }
        }

        tracing::debug!(jd = scene.julian_day, "cubemap regenerated");
        self.last_update = scene.julian_day;
        self.needs_update = false;
        Ok(())
    }

    /// Project the cube mesh through the sky projection and draw it onto the
    /// screen, sampling the faces.
    pub fn draw_from_cube_map(
        &mut self,
        backend: &mut B,
        projection: &dyn SkyProjection,
    ) -> Result<(), RenderError> {
        let Some(targets) = self.targets.as_ref() else {
            return Err(RenderError::ResourceAllocation {
                label: "cubemap".to_string(),
                reason: "not created".to_string(),
            });
        };

        self.projected.clear();
        self.projected.extend(self.mesh.positions.iter().map(|p| {
            projection
                .project(*p)
                .unwrap_or(Vec3::new(0.0, 0.0, UNPROJECTED_DEPTH))
        }));

        let mut pass = Pass::new("cubemap-reproject", RenderTarget::Screen, projection.viewport())
            .with_clear(ClearFlags::DEPTH)
            .with_raster(RasterState {
                depth_test: true,
                depth_write: true,
                cull: CullMode::Back,
                depth_bias: None,
            })
            .with_uniforms(PassUniforms {
                projection: projection.screen_matrix(),
                ..PassUniforms::default()
            });
        pass.commands.push(DrawCommand::CubeMesh(CubeMeshDraw {
            positions: &self.projected,
            directions: &self.mesh.positions,
            texcoords: &self.mesh.texcoords,
            indices: &self.mesh.indices,
            source: targets.source(),
            blend: BlendMode::PremultipliedOver,
        }));
        backend.execute(&pass)
    }
}
