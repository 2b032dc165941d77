//! The renderer front end: owns the loaded scene, the observer and the
//! shadow and cubemap renderers, and sequences every frame.

use glam::{DVec3, Vec3};
use scenery_config::Config;
use scenery_cubemap::{CubemapRenderer, CubemapSettings};
use scenery_lighting::{LightingSettings, ShadowCaster, compute_lighting};
use scenery_math::Aabb;
use scenery_render::{RenderBackend, RenderError};
use scenery_scene::{
    DisplayKind, GroundHeight, LoadStage, LoadedScene, Notifier, SceneInfo, SceneLoadError,
    SceneLoader, SceneSource, SkyProjection, SkySnapshot, StaticMesh, TextureSource,
};
use scenery_shadow::{ShadowFrame, ShadowRenderer, ShadowSettings, resolve_split_weight};

use crate::batches::{ShaderParameters, depth_batches, shading_batches};
use crate::strategy::{CubemapDraw, DirectDraw, DrawContext, DrawPath, DrawStrategy};
use crate::{FrameState, Observer};

/// What a call to [`Scenery3d::draw`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawReport {
    pub path: DrawPath,
    pub shadows: bool,
    pub caster: ShadowCaster,
    pub cubemap_regenerated: bool,
}

struct ActiveScene {
    info: SceneInfo,
    model: Box<dyn StaticMesh>,
    ground_height: Option<Box<dyn GroundHeight>>,
    bounds: Aabb,
}

pub struct Scenery3d<B: RenderBackend> {
    shader_params: ShaderParameters,
    lighting_settings: LightingSettings,
    configured_split_weight: Option<f32>,
    lighting_report: bool,
    shadow: ShadowRenderer<B>,
    cubemap: CubemapRenderer<B>,
    loader: SceneLoader,
    scene: Option<ActiveScene>,
    observer: Observer,
    frame: Option<FrameState>,
}

fn lighting_settings(config: &Config) -> LightingSettings {
    LightingSettings {
        shadows_enabled: config.shadow.enabled,
        torch_enabled: config.lighting.torch_enabled,
        torch_brightness: config.lighting.torch_brightness,
        torch_range: config.lighting.torch_range,
        night_vision: config.lighting.night_vision,
    }
}

impl<B: RenderBackend> Scenery3d<B> {
    pub fn new(config: &Config) -> Self {
        Self {
            shader_params: ShaderParameters::from_config(config),
            lighting_settings: lighting_settings(config),
            configured_split_weight: config.shadow.split_weight_override(),
            lighting_report: config.debug.lighting_report,
            shadow: ShadowRenderer::new(ShadowSettings::from_config(&config.shadow)),
            cubemap: CubemapRenderer::new(CubemapSettings::from_config(&config.cubemap)),
            loader: SceneLoader::new(),
            scene: None,
            observer: Observer::default(),
            frame: None,
        }
    }

    /// Apply changed settings. GPU resources whose shape changed are rebuilt
    /// on the next draw.
    pub fn apply_config(&mut self, config: &Config) {
        self.shader_params = ShaderParameters::from_config(config);
        self.lighting_settings = lighting_settings(config);
        self.configured_split_weight = config.shadow.split_weight_override();
        self.lighting_report = config.debug.lighting_report;
        self.shadow.configure(ShadowSettings {
            split_weight: self.scene_split_weight(),
            ..ShadowSettings::from_config(&config.shadow)
        });
        self.cubemap.configure(CubemapSettings::from_config(&config.cubemap));
        tracing::debug!("configuration applied");
    }

    fn scene_split_weight(&self) -> Option<f32> {
        self.scene
            .as_ref()
            .and_then(|scene| scene.info.shadow_split_weight)
            .or(self.configured_split_weight)
    }

    /// Loader used by [`Scenery3d::load_scene`]; its cancel handle may be
    /// shared with another thread.
    pub fn loader(&self) -> &SceneLoader {
        &self.loader
    }

    /// Load a scene and make it active. On failure the previous scene stays.
    pub fn load_scene(
        &mut self,
        info: &SceneInfo,
        source: &dyn SceneSource,
        progress: &mut dyn FnMut(LoadStage),
        notifier: &dyn Notifier,
    ) -> Result<(), SceneLoadError> {
        match self.loader.load(info, source, progress) {
            Ok(loaded) => {
                self.finalize_load(loaded);
                Ok(())
            }
            Err(SceneLoadError::Cancelled) => {
                tracing::info!(scene = %info.id, "scene load cancelled, keeping current scene");
                Err(SceneLoadError::Cancelled)
            }
            Err(err) => {
                tracing::error!(scene = %info.id, error = %err, "scene load failed");
                notifier.notify(&format!("Could not load scene '{}': {err}", info.name));
                Err(err)
            }
        }
    }

    /// Swap a loaded scene in and put the observer at its start position.
    pub fn finalize_load(&mut self, loaded: LoadedScene) {
        let LoadedScene {
            info,
            model,
            ground_height,
        } = loaded;
        let bounds = model.bounding_box();
        self.observer.place(&info, &bounds, ground_height.as_deref());

        let weight_override = info.shadow_split_weight.or(self.configured_split_weight);
        self.shadow.configure(ShadowSettings {
            split_weight: weight_override,
            ..*self.shadow.settings()
        });
        self.cubemap.invalidate();
        self.frame = None;

        tracing::info!(
            scene = %info.id,
            triangles = model.triangle_count(),
            split_weight = resolve_split_weight(weight_override, &bounds),
            "scene loaded"
        );
        self.scene = Some(ActiveScene {
            info,
            model,
            ground_height,
            bounds,
        });
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene_info(&self) -> Option<&SceneInfo> {
        self.scene.as_ref().map(|scene| &scene.info)
    }

    pub fn scene_bounds(&self) -> Option<Aabb> {
        self.scene.as_ref().map(|scene| scene.bounds)
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Per-frame observer movement. `movement` is (forward, sideways, down)
    /// in the frame of the view azimuth.
    pub fn update(
        &mut self,
        dt: f64,
        movement: Vec3,
        view_direction: Vec3,
        fov_deg: f32,
        julian_day: f64,
    ) {
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        let moved = self.observer.walk(
            &scene.info,
            scene.ground_height.as_deref(),
            dt,
            movement,
            view_direction,
            fov_deg,
        );
        self.cubemap.schedule_refresh(julian_day, moved);
    }

    /// Observer foot position in grid coordinates.
    pub fn grid_position(&self) -> Option<DVec3> {
        self.scene
            .as_ref()
            .map(|scene| self.observer.grid_position(&scene.info))
    }

    pub fn set_grid_position(&mut self, position: DVec3) {
        if let Some(scene) = self.scene.as_ref() {
            self.observer.set_grid_position(&scene.info, position);
            self.cubemap.invalidate();
        }
    }

    /// Pin the shadow frusta and caster for inspection.
    pub fn set_frustum_frozen(&mut self, frozen: bool) {
        self.shadow.set_frozen(frozen);
    }

    pub fn is_frustum_frozen(&self) -> bool {
        self.shadow.is_frozen()
    }

    /// State of the last drawn frame.
    pub fn frame(&self) -> Option<&FrameState> {
        self.frame.as_ref()
    }

    pub fn shadow_frame(&self) -> Option<&ShadowFrame> {
        self.shadow.frame()
    }

    pub fn shadow_renderer(&self) -> &ShadowRenderer<B> {
        &self.shadow
    }

    pub fn cubemap(&self) -> &CubemapRenderer<B> {
        &self.cubemap
    }

    /// Light contribution breakdown of the last frame.
    pub fn lighting_report(&self) -> Option<String> {
        self.frame
            .as_ref()
            .map(|frame| frame.lighting.report.to_string())
    }

    /// Draw one frame. Shadow and cubemap failures degrade the frame; only a
    /// failing screen pass is returned as an error.
    pub fn draw(
        &mut self,
        backend: &mut B,
        projection: &dyn SkyProjection,
        sky: &SkySnapshot,
        textures: &dyn TextureSource,
        notifier: &dyn Notifier,
    ) -> Result<DrawReport, RenderError> {
        let Some(scene) = self.scene.as_ref() else {
            return Ok(DrawReport::default());
        };
        if scene.model.batches().is_empty() {
            return Ok(DrawReport::default());
        }

        let mut display = projection.kind();
        match display {
            DisplayKind::NonLinear => {
                if !self.cubemap.ensure_resources(backend, notifier) {
                    tracing::warn!("cubemap unavailable, drawing with the linear approximation");
                    display = DisplayKind::Perspective;
                }
            }
            DisplayKind::Perspective => self.cubemap.release(),
        }

        let lighting = compute_lighting(sky, &self.lighting_settings);
        if self.lighting_report {
            tracing::debug!(target: "scenery3d::lighting", "{}", lighting.report);
        }
        let frame = FrameState::new(
            projection,
            display,
            &self.observer,
            &scene.info,
            lighting,
            sky.julian_day,
        );

        let shadows_ready = if self.shader_params.shadows {
            if display == DisplayKind::Perspective || self.cubemap.needs_update() {
                let depth = depth_batches(scene.model.as_ref(), textures);
                self.shadow.render(
                    backend,
                    &frame.shadow_inputs(sky, scene.bounds),
                    &depth,
                    notifier,
                )
            } else {
                self.shadow.frame().is_some()
            }
        } else {
            self.shadow.disable();
            false
        };
        let shadow = self.shadow.frame().filter(|_| shadows_ready);
        let params = ShaderParameters {
            shadows: shadow.is_some(),
            shadow_filter: shadow.map_or(self.shader_params.shadow_filter, |s| s.filter),
            ..self.shader_params
        };

        let mut direct = DirectDraw;
        let mut via_cubemap;
        let strategy: &mut dyn DrawStrategy<B> = match display {
            DisplayKind::Perspective => &mut direct,
            DisplayKind::NonLinear => {
                via_cubemap = CubemapDraw::new(&mut self.cubemap);
                &mut via_cubemap
            }
        };

        let batches = shading_batches(
            scene.model.as_ref(),
            textures,
            &params,
            &frame.lighting,
            strategy.translucent_blend(),
        );
        let ctx = DrawContext {
            frame: &frame,
            projection,
            batches: &batches,
            shadow,
            shadow_maps: self.shadow.targets(),
        };
        let regenerated = strategy.draw(backend, &ctx)?;
        tracing::trace!(path = ?strategy.path(), batches = batches.len(), "frame drawn");

        let report = DrawReport {
            path: strategy.path(),
            shadows: shadow.is_some(),
            caster: shadow.map_or(ShadowCaster::None, |s| s.caster),
            cubemap_regenerated: regenerated,
        };
        self.frame = Some(frame);
        Ok(report)
    }
}
