//! The two ways a frame reaches the screen: drawing the scene directly
//! under a perspective projection, or through the cubemap for every other
//! projection.

use scenery_cubemap::{CubeGeneration, CubemapRenderer};
use scenery_render::{
    BatchDraw, BlendMode, ClearFlags, CullMode, DrawCommand, Pass, RasterState, RenderBackend,
    RenderError, RenderTarget,
};
use scenery_scene::SkyProjection;
use scenery_shadow::ShadowFrame;

use crate::FrameState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawPath {
    /// Nothing drawn, no scene loaded.
    #[default]
    Skipped,
    Direct,
    Cubemap,
}

/// Inputs of the final drawing stage.
pub struct DrawContext<'a, T> {
    pub frame: &'a FrameState,
    pub projection: &'a dyn SkyProjection,
    pub batches: &'a [BatchDraw],
    pub shadow: Option<&'a ShadowFrame>,
    pub shadow_maps: &'a [T],
}

impl<T> DrawContext<'_, T> {
    fn bound_shadow_maps(&self) -> &[T] {
        if self.shadow.is_some() {
            self.shadow_maps
        } else {
            &[]
        }
    }
}

pub trait DrawStrategy<B: RenderBackend> {
    fn path(&self) -> DrawPath;

    /// Blending of translucent materials on this path.
    fn translucent_blend(&self) -> BlendMode;

    /// Draw the frame. Returns whether an offscreen refresh happened.
    fn draw(&mut self, backend: &mut B, ctx: &DrawContext<'_, B::Target>)
    -> Result<bool, RenderError>;
}

/// Draws the scene straight onto the screen; only valid for perspective
/// projections.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDraw;

impl<B: RenderBackend> DrawStrategy<B> for DirectDraw {
    fn path(&self) -> DrawPath {
        DrawPath::Direct
    }

    fn translucent_blend(&self) -> BlendMode {
        BlendMode::Alpha
    }

    fn draw(
        &mut self,
        backend: &mut B,
        ctx: &DrawContext<'_, B::Target>,
    ) -> Result<bool, RenderError> {
        let frame = ctx.frame;
        let mut pass = Pass::new("scene-direct", RenderTarget::Screen, frame.viewport)
            .with_clear(ClearFlags::DEPTH)
            .with_raster(RasterState {
                depth_test: true,
                depth_write: true,
                cull: CullMode::Back,
                depth_bias: None,
            })
            .with_uniforms(frame.scene_uniforms(frame.projection, frame.model_view, ctx.shadow));
        pass.shadow_maps = ctx.bound_shadow_maps().iter().collect();
        pass.commands = ctx.batches.iter().cloned().map(DrawCommand::Batch).collect();
        backend.execute(&pass)?;
        Ok(false)
    }
}

/// Refreshes the cubemap when stale, then reprojects it onto the screen.
pub struct CubemapDraw<'r, B: RenderBackend> {
    renderer: &'r mut CubemapRenderer<B>,
}

impl<'r, B: RenderBackend> CubemapDraw<'r, B> {
    pub fn new(renderer: &'r mut CubemapRenderer<B>) -> Self {
        Self { renderer }
    }
}

impl<B: RenderBackend> DrawStrategy<B> for CubemapDraw<'_, B> {
    fn path(&self) -> DrawPath {
        DrawPath::Cubemap
    }

    fn translucent_blend(&self) -> BlendMode {
        BlendMode::AlphaAdditive
    }

    fn draw(
        &mut self,
        backend: &mut B,
        ctx: &DrawContext<'_, B::Target>,
    ) -> Result<bool, RenderError> {
        let frame = ctx.frame;
        let mut regenerated = false;
        if self.renderer.needs_update() {
            let scene = CubeGeneration {
                observer_offset: frame.observer_offset,
                cam_near: frame.cam_near,
                cam_far: frame.cam_far,
                julian_day: frame.julian_day,
                batches: ctx.batches,
                shadow_maps: ctx.bound_shadow_maps(),
            };
            match self.renderer.generate(backend, &scene, |view| {
                frame.scene_uniforms(view.projection, view.model_view, ctx.shadow)
            }) {
                Ok(()) => regenerated = true,
                Err(err) => tracing::warn!(error = %err, "cubemap refresh failed, showing stale faces"),
            }
        }
        self.renderer.draw_from_cube_map(backend, ctx.projection)?;
        Ok(regenerated)
    }
}
