//! Backend-neutral description of one render pass.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use scenery_config::ShadowFilterQuality;
use scenery_scene::{TextureId, Viewport};

/// First texture slot used by shadow maps; slots below hold material
/// textures.
pub const SHADOW_SLOT_BASE: u32 = 4;

/// A whole target or one layer of a cube target.
#[derive(Debug)]
pub enum Attachment<'a, T> {
    /// Every layer; for cube targets this is a layered attachment.
    Target(&'a T),
    Layer(&'a T, u32),
}

impl<T> Clone for Attachment<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Attachment<'_, T> {}

impl<'a, T> Attachment<'a, T> {
    pub fn target(&self) -> &'a T {
        match *self {
            Attachment::Target(t) | Attachment::Layer(t, _) => t,
        }
    }

    pub fn layer(&self) -> Option<u32> {
        match *self {
            Attachment::Target(_) => None,
            Attachment::Layer(_, layer) => Some(layer),
        }
    }
}

#[derive(Debug)]
pub enum RenderTarget<'a, T> {
    /// The host's framebuffer.
    Screen,
    Offscreen {
        color: Option<Attachment<'a, T>>,
        depth: Option<Attachment<'a, T>>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
}

impl ClearFlags {
    pub const NONE: Self = Self {
        color: false,
        depth: false,
    };
    pub const DEPTH: Self = Self {
        color: false,
        depth: true,
    };
    pub const ALL: Self = Self {
        color: true,
        depth: true,
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    None,
    Back,
    Front,
}

/// Polygon offset, in the fixed-function sense.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthBias {
    pub factor: f32,
    pub units: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull: CullMode,
    pub depth_bias: Option<DepthBias>,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            cull: CullMode::None,
            depth_bias: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    Alpha,
    /// Color as [`BlendMode::Alpha`], alpha as `ONE, ONE_MINUS_SRC_ALPHA`
    /// so translucent surfaces accumulate coverage in offscreen targets.
    AlphaAdditive,
    /// `ONE, ONE_MINUS_SRC_ALPHA`, for premultiplied content.
    PremultipliedOver,
}

/// Shadow data shared by every draw in a shaded pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowUniforms {
    /// Far clip depth of each split, unused entries zero.
    pub split_depths: Vec4,
    /// Texture lookup matrix per split.
    pub lookup: Vec<Mat4>,
    /// Texture slot of the first shadow map.
    pub first_slot: u32,
}

/// Per-pass program inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct PassUniforms {
    pub projection: Mat4,
    pub model_view: Mat4,
    pub mvp: Mat4,
    pub normal_matrix: Mat3,
    /// Direction towards the light, in eye space.
    pub light_direction_view: Vec3,
    pub alpha_threshold: f32,
    pub torch_attenuation: f32,
    pub shadow: Option<ShadowUniforms>,
    /// View-projection per cube face for layered rendering.
    pub cube_mvps: Option<[Mat4; 6]>,
}

impl Default for PassUniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            light_direction_view: Vec3::Z,
            alpha_threshold: 0.5,
            torch_attenuation: 0.0,
            shadow: None,
            cube_mvps: None,
        }
    }
}

/// Lit material colors, premixed with the frame's light.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MaterialUniforms {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub torch_diffuse: Vec3,
    pub emissive: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub alpha: f32,
}

/// Host textures bound for a draw, by slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureBindings {
    pub diffuse: Option<TextureId>,
    pub emissive: Option<TextureId>,
    pub bump: Option<TextureId>,
    pub height: Option<TextureId>,
}

impl TextureBindings {
    pub const DIFFUSE_SLOT: u32 = 0;
    pub const EMISSIVE_SLOT: u32 = 1;
    pub const BUMP_SLOT: u32 = 2;
    pub const HEIGHT_SLOT: u32 = 3;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProgramPass {
    /// Depth only, alpha tested.
    Depth,
    #[default]
    Shaded,
}

/// Selects the shader program variant for a draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub pass: ProgramPass,
    pub pixel_lighting: bool,
    pub shadows: bool,
    pub shadow_filter: ShadowFilterQuality,
    pub bump: bool,
    pub height: bool,
    pub torch: bool,
    /// Writes all cube faces in one draw.
    pub layered: bool,
    pub diffuse_texture: bool,
    pub emissive_texture: bool,
    pub alpha_test: bool,
}

/// A material batch of the scene mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchDraw {
    pub program: ProgramKey,
    /// `None` for depth-only draws.
    pub material: Option<MaterialUniforms>,
    pub textures: TextureBindings,
    pub blend: BlendMode,
    pub cull_back_faces: bool,
    pub first_index: u32,
    pub index_count: u32,
}

#[derive(Debug)]
pub enum CubeSource<'a, T> {
    Cube(&'a T),
    /// One 2-D target per face, drawn face by face.
    Faces([&'a T; 6]),
}

/// The subdivided cube, already projected to window coordinates.
#[derive(Debug)]
pub struct CubeMeshDraw<'a, T> {
    pub positions: &'a [Vec3],
    /// Cube-space directions, used as texture coordinates for cube sources.
    pub directions: &'a [Vec3],
    /// Per-face coordinates, used for [`CubeSource::Faces`].
    pub texcoords: &'a [Vec2],
    pub indices: &'a [u16],
    pub source: CubeSource<'a, T>,
    pub blend: BlendMode,
}

impl<T> CubeMeshDraw<'_, T> {
    pub fn face_index_count(&self) -> usize {
        self.indices.len() / 6
    }
}

#[derive(Debug)]
pub enum DrawCommand<'a, T> {
    Batch(BatchDraw),
    CubeMesh(CubeMeshDraw<'a, T>),
}

/// One render pass: where to draw, what to clear, fixed-function state,
/// program inputs and draws.
#[derive(Debug)]
pub struct Pass<'a, T> {
    pub label: &'static str,
    pub target: RenderTarget<'a, T>,
    pub clear: ClearFlags,
    pub viewport: Viewport,
    pub raster: RasterState,
    pub uniforms: PassUniforms,
    /// Shadow maps bound from [`SHADOW_SLOT_BASE`] upwards.
    pub shadow_maps: Vec<&'a T>,
    pub commands: Vec<DrawCommand<'a, T>>,
}

impl<'a, T> Pass<'a, T> {
    pub fn new(label: &'static str, target: RenderTarget<'a, T>, viewport: Viewport) -> Self {
        Self {
            label,
            target,
            clear: ClearFlags::NONE,
            viewport,
            raster: RasterState::default(),
            uniforms: PassUniforms::default(),
            shadow_maps: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_clear(mut self, clear: ClearFlags) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_raster(mut self, raster: RasterState) -> Self {
        self.raster = raster;
        self
    }

    pub fn with_uniforms(mut self, uniforms: PassUniforms) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                DrawCommand::Batch(_) => 1,
                DrawCommand::CubeMesh(mesh) => match mesh.source {
                    CubeSource::Cube(_) => 1,
                    CubeSource::Faces(_) => 6,
                },
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_sources_count_six_draws() {
        let target = 7u32;
        let positions = vec![Vec3::ZERO; 4];
        let indices = vec![0u16; 36];
        let mut pass = Pass::new("test", RenderTarget::<u32>::Screen, Viewport::square(4));
        pass.commands.push(DrawCommand::CubeMesh(CubeMeshDraw {
            positions: &positions,
            directions: &positions,
            texcoords: &[],
            indices: &indices,
            source: CubeSource::Faces([&target; 6]),
            blend: BlendMode::PremultipliedOver,
        }));
        pass.commands.push(DrawCommand::Batch(BatchDraw {
            program: ProgramKey::default(),
            material: None,
            textures: TextureBindings::default(),
            blend: BlendMode::Opaque,
            cull_back_faces: true,
            first_index: 0,
            index_count: 3,
        }));
        assert_eq!(pass.draw_calls(), 7);
    }

    #[test]
    fn test_attachment_layer() {
        let target = 1u32;
        assert_eq!(Attachment::Layer(&target, 3).layer(), Some(3));
        assert_eq!(Attachment::Target(&target).layer(), None);
        assert_eq!(*Attachment::Layer(&target, 3).target(), 1);
    }

    #[test]
    fn test_builders() {
        let pass = Pass::new("p", RenderTarget::<u32>::Screen, Viewport::square(2))
            .with_clear(ClearFlags::DEPTH)
            .with_raster(RasterState {
                cull: CullMode::Back,
                ..Default::default()
            });
        assert_eq!(pass.clear, ClearFlags::DEPTH);
        assert_eq!(pass.raster.cull, CullMode::Back);
        assert!(pass.raster.depth_test);
    }
}
