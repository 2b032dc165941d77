//! Render backend abstraction: render targets, pass descriptions and the
//! backends that execute them.
//!
//! The shadow, cubemap and scene drawing code describe every GPU pass as a
//! [`Pass`] value. [`RecordingBackend`] keeps those passes for inspection and
//! headless runs; [`WgpuBackend`] executes them on a wgpu device.

mod backend;
mod error;
mod pass;
mod recording;
mod wgpu_backend;

pub use backend::{BackendCapabilities, RenderBackend, TargetDesc, TargetKind};
pub use error::RenderError;
pub use pass::{
    Attachment, BatchDraw, BlendMode, ClearFlags, CubeMeshDraw, CubeSource, CullMode, DepthBias,
    DrawCommand, MaterialUniforms, Pass, PassUniforms, ProgramKey, ProgramPass, RasterState,
    RenderTarget, SHADOW_SLOT_BASE, ShadowUniforms, TextureBindings,
};
pub use recording::{RecordedCommand, RecordedPass, RecordedTarget, RecordedTargetRef, RecordingBackend};
pub use wgpu_backend::{GL_TO_WGPU_DEPTH, ScenePassContext, SceneEncoder, WgpuBackend, WgpuTarget};
