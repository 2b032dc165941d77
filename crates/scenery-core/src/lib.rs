//! Scenery3d renderer core: observer, per-frame state, material batches
//! and the orchestration of shadow, cubemap and screen passes.

pub mod batches;
mod frame;
mod observer;
mod scenery;
mod strategy;

pub use batches::ShaderParameters;
pub use frame::{FrameState, MAX_SHADOW_FOV_DEG};
pub use observer::Observer;
pub use scenery::{DrawReport, Scenery3d};
pub use strategy::{CubemapDraw, DirectDraw, DrawContext, DrawPath, DrawStrategy};
