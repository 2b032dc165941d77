//! Cascaded shadow maps for a single directional light.
//!
//! The view frustum is clamped to the scene and split into cascades. For
//! each split a convex focus body bounds every point that can cast or
//! receive a shadow inside it, and the light's orthographic projection is
//! cropped to that body before the casters are drawn depth-only.

pub mod cascade;
pub mod crop;
pub mod focus;
mod renderer;

pub use cascade::{
    SPLIT_OVERLAP, SplitRange, adjust_frustum, auto_split_weight, compute_splits,
    resolve_split_weight, split_clip_depths,
};
pub use crop::{BIAS_MATRIX, CROP_QUANTIZER, CropFit, compute_crop_matrix};
pub use focus::{LightVolume, compute_focus_body, light_up, light_view};
pub use renderer::{
    MIN_TEXTURE_UNITS, SHADOW_DEPTH_BIAS, SHADOWS_UNAVAILABLE_NOTICE, ShadowFrame, ShadowInputs,
    ShadowRenderer, ShadowSettings, ShadowSplit,
};
