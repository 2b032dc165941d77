//! Light source selection for the scenery renderer.
//!
//! Picks the single directional light (Sun, Moon or Venus) from the current
//! sky, derives ambient, directional, emissive and specular intensities, and
//! chooses the body that casts shadows.

mod caster;
mod selector;

pub use caster::{ShadowCaster, select_shadow_caster};
pub use selector::{
    LUNAR_BRIGHTNESS_FACTOR, LightingReport, LightingSettings, LightingState, MINIMUM_AMBIENT,
    VENUS_BRIGHTNESS_FACTOR, compute_lighting,
};
