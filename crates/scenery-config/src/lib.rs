//! Configuration for the scenery renderer.
//!
//! Settings persist to disk as a RON file, can be overridden from the command
//! line via clap and support hot-reload detection. Unknown and missing fields
//! are tolerated so older and newer files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, CubemapConfig, CubemapMode, DebugConfig, LightingConfig, MAX_FRUSTUM_SPLITS,
    RenderConfig, ShadowConfig, ShadowFilterQuality, default_config_dir,
};
pub use error::ConfigError;
