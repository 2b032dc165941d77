//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for the number of shadow cascade splits.
pub const MAX_FRUSTUM_SPLITS: u32 = 4;

/// Top-level renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Material shading settings.
    pub render: RenderConfig,
    /// Cascaded shadow map settings.
    pub shadow: ShadowConfig,
    /// Cubemap reprojection settings.
    pub cubemap: CubemapConfig,
    /// Light source and torch settings.
    pub lighting: LightingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// How the scene is captured for non-perspective sky projections.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum,
)]
pub enum CubemapMode {
    /// Six separate 2-D face targets, six draw passes.
    Textures,
    /// One cube target, six draw passes.
    #[default]
    Cubemap,
    /// One layered cube target filled in a single draw.
    CubemapGeometryAccelerated,
}

/// Percentage-closer filtering level used when sampling shadow maps.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum,
)]
pub enum ShadowFilterQuality {
    /// Single hardware-compared sample.
    Off,
    /// Small filter kernel.
    #[default]
    Low,
    /// Large filter kernel.
    High,
}

impl ShadowFilterQuality {
    /// The cheapest setting.
    pub const LOWEST: ShadowFilterQuality = ShadowFilterQuality::Off;
}

/// Material shading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Evaluate lighting per fragment instead of per vertex.
    pub pixel_lighting: bool,
    /// Use bump/height textures when materials provide them.
    pub bump_mapping: bool,
    /// Parallax scale applied to height textures.
    pub parallax_scale: f32,
}

/// Cascaded shadow map configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowConfig {
    /// Render shadows.
    pub enabled: bool,
    /// Edge length in texels of each square shadow map.
    pub shadowmap_size: u32,
    /// Number of cascade splits, clamped to 1..=4.
    pub frustum_splits: u32,
    /// Fixed blend between logarithmic and uniform splitting, or `None` to
    /// derive it from the scene extent.
    pub split_weight: Option<f32>,
    /// Shadow map filtering.
    pub filter_quality: ShadowFilterQuality,
}

/// Cubemap configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CubemapConfig {
    /// Capture strategy.
    pub mode: CubemapMode,
    /// Edge length in texels of each cube face.
    pub size: u32,
    /// Only regenerate the cubemap when the observer moves or the interval
    /// elapses.
    pub lazy_drawing: bool,
    /// Refresh interval for lazy drawing, in seconds of simulation time.
    pub lazy_interval_secs: f64,
}

/// Lighting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Carry a point light at the observer.
    pub torch_enabled: bool,
    /// Torch diffuse intensity.
    pub torch_brightness: f32,
    /// Distance at which the torch falls off to a quarter.
    pub torch_range: f32,
    /// Route every light channel into red only.
    pub night_vision: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log the lighting breakdown every frame.
    pub lighting_report: bool,
    /// Keep saved frustum corners for debug drawing.
    pub show_frusta: bool,
}

// --- Default implementations ---

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_lighting: true,
            bump_mapping: false,
            parallax_scale: 0.015,
        }
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shadowmap_size: 1024,
            frustum_splits: MAX_FRUSTUM_SPLITS,
            split_weight: None,
            filter_quality: ShadowFilterQuality::Low,
        }
    }
}

impl ShadowConfig {
    /// Split count clamped to the supported range.
    pub fn clamped_splits(&self) -> u32 {
        self.frustum_splits.clamp(1, MAX_FRUSTUM_SPLITS)
    }

    /// The override weight if it is a usable value.
    pub fn split_weight_override(&self) -> Option<f32> {
        self.split_weight.filter(|w| *w >= 0.0)
    }
}

impl Default for CubemapConfig {
    fn default() -> Self {
        Self {
            mode: CubemapMode::Cubemap,
            size: 1024,
            lazy_drawing: false,
            lazy_interval_secs: 2.0,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            torch_enabled: false,
            torch_brightness: 0.5,
            torch_range: 5.0,
            night_vision: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            lighting_report: false,
            show_frusta: false,
        }
    }
}

/// Platform configuration directory for the renderer, if one exists.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scenery3d"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
