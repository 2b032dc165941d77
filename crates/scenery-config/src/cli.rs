//! Command-line argument parsing for the scenery renderer.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, CubemapMode, ShadowFilterQuality};

/// Scenery renderer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "scenery3d", about = "Scenery3d renderer")]
pub struct CliArgs {
    /// Enable or disable shadows.
    #[arg(long)]
    pub shadows: Option<bool>,

    /// Number of shadow cascade splits (1-4).
    #[arg(long)]
    pub splits: Option<u32>,

    /// Shadow map edge length in texels.
    #[arg(long)]
    pub shadowmap_size: Option<u32>,

    /// Shadow map filtering.
    #[arg(long, value_enum)]
    pub shadow_filter: Option<ShadowFilterQuality>,

    /// Cubemap capture strategy.
    #[arg(long, value_enum)]
    pub cubemap_mode: Option<CubemapMode>,

    /// Cubemap face edge length in texels.
    #[arg(long)]
    pub cubemap_size: Option<u32>,

    /// Lazy cubemap refresh interval in seconds; enables lazy drawing.
    #[arg(long)]
    pub lazy_interval: Option<f64>,

    /// Enable or disable the torch light.
    #[arg(long)]
    pub torch: Option<bool>,

    /// Enable night vision rendering.
    #[arg(long)]
    pub night_vision: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(enabled) = args.shadows {
            self.shadow.enabled = enabled;
        }
        if let Some(splits) = args.splits {
            self.shadow.frustum_splits = splits;
        }
        if let Some(size) = args.shadowmap_size {
            self.shadow.shadowmap_size = size;
        }
        if let Some(filter) = args.shadow_filter {
            self.shadow.filter_quality = filter;
        }
        if let Some(mode) = args.cubemap_mode {
            self.cubemap.mode = mode;
        }
        if let Some(size) = args.cubemap_size {
            self.cubemap.size = size;
        }
        if let Some(interval) = args.lazy_interval {
            self.cubemap.lazy_drawing = true;
            self.cubemap.lazy_interval_secs = interval;
        }
        if let Some(torch) = args.torch {
            self.lighting.torch_enabled = torch;
        }
        if let Some(night) = args.night_vision {
            self.lighting.night_vision = night;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            splits: Some(2),
            cubemap_mode: Some(CubemapMode::Textures),
            lazy_interval: Some(5.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.shadow.frustum_splits, 2);
        assert_eq!(config.cubemap.mode, CubemapMode::Textures);
        assert!(config.cubemap.lazy_drawing);
        assert_eq!(config.cubemap.lazy_interval_secs, 5.0);
        // Non-overridden fields retain defaults
        assert_eq!(config.shadow.shadowmap_size, 1024);
        assert!(config.shadow.enabled);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_value_enums() {
        let args = CliArgs::parse_from([
            "scenery3d",
            "--cubemap-mode",
            "cubemap-geometry-accelerated",
            "--shadow-filter",
            "high",
            "--shadows",
            "false",
        ]);
        assert_eq!(args.cubemap_mode, Some(CubemapMode::CubemapGeometryAccelerated));
        assert_eq!(args.shadow_filter, Some(ShadowFilterQuality::High));
        assert_eq!(args.shadows, Some(false));
    }
}
