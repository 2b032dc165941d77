//! Per-frame lighting intensities from the positions of Sun, Moon and Venus.
//!
//! Solar ambient fades in from 18 degrees below the horizon; the Sun only
//! becomes the directional light once it is up. At night a bright enough Moon
//! or Venus take over, reduced by the ambient light that washes them out.
//! Square roots of the altitude sine brighten the light sooner than
//! Lambert's law would.

use std::fmt;

use glam::Vec3;
use scenery_scene::SkySnapshot;

use crate::ShadowCaster;

pub const MINIMUM_AMBIENT: f32 = 0.075;
pub const LUNAR_BRIGHTNESS_FACTOR: f32 = 0.2;
pub const VENUS_BRIGHTNESS_FACTOR: f32 = 0.005;

#[derive(Clone, Debug, PartialEq)]
pub struct LightingSettings {
    /// Report a shadow caster at all.
    pub shadows_enabled: bool,
    pub torch_enabled: bool,
    pub torch_brightness: f32,
    pub torch_range: f32,
    /// Route every channel into red only.
    pub night_vision: bool,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            torch_enabled: false,
            torch_brightness: 0.5,
            torch_range: 5.0,
            night_vision: false,
        }
    }
}

/// Breakdown of the light contributions, for debug output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightingReport {
    pub ambient_brightness: f32,
    pub directional_brightness: f32,
    pub emissive_factor: f32,
    pub sun_ambient: f32,
    pub moon_ambient: f32,
    pub background_ambient: f32,
    pub directional_source: &'static str,
    pub caster: ShadowCaster,
    pub light_direction: Vec3,
}

impl fmt::Display for LightingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ambient: {:6.4} Directional: {:6.4}. Shadows cast by: {} from {:6.4}/{:6.4}/{:6.4}",
            self.ambient_brightness,
            self.directional_brightness,
            self.caster.name(),
            self.light_direction.x,
            self.light_direction.y,
            self.light_direction.z
        )?;
        writeln!(
            f,
            "Contributions: Ambient     Sun: {:6.4}, Moon: {:6.4}, Background: {:6.4}",
            self.sun_ambient, self.moon_ambient, self.background_ambient
        )?;
        write!(
            f,
            "               Directional {:6.4} by: {}, emissive factor: {:6.4}",
            self.directional_brightness, self.directional_source, self.emissive_factor
        )
    }
}

/// Light colors and directions for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingState {
    pub caster: ShadowCaster,
    /// Unit direction toward the directional light, horizontal frame.
    pub light_direction: Vec3,
    pub ambient: Vec3,
    pub directional: Vec3,
    pub emissive: Vec3,
    pub specular: Vec3,
    pub torch_diffuse: Vec3,
    pub torch_attenuation: f32,
    pub report: LightingReport,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            caster: ShadowCaster::None,
            light_direction: Vec3::Z,
            ambient: Vec3::splat(MINIMUM_AMBIENT),
            directional: Vec3::ZERO,
            emissive: Vec3::ZERO,
            specular: Vec3::ZERO,
            torch_diffuse: Vec3::ZERO,
            torch_attenuation: 1.0 / 25.0,
            report: LightingReport::default(),
        }
    }
}

/// Night-time directional term of Moon or Venus after ambient washout.
fn night_directional(sin_alt: f32, illuminated: f32, factor: f32, ambient: f32) -> f32 {
    let brightness = sin_alt.sqrt() * illuminated * factor - (ambient - 0.05) / 2.0;
    brightness.max(0.0)
}

/// Emissive factor when the host supplies no lightscape brightness.
fn emissive_from_sun(sun_sin: f32) -> f32 {
    if sun_sin < -0.14 {
        1.0
    } else if sun_sin < -0.05 {
        1.0 - (sun_sin + 0.14) / (-0.05 + 0.14)
    } else {
        0.0
    }
}

pub fn compute_lighting(sky: &SkySnapshot, settings: &LightingSettings) -> LightingState {
    let sun_sin = sky.sun.altitude_sine();
    let moon_sin = sky.moon.altitude_sine();
    let venus_sin = sky.venus.altitude_sine();

    let mut ambient = MINIMUM_AMBIENT;
    let mut directional = 0.0f32;
    let mut caster = ShadowCaster::None;
    let mut light_direction = sky.sun.direction;
    let mut directional_source = "(Sun, below horiz.)";

    let emissive_factor = sky
        .lightscape_brightness
        .unwrap_or_else(|| emissive_from_sun(sun_sin));

    let sun_ambient = if sun_sin > -0.3 {
        (sun_sin + 0.3).min(0.3)
    } else {
        0.0
    };
    ambient += sun_ambient;

    let moon_ambient = if moon_sin > 0.0 {
        (moon_sin * sky.moon.illuminated_fraction()).sqrt() * LUNAR_BRIGHTNESS_FACTOR
    } else {
        0.0
    };
    ambient += moon_ambient;

    let cast = |body: ShadowCaster| {
        if settings.shadows_enabled {
            body
        } else {
            ShadowCaster::None
        }
    };

    if sun_sin > 0.0 {
        directional = (sun_sin + 0.1).sqrt().min(0.7);
        caster = cast(ShadowCaster::Sun);
        directional_source = "Sun";
    } else if moon_sin > 0.0 {
        directional = night_directional(
            moon_sin,
            sky.moon.illuminated_fraction(),
            LUNAR_BRIGHTNESS_FACTOR,
            ambient,
        );
        directional_source = "Moon";
        if directional > 0.0 {
            light_direction = sky.moon.direction;
            caster = cast(ShadowCaster::Moon);
        }
    } else if venus_sin > 0.0 {
        directional = night_directional(
            venus_sin,
            sky.venus.illuminated_fraction(),
            VENUS_BRIGHTNESS_FACTOR,
            ambient,
        );
        if directional > 0.0 {
            light_direction = sky.venus.direction;
            caster = cast(ShadowCaster::Venus);
            directional_source = "Venus";
        } else {
            directional_source = "(Venus, flooded by ambient)";
        }
    }

    let specular = (ambient * directional * 5.0).min(1.0);
    let torch = if settings.torch_enabled {
        settings.torch_brightness
    } else {
        0.0
    };

    let channel = |v: f32| {
        if settings.night_vision {
            Vec3::new(v, 0.0, 0.0)
        } else {
            Vec3::splat(v)
        }
    };

    tracing::trace!(ambient, directional, caster = caster.name(), "lighting computed");

    LightingState {
        caster,
        light_direction,
        ambient: channel(ambient),
        directional: channel(directional),
        emissive: channel(emissive_factor),
        specular: channel(specular),
        torch_diffuse: channel(torch),
        torch_attenuation: 1.0 / (settings.torch_range * settings.torch_range),
        report: LightingReport {
            ambient_brightness: ambient,
            directional_brightness: directional,
            emissive_factor,
            sun_ambient,
            moon_ambient,
            background_ambient: MINIMUM_AMBIENT,
            directional_source,
            caster,
            light_direction,
        },
    }
}
