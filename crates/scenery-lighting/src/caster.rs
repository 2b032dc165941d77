use glam::Vec3;
use scenery_scene::{CelestialBody, SkySnapshot};

/// Body whose light casts shadows this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadowCaster {
    #[default]
    None,
    Sun,
    Moon,
    Venus,
}

impl ShadowCaster {
    pub fn body(self) -> Option<CelestialBody> {
        match self {
            ShadowCaster::None => None,
            ShadowCaster::Sun => Some(CelestialBody::Sun),
            ShadowCaster::Moon => Some(CelestialBody::Moon),
            ShadowCaster::Venus => Some(CelestialBody::Venus),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShadowCaster::None => "None",
            ShadowCaster::Sun => "Sun",
            ShadowCaster::Moon => "Moon",
            ShadowCaster::Venus => "Venus",
        }
    }
}

/// Body the shadow maps are rendered from, with its direction.
///
/// The first of Sun and Moon above the horizon wins; otherwise Venus is used
/// whatever its altitude, so the shadow maps always have a light direction.
pub fn select_shadow_caster(sky: &SkySnapshot) -> (ShadowCaster, Vec3) {
    if sky.sun.altitude_sine() > 0.0 {
        (ShadowCaster::Sun, sky.sun.direction)
    } else if sky.moon.altitude_sine() > 0.0 {
        (ShadowCaster::Moon, sky.moon.direction)
    } else {
        (ShadowCaster::Venus, sky.venus.direction)
    }
}
