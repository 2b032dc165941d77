//! Celestial light sources as seen from the observer.

use glam::Vec3;

/// Bodies that can light the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CelestialBody {
    Sun,
    Moon,
    Venus,
}

impl CelestialBody {
    pub const ALL: [CelestialBody; 3] = [CelestialBody::Sun, CelestialBody::Moon, CelestialBody::Venus];

    pub fn name(self) -> &'static str {
        match self {
            CelestialBody::Sun => "Sun",
            CelestialBody::Moon => "Moon",
            CelestialBody::Venus => "Venus",
        }
    }
}

/// Apparent position and phase of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    /// Unit direction in the horizontal frame (x east-ish, z up).
    pub direction: Vec3,
    /// Phase angle in radians; 0 is fully lit.
    pub phase_angle: f32,
}

impl BodyState {
    pub fn new(direction: Vec3, phase_angle: f32) -> Self {
        Self {
            direction: direction.normalize_or(Vec3::NEG_Z),
            phase_angle,
        }
    }

    /// Body at the given altitude (degrees) and azimuth (degrees, from +x
    /// toward +y).
    pub fn from_alt_az(altitude_deg: f32, azimuth_deg: f32, phase_angle: f32) -> Self {
        let (alt, az) = (altitude_deg.to_radians(), azimuth_deg.to_radians());
        Self::new(
            Vec3::new(alt.cos() * az.cos(), alt.cos() * az.sin(), alt.sin()),
            phase_angle,
        )
    }

    /// Sine of the altitude above the horizon.
    #[inline]
    pub fn altitude_sine(&self) -> f32 {
        self.direction.z
    }

    /// Fraction of the disc that is lit, `(cos(phase) + 1) / 2`.
    pub fn illuminated_fraction(&self) -> f32 {
        (self.phase_angle.cos() + 1.0) / 2.0
    }
}

/// Source of body positions, supplied by the host's sky simulation.
pub trait Ephemeris {
    fn body(&self, body: CelestialBody) -> BodyState;

    /// Current simulation time as a Julian day.
    fn julian_day(&self) -> f64;

    /// Brightness of the landscape's own illumination layer, if the host
    /// computes one.
    fn lightscape_brightness(&self) -> Option<f32> {
        None
    }
}

/// Every ephemeris input the lighting needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkySnapshot {
    pub sun: BodyState,
    pub moon: BodyState,
    pub venus: BodyState,
    pub lightscape_brightness: Option<f32>,
    pub julian_day: f64,
}

impl SkySnapshot {
    pub fn capture(ephemeris: &dyn Ephemeris) -> Self {
        Self {
            sun: ephemeris.body(CelestialBody::Sun),
            moon: ephemeris.body(CelestialBody::Moon),
            venus: ephemeris.body(CelestialBody::Venus),
            lightscape_brightness: ephemeris.lightscape_brightness(),
            julian_day: ephemeris.julian_day(),
        }
    }

    pub fn body(&self, body: CelestialBody) -> &BodyState {
        match body {
            CelestialBody::Sun => &self.sun,
            CelestialBody::Moon => &self.moon,
            CelestialBody::Venus => &self.venus,
        }
    }
}

/// Ephemeris with fixed values, for tests and offline rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedEphemeris {
    pub sun: BodyState,
    pub moon: BodyState,
    pub venus: BodyState,
    pub julian_day: f64,
    pub lightscape_brightness: Option<f32>,
}

impl Default for FixedEphemeris {
    fn default() -> Self {
        Self {
            sun: BodyState::from_alt_az(30.0, 135.0, 0.0),
            moon: BodyState::from_alt_az(-40.0, 0.0, 0.0),
            venus: BodyState::from_alt_az(-20.0, 270.0, 1.0),
            julian_day: 2_451_545.0,
            lightscape_brightness: None,
        }
    }
}

impl Ephemeris for FixedEphemeris {
    fn body(&self, body: CelestialBody) -> BodyState {
        match body {
            CelestialBody::Sun => self.sun,
            CelestialBody::Moon => self.moon,
            CelestialBody::Venus => self.venus,
        }
    }

    fn julian_day(&self) -> f64 {
        self.julian_day
    }

    fn lightscape_brightness(&self) -> Option<f32> {
        self.lightscape_brightness
    }
}
