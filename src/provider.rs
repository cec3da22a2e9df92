//! # Astronomical Provider
//!
//! The engine never computes positions itself. Everything it needs from an
//! ephemeris goes through [`AstronomyProvider`], which callers inject. The
//! crate ships [`crate::ephemeris::AlmanacProvider`] as a low-precision
//! default; tests use hand-written stubs.
//!
//! All methods are fallible. A provider error is never fatal to the caller:
//! the forecaster drops the affected category for that cycle, the rotation
//! engine falls back to standard time, and the lunar lane falls back to the
//! mean synodic phase.

use crate::GeoPosition;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by an [`AstronomyProvider`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Search ran to its limit without finding the event
    #[error("no {what} found within {within_days} days")]
    NotFound { what: &'static str, within_days: u32 },

    /// Arguments outside the provider's supported domain
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Numerical failure inside the provider
    #[error("computation failed: {0}")]
    Computation(String),
}

/// Eclipse classification at greatest eclipse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EclipseKind {
    Total,
    Annular,
    Partial,
    Penumbral,
}

impl EclipseKind {
    pub fn label(&self) -> &'static str {
        match self {
            EclipseKind::Total => "TOTAL",
            EclipseKind::Annular => "ANNULAR",
            EclipseKind::Partial => "PARTIAL",
            EclipseKind::Penumbral => "PENUMBRAL",
        }
    }
}

/// A geocentric eclipse: when it peaks and how deep it gets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalEclipse {
    pub peak: DateTime<Utc>,
    pub kind: EclipseKind,
}

/// Outer planets that can reach opposition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Planet {
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Planet {
    pub const OUTER: [Planet; 5] = [
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Planet::Mars => "MARS",
            Planet::Jupiter => "JUPITER",
            Planet::Saturn => "SATURN",
            Planet::Uranus => "URANUS",
            Planet::Neptune => "NEPTUNE",
        }
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equinoxes and solstices, in the order the Sun reaches them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonMarker {
    VernalEquinox,
    SummerSolstice,
    AutumnalEquinox,
    WinterSolstice,
}

impl SeasonMarker {
    /// Marker reached when the Sun's apparent longitude crosses `quadrant * 90°`.
    pub fn from_quadrant(quadrant: u8) -> Self {
        match quadrant % 4 {
            0 => SeasonMarker::VernalEquinox,
            1 => SeasonMarker::SummerSolstice,
            2 => SeasonMarker::AutumnalEquinox,
            _ => SeasonMarker::WinterSolstice,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeasonMarker::VernalEquinox => "VERNAL EQUINOX",
            SeasonMarker::SummerSolstice => "SUMMER SOLSTICE",
            SeasonMarker::AutumnalEquinox => "AUTUMNAL EQUINOX",
            SeasonMarker::WinterSolstice => "WINTER SOLSTICE",
        }
    }
}

/// The astronomical capability the engine depends on.
///
/// Implementations must be pure with respect to their inputs; the forecaster
/// may call them from a blocking worker thread.
pub trait AstronomyProvider: Send + Sync {
    /// UTC instant of local apparent noon on the observer's solar day
    /// containing `t`.
    fn solar_noon(&self, t: DateTime<Utc>, position: GeoPosition)
        -> Result<DateTime<Utc>, ProviderError>;

    /// Position in the synodic month: 0 = new, 0.5 = full, approaching 1
    /// towards the next new moon.
    fn moon_phase_fraction(&self, t: DateTime<Utc>) -> Result<f64, ProviderError>;

    /// Next solar eclipse visible anywhere on Earth, peaking after `after`.
    fn next_global_solar_eclipse(&self, after: DateTime<Utc>)
        -> Result<GlobalEclipse, ProviderError>;

    /// Whether any phase of the eclipse is visible from `position` within
    /// `window` either side of the global peak.
    fn local_solar_eclipse_visible(
        &self,
        peak: DateTime<Utc>,
        window: Duration,
        position: GeoPosition,
    ) -> Result<bool, ProviderError>;

    /// Next lunar eclipse (penumbral or deeper) peaking after `after`.
    fn next_lunar_eclipse(&self, after: DateTime<Utc>) -> Result<GlobalEclipse, ProviderError>;

    /// Apparent altitude of the Moon in degrees, refraction included.
    fn lunar_altitude(&self, t: DateTime<Utc>, position: GeoPosition)
        -> Result<f64, ProviderError>;

    /// Earth-centre to Moon-centre distance in kilometres.
    fn geocentric_lunar_distance_km(&self, t: DateTime<Utc>) -> Result<f64, ProviderError>;

    /// First full moon strictly after `after`.
    fn next_full_moon(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError>;

    /// First opposition of `planet` strictly after `after`.
    fn next_opposition(&self, planet: Planet, after: DateTime<Utc>)
        -> Result<DateTime<Utc>, ProviderError>;

    /// First equinox or solstice strictly after `after`.
    fn next_season_marker(
        &self,
        after: DateTime<Utc>,
    ) -> Result<(SeasonMarker, DateTime<Utc>), ProviderError>;
}
