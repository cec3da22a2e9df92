//! # Celestium Core Library
//!
//! This library translates real-world time (and, optionally, the observer's
//! position on Earth) into a synthetic celestial coordinate vector, and
//! forecasts the next notable event in the sky.
//!
//! ## The Celestial Vector
//!
//! Every reading is a five-field vector:
//!
//! ```text
//! 175k :: 358° . 005.000 . 07 | 123.456°
//! ^aeon   ^epoch ^solar arc ^lunar ^rotation
//! ```
//!
//! - **Aeon / Epoch**: fixed deep-time and precession-era counters
//! - **Solar arc**: days since the last vernal equinox on an idealized
//!   360-unit year. Once those 360 units are used up and the real equinox has
//!   not arrived yet, the arc is undefined and the vector reports an anomaly
//!   with a countdown instead
//! - **Lunar phase**: 0-29 index of the synodic month
//! - **Rotation**: 0-360° daily spin, from local midnight (standard) or from
//!   local apparent solar noon (true solar)
//!
//! ## Design
//!
//! Every calculator is a pure function of `(time, optional location)`. The
//! only process-wide data are the immutable equinox and sector tables. The
//! astronomical heavy lifting (solar noon, moon positions, eclipse geometry)
//! lives behind the [`provider::AstronomyProvider`] trait so that callers can
//! inject whichever ephemeris they trust; [`ephemeris::AlmanacProvider`] is the
//! built-in low-precision implementation.
//!
//! ### Data Flow
//! 1. **Solar lane** (~1 Hz): [`solar::solar_state`] → [`sector::sector_name`]
//! 2. **Lunar lane** (~1/60 Hz): provider phase fraction → [`lunar::phase_index`]
//! 3. **Frame path** (every rendered frame): [`rotation::rotation_angle`]
//! 4. **Forecast** (hourly and on location change): [`forecast::forecast`]
//!
//! [`scheduler::Scheduler`] wires the lanes together with their cadences.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod config;
pub mod ephemeris;
pub mod equinox;
pub mod forecast;
pub mod geolocation;
pub mod lunar;
pub mod provider;
pub mod renderer;
pub mod rotation;
pub mod scheduler;
pub mod sector;
pub mod solar;
pub mod vector;

/// A point on the Earth's surface in geodetic degrees.
///
/// Construct through [`GeoPosition::new`], which refuses non-finite or
/// out-of-range coordinates. Code that holds an `Option<GeoPosition>` treats
/// `None` as "no true-solar correction available".
///
/// # Example
/// ```
/// use celestium_lib::GeoPosition;
///
/// let greenwich = GeoPosition::new(51.4769, 0.0).unwrap();
/// assert_eq!(greenwich.latitude, 51.4769);
///
/// assert!(GeoPosition::new(f64::NAN, 0.0).is_none());
/// assert!(GeoPosition::new(91.0, 0.0).is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees, north positive (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees, east positive (-180 to 180)
    pub longitude: f64,
}

impl GeoPosition {
    /// Validate and build a position; `None` means "no data".
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Convention used to turn the time of day into a rotation angle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationMode {
    /// 0° at local wall-clock midnight
    #[default]
    Standard,
    /// 180° at local apparent solar noon; needs a [`GeoPosition`]
    TrueSolar,
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Standard => f.write_str("STANDARD"),
            RotationMode::TrueSolar => f.write_str("TRUE_SOLAR"),
        }
    }
}

/// Quarter of the idealized solar cycle, or the anomaly interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
    /// The idealized 360 units are exhausted but the next equinox is pending
    Anomaly,
}

impl Season {
    /// Map a solar arc onto its 90-degree band.
    ///
    /// `[0,90)` Spring, `[90,180)` Summer, `[180,270)` Autumn, and
    /// everything from 270 up (including exactly 360) Winter.
    pub fn from_arc(arc: f64) -> Self {
        if arc < 90.0 {
            Season::Spring
        } else if arc < 180.0 {
            Season::Summer
        } else if arc < 270.0 {
            Season::Autumn
        } else {
            Season::Winter
        }
    }

    /// Display label shown on the HUD.
    pub fn label(&self) -> &'static str {
        match self {
            Season::Spring => "Spring (Growth)",
            Season::Summer => "Summer (Ascension)",
            Season::Autumn => "Autumn (Harvest)",
            Season::Winter => "Winter (Dormancy)",
            Season::Anomaly => "Calibration",
        }
    }
}

/// Whole days, hours, minutes and seconds left until an instant.
///
/// Negative spans clamp to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn from_duration(span: Duration) -> Self {
        let total = span.num_seconds().max(0);
        Countdown {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    /// Countdown from `now` until `target`.
    pub fn between(now: DateTime<Utc>, target: DateTime<Utc>) -> Self {
        Self::from_duration(target - now)
    }

    pub fn total_seconds(&self) -> i64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Output of the solar arc calculator.
///
/// Exactly one of two shapes holds:
/// - **arc-bearing**: `arc` is `Some`, no countdown, season from the arc
/// - **anomaly**: `arc` is `None`, countdown to the next equinox,
///   season [`Season::Anomaly`]
///
/// The fields are private so the two shapes can only be built through
/// [`SolarState::from_arc`] and [`SolarState::anomaly`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarState {
    arc: Option<f64>,
    is_anomaly: bool,
    countdown: Option<Countdown>,
    season: Season,
}

impl SolarState {
    pub fn from_arc(arc: f64) -> Self {
        SolarState {
            arc: Some(arc),
            is_anomaly: false,
            countdown: None,
            season: Season::from_arc(arc),
        }
    }

    pub fn anomaly(countdown: Countdown) -> Self {
        SolarState {
            arc: None,
            is_anomaly: true,
            countdown: Some(countdown),
            season: Season::Anomaly,
        }
    }

    pub fn arc(&self) -> Option<f64> {
        self.arc
    }

    pub fn is_anomaly(&self) -> bool {
        self.is_anomaly
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn season(&self) -> Season {
        self.season
    }

    /// Arc with three decimals (`"5.000"`), or `None` during an anomaly.
    pub fn arc_text(&self) -> Option<String> {
        self.arc.map(|arc| format!("{:.3}", arc))
    }
}

/// Kind of sky event the forecaster can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    EclipseSolar,
    EclipseLunar,
    Supermoon,
    Micromoon,
    PlanetaryOpposition,
    /// Equinox or solstice
    SeasonMarker,
}

impl EventCategory {
    /// Short badge shown next to the event name.
    pub fn badge(&self) -> &'static str {
        match self {
            EventCategory::EclipseSolar | EventCategory::SeasonMarker => "SOLAR",
            EventCategory::EclipseLunar => "LUNAR",
            EventCategory::Supermoon => "SUPERMOON",
            EventCategory::Micromoon => "MICROMOON",
            EventCategory::PlanetaryOpposition => "PLANET",
        }
    }
}

/// A forecast event. Built fresh on every forecast call and never mutated.
///
/// # Example
/// ```
/// use celestium_lib::{CosmicEvent, EventCategory};
/// use chrono::{TimeZone, Utc};
///
/// let event = CosmicEvent {
///     category: EventCategory::EclipseSolar,
///     label: "TOTAL SOLAR ECLIPSE".to_string(),
///     instant: Utc.with_ymd_and_hms(2024, 4, 8, 18, 17, 0).unwrap(),
/// };
/// let now = Utc.with_ymd_and_hms(2024, 3, 27, 12, 0, 0).unwrap();
///
/// assert_eq!(event.formatted_date(), "Apr 08, 2024 18:17");
/// assert_eq!(event.time_until(now), "12 DAYS");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CosmicEvent {
    pub category: EventCategory,
    pub label: String,
    pub instant: DateTime<Utc>,
}

impl CosmicEvent {
    /// Date in `"Mar 20, 2025 03:06"` form, in UTC. The HUD labels it so.
    pub fn formatted_date(&self) -> String {
        self.formatted_date_in(&Utc)
    }

    /// Date in `"Mar 20, 2025 03:06"` form on the wall clock of `zone`.
    pub fn formatted_date_in<Tz>(&self, zone: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.instant
            .with_timezone(zone)
            .format("%b %d, %Y %H:%M")
            .to_string()
    }

    /// Whole days until the event, e.g. `"12 DAYS"`.
    pub fn time_until(&self, now: DateTime<Utc>) -> String {
        let days = (self.instant - now).num_seconds().max(0) / 86_400;
        format!("{} DAYS", days)
    }

    pub fn badge(&self) -> &'static str {
        self.category.badge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_formatted_date_follows_zone() {
        let event = CosmicEvent {
            category: EventCategory::EclipseLunar,
            label: "TOTAL LUNAR ECLIPSE".to_string(),
            instant: Utc.with_ymd_and_hms(2025, 3, 14, 6, 58, 0).unwrap(),
        };
        let honolulu = FixedOffset::west_opt(10 * 3600).unwrap();

        assert_eq!(event.formatted_date(), "Mar 14, 2025 06:58");
        assert_eq!(event.formatted_date_in(&honolulu), "Mar 13, 2025 20:58");
    }
}
