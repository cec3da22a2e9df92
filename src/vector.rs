//! # Celestial Vector
//!
//! Composes the five fields into the strings shown on screen:
//!
//! ```text
//! compact: 175k :: 358° . 5 . 15 | 123.456°
//! full:    175k :: 358° . 005.000 . 15 | 123.456°
//! ```
//!
//! During the anomaly interval (or outside the equinox table) the arc field
//! reads `NULL`, padded to the arc's width in the full form.

use crate::lunar::{lunar_phase_or_mean, phase_label};
use crate::provider::AstronomyProvider;
use crate::rotation::{format_angle, rotation_angle};
use crate::sector::{resolve_sector, SectorEntry};
use crate::solar::solar_state;
use crate::{GeoPosition, RotationMode, SolarState};
use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use serde::Serialize;

/// Deep-time counter.
pub const AEON: &str = "175k";

/// Precession-era counter.
pub const EPOCH: &str = "358°";

const NULL_ARC: &str = "NULL";

/// One reading of the five-field vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialVector {
    /// `None` when the instant falls outside the equinox table
    pub solar: Option<SolarState>,
    pub lunar_phase: u8,
    pub rotation_deg: f64,
}

impl CelestialVector {
    /// Read every field at `now`.
    pub fn at<P, Tz>(
        provider: &P,
        now: &DateTime<Tz>,
        mode: RotationMode,
        position: Option<GeoPosition>,
    ) -> Self
    where
        P: AstronomyProvider + ?Sized,
        Tz: TimeZone,
    {
        let utc = now.with_timezone(&Utc);
        let solar = solar_state(utc)
            .map_err(|error| warn!("Solar arc unavailable: {}", error))
            .ok();

        CelestialVector {
            solar,
            lunar_phase: lunar_phase_or_mean(provider, utc),
            rotation_deg: rotation_angle(provider, now, mode, position),
        }
    }

    pub fn arc(&self) -> Option<f64> {
        self.solar.and_then(|s| s.arc())
    }

    pub fn sector(&self) -> Option<&'static SectorEntry> {
        resolve_sector(self.arc())
    }

    /// Arc truncated to whole units.
    pub fn compact(&self) -> String {
        let arc = match self.arc() {
            Some(arc) => format!("{}", arc.floor() as i64),
            None => NULL_ARC.to_string(),
        };
        self.compose(&arc)
    }

    /// Arc zero-padded to `000.000`.
    pub fn full(&self) -> String {
        let arc = match self.arc() {
            Some(arc) => format!("{:07.3}", arc),
            None => format!("{:<8}", NULL_ARC),
        };
        self.compose(&arc)
    }

    fn compose(&self, arc: &str) -> String {
        format!(
            "{} :: {} . {} . {} | {}°",
            AEON,
            EPOCH,
            arc,
            phase_label(self.lunar_phase),
            format_angle(self.rotation_deg)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Countdown;

    fn vector(solar: Option<SolarState>) -> CelestialVector {
        CelestialVector {
            solar,
            lunar_phase: 7,
            rotation_deg: 123.4564,
        }
    }

    #[test]
    fn test_arc_bearing_strings() {
        let v = vector(Some(SolarState::from_arc(5.0)));
        assert_eq!(v.compact(), "175k :: 358° . 5 . 07 | 123.456°");
        assert_eq!(v.full(), "175k :: 358° . 005.000 . 07 | 123.456°");
        assert_eq!(v.sector().unwrap().name, "PISCES");
    }

    #[test]
    fn test_anomaly_strings() {
        let countdown = Countdown {
            days: 4,
            hours: 0,
            minutes: 0,
            seconds: 0,
        };
        let v = vector(Some(SolarState::anomaly(countdown)));
        assert_eq!(v.compact(), "175k :: 358° . NULL . 07 | 123.456°");
        assert_eq!(v.full(), "175k :: 358° . NULL     . 07 | 123.456°");
        assert!(v.sector().is_none());
    }

    #[test]
    fn test_outside_table_reads_null() {
        let v = vector(None);
        assert_eq!(v.arc(), None);
        assert!(v.full().contains(". NULL     ."));
    }

    #[test]
    fn test_high_arc_keeps_width() {
        let v = CelestialVector {
            solar: Some(SolarState::from_arc(354.9996)),
            lunar_phase: 29,
            rotation_deg: 0.0,
        };
        assert_eq!(v.full(), "175k :: 358° . 355.000 . 29 | 000.000°");
        assert_eq!(v.compact(), "175k :: 358° . 354 . 29 | 000.000°");
    }
}
