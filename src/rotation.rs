//! # Rotation Engine
//!
//! Turns the time of day into a 0-360° rotation angle. Runs on every rendered
//! frame, so it holds no state, never blocks and never logs.
//!
//! ## Conventions
//! - **Standard**: `angle = seconds since local midnight / 86400 * 360`
//! - **True solar**: `angle = 180 + (t - solar noon) * 360 / 86400`, so the
//!   angle reads exactly 180° at local apparent noon
//!
//! True solar needs a position. Without one, or if the provider cannot
//! produce a solar noon, the engine quietly uses the standard convention.

use crate::provider::AstronomyProvider;
use crate::{GeoPosition, RotationMode};
use chrono::{DateTime, TimeZone, Timelike, Utc};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const DEGREES_PER_SECOND: f64 = 360.0 / SECONDS_PER_DAY;

/// Fold an angle into `[0, 360)` by adding or subtracting one turn.
///
/// Inputs within one turn of the range need a single fold. Anything further
/// out only happens when a provider breaks its contract, and is reduced with
/// a full modulo instead. Non-finite input yields 0.
pub fn normalize360(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let folded = if degrees < 0.0 {
        degrees + 360.0
    } else if degrees >= 360.0 {
        degrees - 360.0
    } else {
        degrees
    };
    if (0.0..360.0).contains(&folded) {
        folded
    } else {
        folded.rem_euclid(360.0)
    }
}

/// Standard-convention angle from the local wall-clock time of `now`.
pub fn standard_angle<Tz: TimeZone>(now: &DateTime<Tz>) -> f64 {
    let seconds = f64::from(now.num_seconds_from_midnight())
        + f64::from(now.nanosecond() % 1_000_000_000) / 1e9;
    normalize360(seconds / SECONDS_PER_DAY * 360.0)
}

/// True-solar angle of `now` given the solar noon of its solar day.
pub fn true_solar_angle(now: DateTime<Utc>, solar_noon: DateTime<Utc>) -> f64 {
    let offset_seconds = match (now - solar_noon).num_microseconds() {
        Some(micros) => micros as f64 / 1e6,
        None => return 0.0,
    };
    normalize360(180.0 + offset_seconds * DEGREES_PER_SECOND)
}

/// Rotation angle at `now` under `mode`.
///
/// `mode` and `position` are passed explicitly on every call; there is no
/// ambient mode state anywhere in the crate.
pub fn rotation_angle<P, Tz>(
    provider: &P,
    now: &DateTime<Tz>,
    mode: RotationMode,
    position: Option<GeoPosition>,
) -> f64
where
    P: AstronomyProvider + ?Sized,
    Tz: TimeZone,
{
    match (mode, position) {
        (RotationMode::TrueSolar, Some(position)) => {
            let utc = now.with_timezone(&Utc);
            match provider.solar_noon(utc, position) {
                Ok(noon) => true_solar_angle(utc, noon),
                Err(_) => standard_angle(now),
            }
        }
        _ => standard_angle(now),
    }
}

/// Three-decimal, zero-padded display form (`"007.500"`).
///
/// Angles that round up to a full turn read `000.000`.
pub fn format_angle(degrees: f64) -> String {
    let rounded = (degrees * 1_000.0).round() / 1_000.0;
    let shown = if rounded >= 360.0 { rounded - 360.0 } else { rounded };
    format!("{:07.3}", shown)
}
