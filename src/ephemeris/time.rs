//! Julian-day conversions and sidereal time.
//!
//! UTC is used directly as the dynamical time scale; the ~70 s ΔT is below
//! the precision of the series used here.

use crate::provider::ProviderError;
use chrono::{DateTime, Utc};

pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
pub const J2000_JD: f64 = 2_451_545.0;
pub const DAYS_PER_CENTURY: f64 = 36_525.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn julian_day(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

pub fn from_julian_day(jd: f64) -> Result<DateTime<Utc>, ProviderError> {
    if !jd.is_finite() {
        return Err(ProviderError::Computation(format!("non-finite Julian day {jd}")));
    }
    let millis = ((jd - UNIX_EPOCH_JD) * MILLIS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ProviderError::Computation(format!("Julian day {jd} out of range")))
}

/// Julian centuries since J2000.0.
pub fn centuries_since_j2000(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

/// Greenwich mean sidereal time in degrees, `[0, 360)`.
pub fn gmst_deg(jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    (280.460_618_37 + 360.985_647_366_29 * (jd - J2000_JD) + 0.000_387_933 * t * t)
        .rem_euclid(360.0)
}
