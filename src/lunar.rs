//! Lunar phase index (30-phase month)
//!
//! The synodic month is split into 30 equal phases, numbered 0 – 29
//! (0 = new, 15 = full). The continuous phase fraction comes from the
//! injected provider; when the provider fails, the mean synodic month from
//! Schaefer's MOONFX routine (S&T, Apr 1994) stands in.
//! Accuracy of the mean fallback: about ±1 day against the true phase.

use crate::provider::{AstronomyProvider, ProviderError};
use chrono::{DateTime, Utc};
use log::warn;

/// Number of discrete phases in one synodic month.
pub const PHASE_COUNT: u8 = 30;

/// Mean synodic month length in days.
pub const MEAN_SYNODIC_MONTH_DAYS: f64 = 29.530_588_2;

/// Julian date of the reference new moon used by MOONFX (2000-01-06 14:24 UT).
const REFERENCE_NEW_MOON_JD: f64 = 2_451_550.1;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Discretize a phase fraction (0 = new, 0.5 = full) into 0 – 29.
///
/// The index is `floor(fraction * 30)`, so it never decreases across
/// `[0, 1)` and a fraction of exactly 1.0 wraps back to 0. Fractions outside
/// `[0, 1)` are folded in first; non-finite input counts as no data and
/// yields 0.
pub fn phase_index(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    let folded = fraction.rem_euclid(1.0);
    let index = (folded * f64::from(PHASE_COUNT)).floor() as u8;
    // Rounding in rem_euclid can land exactly on 1.0
    if index >= PHASE_COUNT {
        0
    } else {
        index
    }
}

/// Two-digit display form of a phase index.
pub fn phase_label(index: u8) -> String {
    format!("{:02}", index)
}

/// Phase fraction of the mean synodic month at `t`.
pub fn mean_phase_fraction(t: DateTime<Utc>) -> f64 {
    let jd = t.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD;
    let cycles = (jd - REFERENCE_NEW_MOON_JD) / MEAN_SYNODIC_MONTH_DAYS;
    cycles - cycles.floor()
}

/// Phase index at `t` from the provider.
pub fn lunar_phase<P>(provider: &P, t: DateTime<Utc>) -> Result<u8, ProviderError>
where
    P: AstronomyProvider + ?Sized,
{
    provider.moon_phase_fraction(t).map(phase_index)
}

/// Phase index at `t`, falling back to the mean month if the provider fails.
pub fn lunar_phase_or_mean<P>(provider: &P, t: DateTime<Utc>) -> u8
where
    P: AstronomyProvider + ?Sized,
{
    lunar_phase(provider, t).unwrap_or_else(|error| {
        warn!("Lunar phase from provider failed: {}; using mean synodic month", error);
        phase_index(mean_phase_fraction(t))
    })
}
