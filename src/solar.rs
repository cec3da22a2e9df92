//! # Solar Arc
//!
//! Converts an instant into progress through the idealized 360-unit year.
//!
//! One unit is one day since the last vernal equinox. The real tropical year
//! is about 365.24 days, so the idealized cycle runs out before the next
//! equinox arrives. From day 360 onward the calculator stops extrapolating and
//! reports an anomaly, with a countdown to the next table entry.
//!
//! ```text
//!  equinox                              day 360          next equinox
//!     |------------- arc 0..=360 -----------|---- anomaly ----|
//! ```

use crate::equinox::{bracket, equinox_table, EquinoxEntry, TableError};
use crate::{Countdown, SolarState};
use chrono::{DateTime, Utc};

/// Length of the idealized cycle, in arc units (days).
pub const IDEAL_CYCLE_UNITS: f64 = 360.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Solar state at `now` against the built-in equinox table.
pub fn solar_state(now: DateTime<Utc>) -> Result<SolarState, TableError> {
    solar_state_in(equinox_table(), now)
}

/// Solar state at `now` against an arbitrary equinox table.
///
/// Exactly 360 elapsed days is still arc-bearing; anything beyond is an
/// anomaly.
pub fn solar_state_in(table: &[EquinoxEntry], now: DateTime<Utc>) -> Result<SolarState, TableError> {
    let cycle = bracket(table, now)?;
    let days_elapsed = fractional_days(cycle.current.instant, now);

    if days_elapsed <= IDEAL_CYCLE_UNITS {
        Ok(SolarState::from_arc(days_elapsed))
    } else {
        Ok(SolarState::anomaly(Countdown::between(
            now,
            cycle.next.instant,
        )))
    }
}

/// Fractional days from `from` to `to`, millisecond resolution.
fn fractional_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}
