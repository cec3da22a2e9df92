//! # Equinox Reference Table
//!
//! Vernal equinox instants that open each cycle of the solar arc. The table is
//! process-wide immutable data, parsed once on first use.
//!
//! Lookups are only defined strictly inside the table's span: an instant
//! before the first entry, or at/after the last one, has no bracketing pair
//! and yields [`TableError::OutsideTable`].

use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use thiserror::Error;

/// One cycle boundary: the UTC instant of a vernal equinox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquinoxEntry {
    pub cycle_year: i32,
    pub instant: DateTime<Utc>,
}

/// Errors raised by table lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// No entry at or before the instant, or no entry after it
    #[error("{instant} is outside the equinox table")]
    OutsideTable { instant: DateTime<Utc> },
}

/// Vernal equinoxes, UTC, minute precision.
const EQUINOX_SOURCE: [(i32, &str); 7] = [
    (2024, "2024-03-20T03:06:00Z"),
    (2025, "2025-03-20T09:01:00Z"),
    (2026, "2026-03-20T14:46:00Z"),
    (2027, "2027-03-20T20:25:00Z"),
    (2028, "2028-03-20T02:17:00Z"),
    (2029, "2029-03-20T08:01:00Z"),
    (2030, "2030-03-20T13:51:00Z"),
];

/// The built-in equinox table, strictly increasing in `instant`.
pub fn equinox_table() -> &'static [EquinoxEntry] {
    static TABLE: OnceLock<Vec<EquinoxEntry>> = OnceLock::new();
    TABLE.get_or_init(|| {
        EQUINOX_SOURCE
            .iter()
            .map(|&(cycle_year, timestamp)| EquinoxEntry {
                cycle_year,
                instant: DateTime::parse_from_rfc3339(timestamp)
                    .expect("equinox timestamps should be valid RFC 3339")
                    .with_timezone(&Utc),
            })
            .collect()
    })
}

/// The pair of entries surrounding an instant.
#[derive(Clone, Copy, Debug)]
pub struct Bracket<'a> {
    /// Latest entry with `instant <= t`
    pub current: &'a EquinoxEntry,
    /// The entry after `current`
    pub next: &'a EquinoxEntry,
}

/// Locate the entries bracketing `t`.
pub fn bracket(table: &[EquinoxEntry], t: DateTime<Utc>) -> Result<Bracket<'_>, TableError> {
    // Count of entries at or before t; the current cycle starts at idx - 1
    let idx = table.partition_point(|entry| entry.instant <= t);
    if idx == 0 || idx >= table.len() {
        return Err(TableError::OutsideTable { instant: t });
    }
    Ok(Bracket {
        current: &table[idx - 1],
        next: &table[idx],
    })
}
