//! # Ecliptic Sectors
//!
//! Maps a solar arc onto one of the 13 constellations the Sun crosses along
//! the ecliptic, using the IAU boundaries (the traditional twelve plus
//! Ophiuchus).
//!
//! Each sector covers `[start, next start)`. Pisces straddles the 0/360 seam:
//! it starts at 351 and runs on until Aries at 29. The table therefore opens
//! and closes with Pisces, and arcs below the first non-wrap boundary are
//! resolved to Pisces explicitly.

use serde::Serialize;

/// One ecliptic sector boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SectorEntry {
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub start_degree: u16,
}

const fn sector(name: &'static str, abbreviation: &'static str, start_degree: u16) -> SectorEntry {
    SectorEntry {
        name,
        abbreviation,
        start_degree,
    }
}

/// The sector that straddles the 0/360 seam.
pub const WRAP_SECTOR: SectorEntry = sector("PISCES", "PIS", 351);

/// Sector boundaries in ascending order, wrap sector first and last.
pub static SECTORS: [SectorEntry; 14] = [
    WRAP_SECTOR,
    sector("ARIES", "ARI", 29),
    sector("TAURUS", "TAU", 54),
    sector("GEMINI", "GEM", 90),
    sector("CANCER", "CAN", 118),
    sector("LEO", "LEO", 138),
    sector("VIRGO", "VIR", 174),
    sector("LIBRA", "LIB", 218),
    sector("SCORPIUS", "SCO", 241),
    sector("OPHIUCHUS", "OPH", 248),
    sector("SAGITTARIUS", "SAG", 266),
    sector("CAPRICORNUS", "CAP", 299),
    sector("AQUARIUS", "AQU", 327),
    WRAP_SECTOR,
];

/// Returned when there is no arc to resolve.
pub const UNKNOWN_SECTOR: &str = "UNKNOWN SECTOR";

/// Sector containing `arc`, or `None` when there is no (finite) arc.
pub fn resolve_sector(arc: Option<f64>) -> Option<&'static SectorEntry> {
    let arc = arc.filter(|a| a.is_finite())?;

    // Highest boundary at or below the arc
    let found = SECTORS[1..]
        .iter()
        .rev()
        .find(|entry| f64::from(entry.start_degree) <= arc);

    // Below Aries the arc is still inside the Pisces that began at 351
    Some(found.unwrap_or(&SECTORS[0]))
}

/// Sector name for `arc`, or [`UNKNOWN_SECTOR`].
pub fn sector_name(arc: Option<f64>) -> &'static str {
    resolve_sector(arc).map_or(UNKNOWN_SECTOR, |entry| entry.name)
}
