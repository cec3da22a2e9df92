//! # Engine Scenario Tests
//!
//! End-to-end checks that run several library modules together: the solar
//! arc against real and hand-made equinox tables, the rotation conventions
//! against the built-in almanac, sector coverage, and a full forecast cycle.
//! Each test is independent and fast enough for continuous integration.

use celestium_lib::ephemeris::AlmanacProvider;
use celestium_lib::equinox::{equinox_table, EquinoxEntry};
use celestium_lib::forecast::{forecast, ForecastSettings};
use celestium_lib::lunar::phase_index;
use celestium_lib::provider::AstronomyProvider;
use celestium_lib::rotation::{rotation_angle, standard_angle};
use celestium_lib::sector::sector_name;
use celestium_lib::solar::{solar_state, solar_state_in};
use celestium_lib::vector::CelestialVector;
use celestium_lib::{EventCategory, GeoPosition, RotationMode, Season};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Two-entry table opening at 2024-03-20T03:06Z with the next boundary a
/// minute after day 366, so the anomaly scenario has somewhere to land.
fn scenario_table() -> Vec<EquinoxEntry> {
    vec![
        EquinoxEntry {
            cycle_year: 2024,
            instant: utc(2024, 3, 20, 3, 6),
        },
        EquinoxEntry {
            cycle_year: 2025,
            instant: utc(2025, 3, 21, 3, 7),
        },
    ]
}

/// The three reference readings: day 5, day 355 and day 366.
#[test]
fn solar_arc_reference_scenario() {
    let table = scenario_table();

    let day5 = solar_state_in(&table, utc(2024, 3, 25, 3, 6)).unwrap();
    assert_eq!(day5.arc_text().as_deref(), Some("5.000"));
    assert_eq!(day5.season(), Season::Spring);

    let day355 = solar_state_in(&table, utc(2025, 3, 10, 3, 6)).unwrap();
    assert!(!day355.is_anomaly());
    assert_eq!(day355.season(), Season::Winter);

    let day366 = solar_state_in(&table, utc(2025, 3, 21, 3, 6)).unwrap();
    assert!(day366.is_anomaly());
    assert_eq!(day366.arc(), None);
    assert_eq!(day366.countdown().unwrap().total_seconds(), 60);
}

/// Every built-in table entry reads arc 0 at its own instant.
#[test]
fn every_equinox_starts_at_zero() {
    let table = equinox_table();
    // The last entry has no successor, so it has no cycle of its own
    for entry in &table[..table.len() - 1] {
        let state = solar_state(entry.instant).unwrap();
        assert_eq!(state.arc(), Some(0.0), "cycle {}", entry.cycle_year);
        assert!(!state.is_anomaly());
    }
}

/// Arc and anomaly are mutually exclusive across a whole built-in cycle.
#[test]
fn arc_and_anomaly_never_coexist() {
    let start = utc(2024, 3, 20, 3, 6);
    for hours in (0..366 * 24).step_by(7) {
        let state = solar_state(start + Duration::hours(hours)).unwrap();
        assert_eq!(state.is_anomaly(), state.arc().is_none());
        assert_eq!(state.is_anomaly(), state.countdown().is_some());
        if let Some(arc) = state.arc() {
            assert!((0.0..=360.0).contains(&arc));
        }
    }
}

/// Just before the 2025 equinox, the built-in table counts down to it.
#[test]
fn built_in_table_countdown_to_2025() {
    let state = solar_state(utc(2025, 3, 20, 3, 6)).unwrap();
    assert!(state.is_anomaly());
    assert_eq!(state.countdown().unwrap().to_string(), "0d 5h 55m 0s");
    assert_eq!(sector_name(state.arc()), "UNKNOWN SECTOR");
}

#[test]
fn lunar_index_monotonic_then_wraps() {
    let mut last = 0;
    for step in 0..2_900 {
        let p = f64::from(step) / 3_000.0;
        let index = phase_index(p);
        assert!(index >= last, "index dropped at p = {}", p);
        assert!(index <= 29);
        last = index;
    }
    assert_eq!(phase_index(1.0), 0);
}

#[test]
fn standard_rotation_from_local_midnight() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let midnight = tokyo.with_ymd_and_hms(2025, 5, 5, 0, 0, 0).unwrap();
    assert_eq!(standard_angle(&midnight), 0.0);

    let mut previous = -1.0;
    for minutes in (0..24 * 60).step_by(13) {
        let angle = standard_angle(&(midnight + Duration::minutes(minutes)));
        assert!(angle > previous);
        assert!(angle < 360.0);
        previous = angle;
    }
}

/// True-solar rotation reads 180° at the almanac's own solar noon.
#[test]
fn true_solar_rotation_at_almanac_noon() {
    let provider = AlmanacProvider::new();
    let reykjavik = GeoPosition::new(64.1466, -21.9426).unwrap();
    let t = utc(2025, 7, 1, 10, 0);

    let noon = provider.solar_noon(t, reykjavik).unwrap();
    let angle = rotation_angle(&provider, &noon, RotationMode::TrueSolar, Some(reykjavik));
    assert!((angle - 180.0).abs() < 1e-6, "angle {}", angle);

    // Without a position the same instant uses the UTC wall clock
    let fallback = rotation_angle(&provider, &noon, RotationMode::TrueSolar, None);
    assert_eq!(fallback, standard_angle(&noon));
}

#[test]
fn sector_table_is_total() {
    for degree in 0..360 {
        let name = sector_name(Some(f64::from(degree)));
        assert_ne!(name, "UNKNOWN SECTOR", "degree {}", degree);
        if degree <= 28 || degree >= 351 {
            assert_eq!(name, "PISCES", "degree {}", degree);
        }
    }
}

/// A full forecast cycle with the built-in almanac, seen from Dallas in
/// March 2024: the April total eclipse must be among the candidates.
#[test]
fn almanac_forecast_finds_april_2024_eclipse() {
    let provider = AlmanacProvider::new();
    let dallas = GeoPosition::new(32.78, -96.80);
    let now = utc(2024, 3, 1, 0, 0);

    let run = forecast(&provider, now, dallas, &ForecastSettings::default());

    assert!(run.failed.is_empty(), "failures: {:?}", run.failed);
    let eclipse = run
        .candidates
        .iter()
        .find(|e| e.category == EventCategory::EclipseSolar)
        .expect("solar eclipse candidate");
    assert_eq!(eclipse.label, "TOTAL SOLAR ECLIPSE");
    assert!(eclipse.formatted_date().starts_with("Apr 08, 2024"));

    let event = run.event.expect("an event");
    assert!(event.instant > now);
    assert!(run.candidates.iter().all(|c| c.instant >= event.instant));
}

/// The vector strings built from live calculators have the documented shape.
#[test]
fn vector_reading_shape() {
    let provider = AlmanacProvider::new();
    let now = utc(2024, 3, 25, 3, 6);
    let vector = CelestialVector::at(&provider, &now, RotationMode::Standard, None);

    let full = vector.full();
    assert!(full.starts_with("175k :: 358° . 005.000 . "), "{}", full);
    assert!(full.ends_with("| 046.500°"), "{}", full);
    assert!(vector.lunar_phase <= 29);
}

/// The live HUD shows the rotation of the frame being drawn, even while the
/// lane snapshot stays unchanged.
#[test]
fn live_frame_tracks_per_frame_rotation() {
    use celestium_lib::scheduler::Snapshot;

    let now = utc(2024, 3, 25, 3, 6);
    let snapshot = Snapshot {
        solar: solar_state(now).ok(),
        lunar_phase: Some(15),
        ..Snapshot::default()
    };

    let first = crate::live_frame(&snapshot, 46.5, RotationMode::Standard, now);
    let next = crate::live_frame(&snapshot, 46.504, RotationMode::Standard, now);

    assert!(first.contains("046.500°  [STANDARD]"), "{}", first);
    assert!(next.contains("046.504°  [STANDARD]"), "{}", next);
    assert!(first.contains("005.000  Spring (Growth)"));
}

#[cfg(test)]
mod performance_tests {
    use super::*;
    use std::time::Instant;

    /// Rotation runs on every frame and must stay well under a millisecond.
    #[test]
    fn rotation_is_sub_millisecond() {
        let provider = AlmanacProvider::new();
        let here = GeoPosition::new(40.7128, -74.0060);
        let now = Utc::now();
        const CALLS: u32 = 1_000;

        let start = Instant::now();
        for i in 0..CALLS {
            let t = now + Duration::milliseconds(i64::from(i) * 16);
            let _ = rotation_angle(&provider, &t, RotationMode::TrueSolar, here);
        }
        let per_call = start.elapsed() / CALLS;

        assert!(
            per_call.as_micros() < 1_000,
            "True-solar rotation took {:?} per call",
            per_call
        );
    }

    /// Repeated solar lookups reuse the table parsed on first use.
    #[test]
    fn solar_lookup_is_fast() {
        let now = utc(2026, 1, 1, 0, 0);
        let start = Instant::now();
        for i in 0..10_000 {
            let _ = solar_state(now + Duration::seconds(i));
        }
        let duration = start.elapsed();

        assert!(
            duration.as_millis() < 500,
            "10k solar lookups took {:?}",
            duration
        );
    }
}
