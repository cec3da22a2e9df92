//! # Event Forecaster
//!
//! Finds the next notable sky event by running independent, bounded searches
//! per category and merging their candidates:
//!
//! | Category | Provider queries | Bound |
//! | --- | --- | --- |
//! | Solar eclipse | global eclipse, then local visibility | `max_attempts` |
//! | Lunar eclipse | lunar eclipse, then Moon altitude at peak | `max_attempts` |
//! | Lunar distance | next full moon, then geocentric distance | `full_moon_window` |
//! | Oppositions | next opposition per planet | one per planet |
//! | Season marker | next equinox or solstice | one |
//!
//! An eclipse that is real but not visible from the observer moves the
//! cursor `retry_advance_days` past its peak and tries again. After
//! `max_attempts` rejections the category gives up with
//! [`CategoryError::Exhausted`]: a true next-visible eclipse further out is
//! missed in exchange for a bounded number of provider calls.
//!
//! A provider failure drops only the category it happened in. Candidates
//! from every surviving category are sorted by instant and the earliest one
//! wins; nothing is filtered out before ranking.

use crate::provider::{AstronomyProvider, GlobalEclipse, Planet, ProviderError};
use crate::{CosmicEvent, EventCategory, GeoPosition};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tunable constants of the forecaster. Doubles as the `[forecast]`
/// configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Eclipse candidates inspected before a category gives up
    pub max_attempts: u32,
    /// Cursor advance past a rejected eclipse peak, in days
    pub retry_advance_days: i64,
    /// Local solar eclipse check covers the peak ± this many days
    pub visibility_window_days: i64,
    /// Number of upcoming full moons checked for distance extremes
    pub full_moon_window: u32,
    /// Full moons closer than this are supermoons
    pub supermoon_km: f64,
    /// Full moons farther than this are micromoons
    pub micromoon_km: f64,
    /// Lunar eclipse counts as visible when the Moon is above this altitude at peak
    pub lunar_min_altitude_deg: f64,
    pub planets: Vec<Planet>,
    pub include_season_markers: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        ForecastSettings {
            max_attempts: 5,
            retry_advance_days: 10,
            visibility_window_days: 1,
            full_moon_window: 6,
            supermoon_km: 360_000.0,
            micromoon_km: 405_000.0,
            lunar_min_altitude_deg: -0.5,
            planets: Planet::OUTER.to_vec(),
            include_season_markers: true,
        }
    }
}

/// One independent search run by the forecaster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchCategory {
    SolarEclipse,
    LunarEclipse,
    LunarDistance,
    Oppositions,
    SeasonMarker,
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchCategory::SolarEclipse => "solar eclipse",
            SearchCategory::LunarEclipse => "lunar eclipse",
            SearchCategory::LunarDistance => "lunar distance",
            SearchCategory::Oppositions => "oppositions",
            SearchCategory::SeasonMarker => "season marker",
        };
        f.write_str(name)
    }
}

/// Why a category produced no candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CategoryError {
    /// Every candidate inspected was rejected by the visibility filter.
    /// A normal outcome, not a failure.
    #[error("no visible candidate after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Outcome of one forecaster cycle.
#[derive(Debug, Clone, Default)]
pub struct ForecastRun {
    /// Earliest candidate, if any category produced one
    pub event: Option<CosmicEvent>,
    /// Every candidate, ascending by instant
    pub candidates: Vec<CosmicEvent>,
    /// Categories whose bounded search gave up
    pub exhausted: Vec<SearchCategory>,
    /// Categories dropped because the provider failed
    pub failed: Vec<(SearchCategory, ProviderError)>,
    /// Number of categories searched this cycle
    pub attempted: usize,
}

impl ForecastRun {
    /// True when a provider failure left the run without any candidate.
    /// Such a run must not replace an earlier result: the missing event may
    /// be in one of the failed categories.
    pub fn is_inconclusive(&self) -> bool {
        self.event.is_none() && !self.failed.is_empty()
    }
}

/// Bounded cursor/retry loop shared by both eclipse categories.
///
/// `next` yields the next eclipse after a cursor; `visible` decides whether
/// the observer can see it. A rejected eclipse advances the cursor past its
/// peak by `advance`.
fn bounded_eclipse_search<N, V>(
    start: DateTime<Utc>,
    max_attempts: u32,
    advance: Duration,
    mut next: N,
    mut visible: V,
) -> Result<GlobalEclipse, CategoryError>
where
    N: FnMut(DateTime<Utc>) -> Result<GlobalEclipse, ProviderError>,
    V: FnMut(&GlobalEclipse) -> Result<bool, ProviderError>,
{
    let mut cursor = start;
    for attempt in 1..=max_attempts {
        let eclipse = next(cursor)?;
        if visible(&eclipse)? {
            return Ok(eclipse);
        }
        debug!(
            "Attempt {}/{}: {} eclipse at {} not visible, advancing",
            attempt,
            max_attempts,
            eclipse.kind.label(),
            eclipse.peak
        );
        cursor = eclipse.peak + advance;
    }
    Err(CategoryError::Exhausted {
        attempts: max_attempts,
    })
}

/// Next solar eclipse visible from `position`, or any solar eclipse when no
/// position is known.
pub fn search_solar_eclipse<P>(
    provider: &P,
    now: DateTime<Utc>,
    position: Option<GeoPosition>,
    settings: &ForecastSettings,
) -> Result<CosmicEvent, CategoryError>
where
    P: AstronomyProvider + ?Sized,
{
    let window = Duration::days(settings.visibility_window_days);
    let eclipse = bounded_eclipse_search(
        now,
        settings.max_attempts,
        Duration::days(settings.retry_advance_days),
        |after| provider.next_global_solar_eclipse(after),
        |eclipse| match position {
            Some(pos) => provider.local_solar_eclipse_visible(eclipse.peak, window, pos),
            None => Ok(true),
        },
    )?;

    Ok(CosmicEvent {
        category: EventCategory::EclipseSolar,
        label: format!("{} SOLAR ECLIPSE", eclipse.kind.label()),
        instant: eclipse.peak,
    })
}

/// Next lunar eclipse with the Moon above the configured altitude at peak.
pub fn search_lunar_eclipse<P>(
    provider: &P,
    now: DateTime<Utc>,
    position: Option<GeoPosition>,
    settings: &ForecastSettings,
) -> Result<CosmicEvent, CategoryError>
where
    P: AstronomyProvider + ?Sized,
{
    let eclipse = bounded_eclipse_search(
        now,
        settings.max_attempts,
        Duration::days(settings.retry_advance_days),
        |after| provider.next_lunar_eclipse(after),
        |eclipse| match position {
            Some(pos) => provider
                .lunar_altitude(eclipse.peak, pos)
                .map(|altitude| altitude > settings.lunar_min_altitude_deg),
            None => Ok(true),
        },
    )?;

    Ok(CosmicEvent {
        category: EventCategory::EclipseLunar,
        label: format!("{} LUNAR ECLIPSE", eclipse.kind.label()),
        instant: eclipse.peak,
    })
}

/// Supermoons and micromoons among the next `full_moon_window` full moons.
pub fn search_lunar_distance<P>(
    provider: &P,
    now: DateTime<Utc>,
    settings: &ForecastSettings,
) -> Result<Vec<CosmicEvent>, CategoryError>
where
    P: AstronomyProvider + ?Sized,
{
    let mut events = Vec::new();
    let mut cursor = now;

    for _ in 0..settings.full_moon_window {
        let full_moon = provider.next_full_moon(cursor)?;
        let distance_km = provider.geocentric_lunar_distance_km(full_moon)?;

        if distance_km < settings.supermoon_km {
            events.push(CosmicEvent {
                category: EventCategory::Supermoon,
                label: "PERIGEE SYZYGY (SUPERMOON)".to_string(),
                instant: full_moon,
            });
        } else if distance_km > settings.micromoon_km {
            events.push(CosmicEvent {
                category: EventCategory::Micromoon,
                label: "APOGEE SYZYGY (MICROMOON)".to_string(),
                instant: full_moon,
            });
        }

        cursor = full_moon + Duration::days(1);
    }

    Ok(events)
}

/// Next opposition of each configured planet.
///
/// A failure for one planet only drops that planet. The category fails
/// when no planet succeeds.
pub fn search_oppositions<P>(
    provider: &P,
    now: DateTime<Utc>,
    settings: &ForecastSettings,
) -> Result<Vec<CosmicEvent>, CategoryError>
where
    P: AstronomyProvider + ?Sized,
{
    let mut events = Vec::with_capacity(settings.planets.len());
    let mut last_error = None;

    for &planet in &settings.planets {
        match provider.next_opposition(planet, now) {
            Ok(instant) => events.push(CosmicEvent {
                category: EventCategory::PlanetaryOpposition,
                label: format!("{} OPPOSITION", planet.name()),
                instant,
            }),
            Err(error) => {
                warn!("Opposition search for {} failed: {}", planet, error);
                last_error = Some(error);
            }
        }
    }

    match last_error {
        Some(error) if events.is_empty() => Err(error.into()),
        _ => Ok(events),
    }
}

/// Next equinox or solstice.
pub fn search_season_marker<P>(provider: &P, now: DateTime<Utc>) -> Result<CosmicEvent, CategoryError>
where
    P: AstronomyProvider + ?Sized,
{
    let (marker, instant) = provider.next_season_marker(now)?;
    Ok(CosmicEvent {
        category: EventCategory::SeasonMarker,
        label: marker.label().to_string(),
        instant,
    })
}

/// Run every category once and rank the results.
///
/// Never fails: exhausted and failed categories are recorded on the
/// returned [`ForecastRun`] and the rest are merged.
pub fn forecast<P>(
    provider: &P,
    now: DateTime<Utc>,
    position: Option<GeoPosition>,
    settings: &ForecastSettings,
) -> ForecastRun
where
    P: AstronomyProvider + ?Sized,
{
    let mut run = ForecastRun::default();

    let mut record = |category: SearchCategory, outcome: Result<Vec<CosmicEvent>, CategoryError>| {
        run.attempted += 1;
        match outcome {
            Ok(events) => run.candidates.extend(events),
            Err(CategoryError::Exhausted { attempts }) => {
                debug!("{} search exhausted after {} attempts", category, attempts);
                run.exhausted.push(category);
            }
            Err(CategoryError::Provider(error)) => {
                warn!("{} search dropped this cycle: {}", category, error);
                run.failed.push((category, error));
            }
        }
    };

    record(
        SearchCategory::SolarEclipse,
        search_solar_eclipse(provider, now, position, settings).map(|e| vec![e]),
    );
    record(
        SearchCategory::LunarEclipse,
        search_lunar_eclipse(provider, now, position, settings).map(|e| vec![e]),
    );
    record(
        SearchCategory::LunarDistance,
        search_lunar_distance(provider, now, settings),
    );
    record(
        SearchCategory::Oppositions,
        search_oppositions(provider, now, settings),
    );
    if settings.include_season_markers {
        record(
            SearchCategory::SeasonMarker,
            search_season_marker(provider, now).map(|e| vec![e]),
        );
    }

    run.candidates.sort_by_key(|event| event.instant);
    run.event = run.candidates.first().cloned();

    if let Some(event) = &run.event {
        debug!(
            "Forecast: {} at {} ({} candidates)",
            event.label,
            event.instant,
            run.candidates.len()
        );
    }
    run
}

/// Earliest upcoming event, or `None` when no category produced one.
pub fn next_event<P>(
    provider: &P,
    now: DateTime<Utc>,
    position: Option<GeoPosition>,
    settings: &ForecastSettings,
) -> Option<CosmicEvent>
where
    P: AstronomyProvider + ?Sized,
{
    forecast(provider, now, position, settings).event
}
