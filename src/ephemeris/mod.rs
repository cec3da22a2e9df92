//! # Built-in Almanac
//!
//! [`AlmanacProvider`] answers every [`AstronomyProvider`] query from short
//! analytic series: the Sun from mean elements with the equation of centre,
//! the Moon from the main ELP-2000 terms, the outer planets from Keplerian
//! mean elements. Events are found by scanning an angle difference and
//! bisecting on its zero crossing.
//!
//! Precision is a few minutes of time for phases and season markers and a
//! day or so for oppositions. Eclipse peaks are reported at syzygy (the
//! conjunction or opposition in longitude), which sits within an hour or so
//! of greatest eclipse.

pub mod coords;
pub mod moon;
pub mod planets;
pub mod search;
pub mod sun;
pub mod time;

use crate::lunar::MEAN_SYNODIC_MONTH_DAYS;
use crate::provider::{
    AstronomyProvider, EclipseKind, GlobalEclipse, Planet, ProviderError, SeasonMarker,
};
use crate::GeoPosition;
use chrono::{DateTime, Datelike, Duration, Utc};
use coords::{altitude_deg, angle_between_deg, norm, observer_vector, refraction_deg, sub, EARTH_RADIUS_KM};
use log::{debug, trace};
use time::{from_julian_day, gmst_deg, julian_day};

/// Years the series are trusted for.
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1800..=2200;

/// Shadow enlargement for the Earth's atmosphere (Danjon).
const DANJON_ENLARGEMENT: f64 = 1.02;

/// Altitude of the Sun's centre at rise and set, refraction included.
const SUNRISE_ALTITUDE_DEG: f64 = -0.833;

/// Sampling step when checking local eclipse visibility.
const VISIBILITY_STEP_MINUTES: i64 = 10;

const PHASE_SCAN_DAYS: f64 = 40.0;
const SEASON_SCAN_DAYS: f64 = 100.0;

/// Low-precision analytic ephemeris.
#[derive(Debug, Clone)]
pub struct AlmanacProvider {
    max_lunations: u32,
    opposition_scan_days: u32,
}

impl Default for AlmanacProvider {
    fn default() -> Self {
        Self {
            max_lunations: 40,
            opposition_scan_days: 800,
        }
    }
}

impl AlmanacProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of new or full moons an eclipse search inspects before giving up.
    pub fn with_max_lunations(mut self, lunations: u32) -> Self {
        self.max_lunations = lunations.max(1);
        self
    }

    fn lunation_span_days(&self) -> u32 {
        (self.max_lunations as f64 * MEAN_SYNODIC_MONTH_DAYS).ceil() as u32
    }

    /// Julian day of the next instant the Moon-Sun elongation reaches
    /// `target_deg`.
    fn next_phase(&self, after_jd: f64, target_deg: f64, what: &'static str) -> Result<f64, ProviderError> {
        let f = |jd: f64| coords::normalize_pm180(moon::elongation_deg(jd) - target_deg);
        search::next_crossing(f, after_jd, 1.0, PHASE_SCAN_DAYS).ok_or(ProviderError::NotFound {
            what,
            within_days: PHASE_SCAN_DAYS as u32,
        })
    }
}

fn check_domain(t: DateTime<Utc>) -> Result<(), ProviderError> {
    if SUPPORTED_YEARS.contains(&t.year()) {
        Ok(())
    } else {
        Err(ProviderError::InvalidInput(format!(
            "{} is outside the supported years {}-{}",
            t.to_rfc3339(),
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )))
    }
}

/// Lunar horizontal parallax in degrees.
fn lunar_parallax_deg(moon_distance_km: f64) -> f64 {
    (EARTH_RADIUS_KM / moon_distance_km).asin().to_degrees()
}

/// Solar eclipse type at a new moon, if the shadow reaches the Earth at all.
fn solar_eclipse_at(jd: f64) -> Option<EclipseKind> {
    let sun = sun::sun_vector(jd);
    let moon = moon::moon_vector(jd);
    let sun_r = sun::angular_radius_deg(norm(sun));
    let moon_r = moon::angular_radius_deg(norm(moon));
    let parallax = lunar_parallax_deg(norm(moon));
    let separation = angle_between_deg(sun, moon);

    if separation >= parallax + sun_r + moon_r {
        return None;
    }
    if separation < parallax {
        // Shadow axis meets the Earth; compare discs as seen from the surface
        let topocentric_moon_r = moon::angular_radius_deg(norm(moon) - EARTH_RADIUS_KM);
        return Some(if topocentric_moon_r > sun_r {
            EclipseKind::Total
        } else {
            EclipseKind::Annular
        });
    }
    Some(EclipseKind::Partial)
}

/// Penumbral and umbral shadow radii at the Moon's distance, degrees.
fn shadow_radii_deg(sun_distance_km: f64, moon_distance_km: f64) -> (f64, f64) {
    let pi_sun = (EARTH_RADIUS_KM / sun_distance_km).asin();
    let pi_moon = (EARTH_RADIUS_KM / moon_distance_km).asin();
    let s_sun = (sun::SUN_RADIUS_KM / sun_distance_km).asin();

    let penumbral = DANJON_ENLARGEMENT * (pi_moon + pi_sun + s_sun);
    let umbral = DANJON_ENLARGEMENT * (pi_moon + pi_sun - s_sun);
    (penumbral.to_degrees(), umbral.to_degrees())
}

fn classify_lunar(offset_deg: f64, moon_r: f64, umbral_r: f64, penumbral_r: f64) -> Option<EclipseKind> {
    let near_edge = offset_deg - moon_r;
    let far_edge = offset_deg + moon_r;

    if near_edge >= penumbral_r {
        None
    } else if far_edge <= umbral_r {
        Some(EclipseKind::Total)
    } else if near_edge < umbral_r {
        Some(EclipseKind::Partial)
    } else {
        Some(EclipseKind::Penumbral)
    }
}

/// Lunar eclipse type at a full moon, if the Moon touches the penumbra.
fn lunar_eclipse_at(jd: f64) -> Option<EclipseKind> {
    let sun = sun::sun_vector(jd);
    let moon = moon::moon_vector(jd);
    let offset = 180.0 - angle_between_deg(sun, moon);
    let (penumbral_r, umbral_r) = shadow_radii_deg(norm(sun), norm(moon));
    classify_lunar(offset, moon::angular_radius_deg(norm(moon)), umbral_r, penumbral_r)
}

impl AstronomyProvider for AlmanacProvider {
    fn solar_noon(&self, t: DateTime<Utc>, position: GeoPosition) -> Result<DateTime<Utc>, ProviderError> {
        check_domain(t)?;
        from_julian_day(sun::solar_noon_jd(julian_day(t), position.longitude))
    }

    fn moon_phase_fraction(&self, t: DateTime<Utc>) -> Result<f64, ProviderError> {
        check_domain(t)?;
        Ok(moon::elongation_deg(julian_day(t)) / 360.0)
    }

    fn next_global_solar_eclipse(&self, after: DateTime<Utc>) -> Result<GlobalEclipse, ProviderError> {
        check_domain(after)?;
        let mut jd = julian_day(after);
        for _ in 0..self.max_lunations {
            let new_moon = self.next_phase(jd, 0.0, "new moon")?;
            if let Some(kind) = solar_eclipse_at(new_moon) {
                let peak = from_julian_day(new_moon)?;
                debug!("Solar eclipse ({}) at {}", kind.label(), peak);
                return Ok(GlobalEclipse { peak, kind });
            }
            trace!("No solar eclipse at new moon JD {:.3}", new_moon);
            jd = new_moon + 1.0;
        }
        Err(ProviderError::NotFound {
            what: "solar eclipse",
            within_days: self.lunation_span_days(),
        })
    }

    fn local_solar_eclipse_visible(
        &self,
        peak: DateTime<Utc>,
        window: Duration,
        position: GeoPosition,
    ) -> Result<bool, ProviderError> {
        check_domain(peak)?;
        if window < Duration::zero() {
            return Err(ProviderError::InvalidInput(format!(
                "negative visibility window {window}"
            )));
        }

        let step = Duration::minutes(VISIBILITY_STEP_MINUTES);
        let mut t = peak - window;
        let end = peak + window;
        while t <= end {
            let jd = julian_day(t);
            let observer = observer_vector(position, gmst_deg(jd));
            let sun = sun::sun_vector(jd);

            if altitude_deg(sun, observer) > SUNRISE_ALTITUDE_DEG {
                let sun_topo = sub(sun, observer);
                let moon_topo = sub(moon::moon_vector(jd), observer);
                let separation = angle_between_deg(sun_topo, moon_topo);
                let contact = sun::angular_radius_deg(norm(sun_topo))
                    + moon::angular_radius_deg(norm(moon_topo));
                if separation < contact {
                    debug!("Eclipse visible from {:?} at {}", position, t);
                    return Ok(true);
                }
            }
            t += step;
        }
        Ok(false)
    }

    fn next_lunar_eclipse(&self, after: DateTime<Utc>) -> Result<GlobalEclipse, ProviderError> {
        check_domain(after)?;
        let mut jd = julian_day(after);
        for _ in 0..self.max_lunations {
            let full_moon = self.next_phase(jd, 180.0, "full moon")?;
            if let Some(kind) = lunar_eclipse_at(full_moon) {
                let peak = from_julian_day(full_moon)?;
                debug!("Lunar eclipse ({}) at {}", kind.label(), peak);
                return Ok(GlobalEclipse { peak, kind });
            }
            jd = full_moon + 1.0;
        }
        Err(ProviderError::NotFound {
            what: "lunar eclipse",
            within_days: self.lunation_span_days(),
        })
    }

    fn lunar_altitude(&self, t: DateTime<Utc>, position: GeoPosition) -> Result<f64, ProviderError> {
        check_domain(t)?;
        let jd = julian_day(t);
        let observer = observer_vector(position, gmst_deg(jd));
        let geometric = altitude_deg(moon::moon_vector(jd), observer);
        Ok(geometric + refraction_deg(geometric))
    }

    fn geocentric_lunar_distance_km(&self, t: DateTime<Utc>) -> Result<f64, ProviderError> {
        check_domain(t)?;
        Ok(moon::moon_position(julian_day(t)).distance_km)
    }

    fn next_full_moon(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
        check_domain(after)?;
        from_julian_day(self.next_phase(julian_day(after), 180.0, "full moon")?)
    }

    fn next_opposition(&self, planet: Planet, after: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
        check_domain(after)?;
        let f = |jd: f64| planets::opposition_offset_deg(planet, jd);
        let jd = search::next_crossing(f, julian_day(after), 1.0, self.opposition_scan_days as f64)
            .ok_or(ProviderError::NotFound {
                what: "opposition",
                within_days: self.opposition_scan_days,
            })?;
        from_julian_day(jd)
    }

    fn next_season_marker(&self, after: DateTime<Utc>) -> Result<(SeasonMarker, DateTime<Utc>), ProviderError> {
        check_domain(after)?;
        let start = julian_day(after);
        let longitude = sun::sun_position(start).apparent_longitude_deg;
        let quadrant = ((longitude / 90.0).floor() as u8 + 1) % 4;
        let target = quadrant as f64 * 90.0;

        let f = |jd: f64| coords::normalize_pm180(sun::sun_position(jd).apparent_longitude_deg - target);
        let jd = search::next_crossing(f, start, 1.0, SEASON_SCAN_DAYS).ok_or(ProviderError::NotFound {
            what: "season marker",
            within_days: SEASON_SCAN_DAYS as u32,
        })?;
        Ok((SeasonMarker::from_quadrant(quadrant), from_julian_day(jd)?))
    }
}
