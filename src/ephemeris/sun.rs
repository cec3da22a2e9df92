//! Low-precision solar position: mean elements plus the equation of centre,
//! corrected for aberration and nutation in longitude. Good to ~0.01°.

use super::coords::{
    ecliptic_to_equatorial, normalize_pm180, obliquity_deg, right_ascension_deg, Vec3,
};
use super::time::centuries_since_j2000;

pub const SUN_RADIUS_KM: f64 = 696_000.0;
pub const AU_KM: f64 = 149_597_870.7;

#[derive(Debug, Clone, Copy)]
pub struct SunPosition {
    /// Geometric mean longitude (deg)
    pub mean_longitude_deg: f64,
    /// Apparent ecliptic longitude (deg, `[0, 360)`)
    pub apparent_longitude_deg: f64,
    pub distance_km: f64,
    /// Obliquity corrected for nutation (deg)
    pub obliquity_deg: f64,
}

pub fn sun_position(jd: f64) -> SunPosition {
    let t = centuries_since_j2000(jd);

    let l0 = (280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t).rem_euclid(360.0);
    let m = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).rem_euclid(360.0);
    let m_rad = m.to_radians();

    // Equation of centre
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m_rad.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m_rad).sin()
        + 0.000_289 * (3.0 * m_rad).sin();

    let true_longitude = l0 + c;
    let omega = (125.04 - 1_934.136 * t).to_radians();
    let apparent_longitude_deg = (true_longitude - 0.005_69 - 0.004_78 * omega.sin()).rem_euclid(360.0);

    let e = 0.016_708_634 - 0.000_042_037 * t;
    let v = (m + c).to_radians();
    let r_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * v.cos());

    SunPosition {
        mean_longitude_deg: l0,
        apparent_longitude_deg,
        distance_km: r_au * AU_KM,
        obliquity_deg: obliquity_deg(t) + 0.002_56 * omega.cos(),
    }
}

/// Geocentric equatorial vector of the Sun, km.
pub fn sun_vector(jd: f64) -> Vec3 {
    let sun = sun_position(jd);
    ecliptic_to_equatorial(
        sun.apparent_longitude_deg,
        0.0,
        sun.distance_km,
        sun.obliquity_deg,
    )
}

/// Apparent minus mean solar time, in minutes.
pub fn equation_of_time_minutes(jd: f64) -> f64 {
    let sun = sun_position(jd);
    let ra = right_ascension_deg(ecliptic_to_equatorial(
        sun.apparent_longitude_deg,
        0.0,
        1.0,
        sun.obliquity_deg,
    ));
    4.0 * normalize_pm180(sun.mean_longitude_deg - 0.005_718_3 - ra)
}

/// Julian day of local apparent noon on the observer's mean solar day
/// containing `jd`.
pub fn solar_noon_jd(jd: f64, longitude_deg: f64) -> f64 {
    let local_jd = jd + longitude_deg / 360.0;
    let local_midnight = (local_jd - 0.5).floor() + 0.5;
    let mean_noon = local_midnight + 0.5 - longitude_deg / 360.0;

    let mut noon = mean_noon;
    for _ in 0..2 {
        noon = mean_noon - equation_of_time_minutes(noon) / 1_440.0;
    }
    noon
}

pub fn angular_radius_deg(distance_km: f64) -> f64 {
    (SUN_RADIUS_KM / distance_km).asin().to_degrees()
}
