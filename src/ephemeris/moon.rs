//! Truncated ELP-2000/82 lunar theory (main periodic terms only).
//! Accuracy ~0.1° in position and a few hundred km in distance.

use super::coords::{ecliptic_to_equatorial, obliquity_deg, Vec3};
use super::sun::sun_position;
use super::time::centuries_since_j2000;

pub const MOON_RADIUS_KM: f64 = 1_737.4;

#[derive(Debug, Clone, Copy)]
pub struct MoonPosition {
    /// Geocentric ecliptic longitude (deg, `[0, 360)`)
    pub longitude_deg: f64,
    /// Geocentric ecliptic latitude (deg)
    pub latitude_deg: f64,
    pub distance_km: f64,
}

pub fn moon_position(jd: f64) -> MoonPosition {
    let t = centuries_since_j2000(jd);

    // Fundamental arguments (degrees)
    let lp = (218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t * t).rem_euclid(360.0);
    let d = (297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t * t).rem_euclid(360.0);
    let m = (357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t * t).rem_euclid(360.0);
    let mp = (134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t * t).rem_euclid(360.0);
    let f = (93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t * t).rem_euclid(360.0);

    let d = d.to_radians();
    let m = m.to_radians();
    let mp = mp.to_radians();
    let f = f.to_radians();

    let sum_l = 6_288_774.0 * mp.sin()
        + 1_274_027.0 * (2.0 * d - mp).sin()
        + 658_314.0 * (2.0 * d).sin()
        + 213_618.0 * (2.0 * mp).sin()
        - 185_116.0 * m.sin()
        - 114_332.0 * (2.0 * f).sin()
        + 58_793.0 * (2.0 * d - 2.0 * mp).sin()
        + 57_066.0 * (2.0 * d - m - mp).sin()
        + 53_322.0 * (2.0 * d + mp).sin()
        + 45_758.0 * (2.0 * d - m).sin()
        - 40_923.0 * (m - mp).sin()
        - 34_720.0 * d.sin()
        - 30_383.0 * (m + mp).sin()
        + 15_327.0 * (2.0 * d - 2.0 * f).sin()
        - 12_528.0 * (mp + 2.0 * f).sin()
        + 10_980.0 * (mp - 2.0 * f).sin()
        + 10_675.0 * (4.0 * d - mp).sin()
        + 10_034.0 * (3.0 * mp).sin()
        + 8_548.0 * (4.0 * d - 2.0 * mp).sin()
        - 7_888.0 * (2.0 * d + m - mp).sin()
        - 6_766.0 * (2.0 * d + m).sin()
        - 5_163.0 * (d - mp).sin()
        + 4_987.0 * (d + m).sin()
        + 4_036.0 * (2.0 * d - m + mp).sin();

    let sum_b = 5_128_122.0 * f.sin()
        + 280_602.0 * (mp + f).sin()
        + 277_693.0 * (mp - f).sin()
        + 173_237.0 * (2.0 * d - f).sin()
        + 55_413.0 * (2.0 * d - mp + f).sin()
        + 46_271.0 * (2.0 * d - mp - f).sin()
        + 32_573.0 * (2.0 * d + f).sin()
        + 17_198.0 * (2.0 * mp + f).sin()
        + 9_266.0 * (2.0 * d + mp - f).sin()
        + 8_822.0 * (2.0 * mp - f).sin();

    let sum_r = -20_905_355.0 * mp.cos()
        - 3_699_111.0 * (2.0 * d - mp).cos()
        - 2_955_968.0 * (2.0 * d).cos()
        - 569_925.0 * (2.0 * mp).cos()
        + 48_888.0 * m.cos()
        - 3_149.0 * (2.0 * f).cos()
        + 246_158.0 * (2.0 * d - 2.0 * mp).cos()
        - 152_138.0 * (2.0 * d - m - mp).cos()
        - 170_733.0 * (2.0 * d + mp).cos()
        - 204_586.0 * (2.0 * d - m).cos()
        - 129_620.0 * (m - mp).cos()
        + 108_743.0 * d.cos();

    MoonPosition {
        longitude_deg: (lp + sum_l / 1_000_000.0).rem_euclid(360.0),
        latitude_deg: sum_b / 1_000_000.0,
        distance_km: 385_000.56 + sum_r / 1_000.0,
    }
}

/// Geocentric equatorial vector of the Moon, km.
pub fn moon_vector(jd: f64) -> Vec3 {
    let moon = moon_position(jd);
    let eps = obliquity_deg(centuries_since_j2000(jd));
    ecliptic_to_equatorial(moon.longitude_deg, moon.latitude_deg, moon.distance_km, eps)
}

/// Moon-minus-Sun ecliptic longitude, `[0, 360)`.
pub fn elongation_deg(jd: f64) -> f64 {
    (moon_position(jd).longitude_deg - sun_position(jd).apparent_longitude_deg).rem_euclid(360.0)
}

pub fn angular_radius_deg(distance_km: f64) -> f64 {
    (MOON_RADIUS_KM / distance_km).asin().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::time::julian_day;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_distance_stays_within_orbit_limits() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for hours in (0..24 * 60).step_by(6) {
            let jd = julian_day(start + Duration::hours(hours));
            let km = moon_position(jd).distance_km;
            assert!((355_000.0..=408_000.0).contains(&km), "distance {km}");
        }
    }

    #[test]
    fn test_full_moon_elongation() {
        // Full moon of 2024-04-23 23:49 UT
        let jd = julian_day(Utc.with_ymd_and_hms(2024, 4, 23, 23, 49, 0).unwrap());
        assert!((elongation_deg(jd) - 180.0).abs() < 0.5);
    }

    #[test]
    fn test_latitude_bounded_by_inclination() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for days in 0..60 {
            let jd = julian_day(start + Duration::days(days));
            assert!(moon_position(jd).latitude_deg.abs() < 5.4);
        }
    }
}
