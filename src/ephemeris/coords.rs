//! Frame conversions and small vector helpers.
//!
//! Vectors are geocentric equatorial (mean equator of date), in kilometres.

use crate::GeoPosition;

pub type Vec3 = [f64; 3];

/// Equatorial radius of the Earth (WGS-84), km.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Angle between two vectors in degrees.
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f64 {
    let cos = dot(a, b) / (norm(a) * norm(b));
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Wrap an angle to `(-180, 180]`.
pub fn normalize_pm180(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Mean obliquity of the ecliptic in degrees, `t` in Julian centuries.
pub fn obliquity_deg(t: f64) -> f64 {
    23.439_291 - 0.013_004_2 * t
}

/// Ecliptic spherical coordinates to an equatorial vector.
pub fn ecliptic_to_equatorial(lon_deg: f64, lat_deg: f64, distance_km: f64, obliquity_deg: f64) -> Vec3 {
    let (lon, lat, eps) = (
        lon_deg.to_radians(),
        lat_deg.to_radians(),
        obliquity_deg.to_radians(),
    );
    let x = distance_km * lat.cos() * lon.cos();
    let y = distance_km * lat.cos() * lon.sin();
    let z = distance_km * lat.sin();
    [x, y * eps.cos() - z * eps.sin(), y * eps.sin() + z * eps.cos()]
}

/// Right ascension of an equatorial vector in degrees, `[0, 360)`.
pub fn right_ascension_deg(v: Vec3) -> f64 {
    v[1].atan2(v[0]).to_degrees().rem_euclid(360.0)
}

/// Observer position on a spherical Earth, given Greenwich sidereal time.
pub fn observer_vector(position: GeoPosition, gmst_deg: f64) -> Vec3 {
    let lat = position.latitude.to_radians();
    let lst = (gmst_deg + position.longitude).to_radians();
    [
        EARTH_RADIUS_KM * lat.cos() * lst.cos(),
        EARTH_RADIUS_KM * lat.cos() * lst.sin(),
        EARTH_RADIUS_KM * lat.sin(),
    ]
}

/// Geometric altitude of `target` above the observer's horizon, degrees.
///
/// Parallax is included because the target is taken relative to the
/// observer, not the Earth's centre.
pub fn altitude_deg(target: Vec3, observer: Vec3) -> f64 {
    let topocentric = sub(target, observer);
    let sin_alt = dot(topocentric, observer) / (norm(topocentric) * norm(observer));
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Atmospheric refraction (Bennett 1982) for a geometric altitude, degrees.
pub fn refraction_deg(altitude_deg: f64) -> f64 {
    if altitude_deg < -2.0 {
        return 0.0;
    }
    let h = altitude_deg;
    let arcmin = 1.0 / (h + 7.31 / (h + 4.4)).to_radians().tan();
    arcmin.max(0.0) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pm180() {
        assert_eq!(normalize_pm180(190.0), -170.0);
        assert_eq!(normalize_pm180(-190.0), 170.0);
        assert_eq!(normalize_pm180(180.0), 180.0);
        assert_eq!(normalize_pm180(540.0), 180.0);
    }

    #[test]
    fn test_ecliptic_pole_tilts_by_obliquity() {
        let v = ecliptic_to_equatorial(0.0, 90.0, 1.0, 23.44);
        let declination = v[2].asin().to_degrees();
        assert!((declination - (90.0 - 23.44)).abs() < 1e-9);
    }

    #[test]
    fn test_zenith_target_has_altitude_90() {
        let here = GeoPosition::new(45.0, 10.0).unwrap();
        let obs = observer_vector(here, 0.0);
        let overhead = [obs[0] * 100.0, obs[1] * 100.0, obs[2] * 100.0];
        assert!((altitude_deg(overhead, obs) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_refraction_at_horizon() {
        // About 34 arcminutes at the geometric horizon
        let r = refraction_deg(0.0);
        assert!((r - 0.575).abs() < 0.02, "refraction {r}");
        assert!(refraction_deg(45.0) < 0.02);
    }
}
