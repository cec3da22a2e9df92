//! Keplerian mean elements for the outer planets (Standish, JPL, valid
//! 1800–2050). Positions are heliocentric ecliptic J2000 in AU; good to a
//! fraction of a degree, which places oppositions within a day or two.

use super::coords::{normalize_pm180, Vec3};
use super::time::centuries_since_j2000;
use crate::provider::Planet;

/// Element value at J2000 and its rate per Julian century.
type Term = (f64, f64);

struct Elements {
    semi_major_axis_au: Term,
    eccentricity: Term,
    inclination_deg: Term,
    mean_longitude_deg: Term,
    perihelion_longitude_deg: Term,
    node_longitude_deg: Term,
}

const EARTH_MOON_BARYCENTER: Elements = Elements {
    semi_major_axis_au: (1.000_002_61, 0.000_005_62),
    eccentricity: (0.016_711_23, -0.000_043_92),
    inclination_deg: (-0.000_015_31, -0.012_946_68),
    mean_longitude_deg: (100.464_571_66, 35_999.372_449_81),
    perihelion_longitude_deg: (102.937_681_93, 0.323_273_64),
    node_longitude_deg: (0.0, 0.0),
};

const MARS: Elements = Elements {
    semi_major_axis_au: (1.523_710_34, 0.000_018_47),
    eccentricity: (0.093_394_10, 0.000_078_82),
    inclination_deg: (1.849_691_42, -0.008_131_31),
    mean_longitude_deg: (-4.553_432_05, 19_140.302_684_99),
    perihelion_longitude_deg: (-23.943_629_59, 0.444_410_88),
    node_longitude_deg: (49.559_538_91, -0.292_573_43),
};

const JUPITER: Elements = Elements {
    semi_major_axis_au: (5.202_887_00, -0.000_116_07),
    eccentricity: (0.048_386_24, -0.000_132_53),
    inclination_deg: (1.304_396_95, -0.001_837_14),
    mean_longitude_deg: (34.396_440_51, 3_034.746_127_75),
    perihelion_longitude_deg: (14.728_479_83, 0.212_526_68),
    node_longitude_deg: (100.473_909_09, 0.204_691_06),
};

const SATURN: Elements = Elements {
    semi_major_axis_au: (9.536_675_94, -0.001_250_60),
    eccentricity: (0.053_861_79, -0.000_509_91),
    inclination_deg: (2.485_991_87, 0.001_936_09),
    mean_longitude_deg: (49.954_244_23, 1_222.493_622_01),
    perihelion_longitude_deg: (92.598_878_31, -0.418_972_16),
    node_longitude_deg: (113.662_424_48, -0.288_677_94),
};

const URANUS: Elements = Elements {
    semi_major_axis_au: (19.189_164_64, -0.001_961_76),
    eccentricity: (0.047_257_44, -0.000_043_97),
    inclination_deg: (0.772_637_83, -0.002_429_39),
    mean_longitude_deg: (313.238_104_51, 428.482_027_85),
    perihelion_longitude_deg: (170.954_276_30, 0.408_052_81),
    node_longitude_deg: (74.016_925_03, 0.042_405_89),
};

const NEPTUNE: Elements = Elements {
    semi_major_axis_au: (30.069_922_76, 0.000_262_91),
    eccentricity: (0.008_590_48, 0.000_051_05),
    inclination_deg: (1.770_043_47, 0.000_353_72),
    mean_longitude_deg: (-55.120_029_69, 218.459_453_25),
    perihelion_longitude_deg: (44.964_762_27, -0.322_414_64),
    node_longitude_deg: (131.784_225_74, -0.005_086_64),
};

fn elements(planet: Planet) -> &'static Elements {
    match planet {
        Planet::Mars => &MARS,
        Planet::Jupiter => &JUPITER,
        Planet::Saturn => &SATURN,
        Planet::Uranus => &URANUS,
        Planet::Neptune => &NEPTUNE,
    }
}

fn at(term: Term, t: f64) -> f64 {
    term.0 + term.1 * t
}

/// Solve Kepler's equation `E - e sin E = M` (radians) by Newton iteration.
fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let mut ecc = mean_anomaly + e * mean_anomaly.sin();
    for _ in 0..12 {
        let delta = (ecc - e * ecc.sin() - mean_anomaly) / (1.0 - e * ecc.cos());
        ecc -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    ecc
}

fn heliocentric(el: &Elements, t: f64) -> Vec3 {
    let a = at(el.semi_major_axis_au, t);
    let e = at(el.eccentricity, t);
    let inc = at(el.inclination_deg, t).to_radians();
    let l = at(el.mean_longitude_deg, t);
    let varpi = at(el.perihelion_longitude_deg, t);
    let node = at(el.node_longitude_deg, t);

    let omega = (varpi - node).to_radians();
    let mean_anomaly = normalize_pm180(l - varpi).to_radians();
    let ecc = eccentric_anomaly(mean_anomaly, e);

    // Position in the orbital plane, perihelion along x
    let xp = a * (ecc.cos() - e);
    let yp = a * (1.0 - e * e).sqrt() * ecc.sin();

    let node = node.to_radians();
    let (so, co) = omega.sin_cos();
    let (sn, cn) = node.sin_cos();
    let (si, ci) = inc.sin_cos();

    [
        (co * cn - so * sn * ci) * xp + (-so * cn - co * sn * ci) * yp,
        (co * sn + so * cn * ci) * xp + (-so * sn + co * cn * ci) * yp,
        (so * si) * xp + (co * si) * yp,
    ]
}

/// Geocentric ecliptic longitude of the Sun from the Earth's orbit (deg).
pub fn sun_longitude_deg(jd: f64) -> f64 {
    let earth = heliocentric(&EARTH_MOON_BARYCENTER, centuries_since_j2000(jd));
    (-earth[1]).atan2(-earth[0]).to_degrees().rem_euclid(360.0)
}

/// Geocentric ecliptic longitude of `planet` (deg).
pub fn geocentric_longitude_deg(planet: Planet, jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    let earth = heliocentric(&EARTH_MOON_BARYCENTER, t);
    let body = heliocentric(elements(planet), t);
    (body[1] - earth[1])
        .atan2(body[0] - earth[0])
        .to_degrees()
        .rem_euclid(360.0)
}

/// Planet-minus-Sun longitude relative to opposition, `(-180, 180]`.
/// Zero at opposition.
pub fn opposition_offset_deg(planet: Planet, jd: f64) -> f64 {
    normalize_pm180(geocentric_longitude_deg(planet, jd) - sun_longitude_deg(jd) - 180.0)
}
