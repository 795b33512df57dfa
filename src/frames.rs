//! Time and reference-frame transforms
//!
//! Pure functions for moving between the inertial-like frame SGP4 reports in
//! (TEME), the Earth-fixed frame, WGS-84 geodetic coordinates and the
//! topocentric South-East-Zenith frame of a ground site.

use chrono::{DateTime, Duration, Utc};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// WGS-84 equatorial radius (km)
pub const WGS84_A_KM: f64 = 6378.137;

/// WGS-84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 first eccentricity squared
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Earth rotation rate (rad/s)
pub const OMEGA_EARTH: f64 = 7.292_115_0e-5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Unix epoch expressed as days since J2000.0 (JD 2440587.5 - 2451545.0)
const UNIX_EPOCH_DAYS_FROM_J2000: f64 = -10_957.5;

/// Geodetic position on the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Azimuth/elevation/range of a target as seen from a ground site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAngles {
    /// Clockwise from north, in [0, 360)
    pub azimuth_deg: f64,
    /// In [-90, 90]
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// Shift an instant by a (possibly fractional, possibly negative) number of seconds.
pub fn offset_seconds(time: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    time + Duration::nanoseconds((seconds * 1e9).round() as i64)
}

/// Signed seconds from `from` to `to`.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Days elapsed since J2000.0 (2000-01-01 12:00 UTC), treating UTC as UT1.
pub fn days_since_j2000(time: DateTime<Utc>) -> f64 {
    let unix_seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    unix_seconds / SECONDS_PER_DAY + UNIX_EPOCH_DAYS_FROM_J2000
}

/// Julian date of an instant.
pub fn julian_date(time: DateTime<Utc>) -> f64 {
    days_since_j2000(time) + 2_451_545.0
}

/// Greenwich mean sidereal angle (IAU 1982 model), wrapped to [0, 2π).
pub fn sidereal_angle(time: DateTime<Utc>) -> f64 {
    let tut1 = days_since_j2000(time) / 36_525.0;

    // GMST in seconds of time
    let gmst_s = -6.2e-6 * tut1 * tut1 * tut1
        + 0.093_104 * tut1 * tut1
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * tut1
        + 67_310.548_41;

    let angle = (gmst_s * TAU / SECONDS_PER_DAY).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}

/// Rotate an inertial-frame vector into the Earth-fixed frame, i.e. apply Rz(θ).
pub fn rotate_inertial_to_earth_fixed(position: &Vector3<f64>, sidereal_angle: f64) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -sidereal_angle) * position
}

/// Inverse of [`rotate_inertial_to_earth_fixed`].
pub fn rotate_earth_fixed_to_inertial(position: &Vector3<f64>, sidereal_angle: f64) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), sidereal_angle) * position
}

/// WGS-84 geodetic to Earth-fixed Cartesian (km)
pub fn geodetic_to_earth_fixed(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Vector3<f64> {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + altitude_km) * cos_lat * cos_lon,
        (n + altitude_km) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + altitude_km) * sin_lat,
    )
}

/// Earth-fixed Cartesian (km) to WGS-84 geodetic.
///
/// Heikkinen's closed-form solution; exact to well below a millimetre for
/// points above the surface, with no iteration. Points on the polar axis are
/// handled separately since the general expression degenerates there.
pub fn earth_fixed_to_geodetic(x: f64, y: f64, z: f64) -> GeodeticPosition {
    let a = WGS84_A_KM;
    let b = a * (1.0 - WGS84_F);
    let e2 = WGS84_E2;
    let ep2 = (a * a - b * b) / (b * b);

    let p = (x * x + y * y).sqrt();
    let longitude_deg = y.atan2(x).to_degrees();

    if p < 1e-9 {
        let latitude_deg = if z >= 0.0 { 90.0 } else { -90.0 };
        return GeodeticPosition {
            latitude_deg,
            longitude_deg,
            altitude_km: z.abs() - b,
        };
    }

    let z2 = z * z;
    let f = 54.0 * b * b * z2;
    let g = p * p + (1.0 - e2) * z2 - e2 * (a * a - b * b);
    let c = e2 * e2 * f * p * p / (g * g * g);
    let s = (1.0 + c + (c * c + 2.0 * c).sqrt()).cbrt();
    let k = s + 1.0 + 1.0 / s;
    let big_p = f / (3.0 * k * k * g * g);
    let q = (1.0 + 2.0 * e2 * e2 * big_p).sqrt();
    let r0_sq = 0.5 * a * a * (1.0 + 1.0 / q)
        - big_p * (1.0 - e2) * z2 / (q * (1.0 + q))
        - 0.5 * big_p * p * p;
    let r0 = -(big_p * e2 * p) / (1.0 + q) + r0_sq.max(0.0).sqrt();
    let t = p - e2 * r0;
    let u = (t * t + z2).sqrt();
    let v = (t * t + (1.0 - e2) * z2).sqrt();
    let z0 = b * b * z / (a * v);

    GeodeticPosition {
        latitude_deg: (z + ep2 * z0).atan2(p).to_degrees(),
        longitude_deg,
        altitude_km: u * (1.0 - b * b / (a * v)),
    }
}

/// Look angles from a site to a target, both Earth-fixed (km).
///
/// The site-to-target vector is rotated into South-East-Zenith. A zero range
/// reports zero elevation and azimuth rather than dividing by zero.
pub fn earth_fixed_to_look_angles(
    site_ecef: &Vector3<f64>,
    site_lat_rad: f64,
    site_lon_rad: f64,
    target_ecef: &Vector3<f64>,
) -> LookAngles {
    let rho = target_ecef - site_ecef;

    let (sin_lat, cos_lat) = site_lat_rad.sin_cos();
    let (sin_lon, cos_lon) = site_lon_rad.sin_cos();

    let south = sin_lat * cos_lon * rho.x + sin_lat * sin_lon * rho.y - cos_lat * rho.z;
    let east = -sin_lon * rho.x + cos_lon * rho.y;
    let zenith = cos_lat * cos_lon * rho.x + cos_lat * sin_lon * rho.y + sin_lat * rho.z;

    let range_km = (south * south + east * east + zenith * zenith).sqrt();
    if range_km <= 0.0 {
        return LookAngles {
            azimuth_deg: 0.0,
            elevation_deg: 0.0,
            range_km: 0.0,
        };
    }

    let elevation_deg = (zenith / range_km).clamp(-1.0, 1.0).asin().to_degrees();
    let mut azimuth_deg = east.atan2(-south).to_degrees().rem_euclid(360.0);
    if azimuth_deg >= 360.0 {
        azimuth_deg = 0.0;
    }

    LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    }
}
