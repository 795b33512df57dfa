//! Two-line element sets
//!
//! The core treats an element set as a read-only input to the propagator.
//! Parsing here only extracts the mean elements needed for derived
//! quantities (drag coefficient, perigee, period); SGP4 itself reparses the
//! raw lines.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use thiserror::Error;

use crate::frames::WGS84_A_KM;

/// Earth's gravitational parameter (km³/s²)
pub const MU_EARTH_KM3_S2: f64 = 398_600.441_8;

const SECONDS_PER_DAY: f64 = 86_400.0;
const TLE_LINE_LEN: usize = 69;

/// Errors raised while parsing two-line element text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementSetError {
    #[error("line {line} has {len} characters, expected 69")]
    LineLength { line: u8, len: usize },

    #[error("line {line} does not start with '{line} '")]
    LineNumber { line: u8 },

    #[error("line {line} checksum mismatch: expected {expected}, computed {computed}")]
    Checksum { line: u8, expected: u32, computed: u32 },

    #[error("catalog numbers differ between lines ({line1} vs {line2})")]
    CatalogMismatch { line1: String, line2: String },

    #[error("invalid {field}: {value:?}")]
    Field { field: &'static str, value: String },
}

/// One orbital element set for a tracked object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSet {
    pub catalog_id: u32,
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
    /// SGP4 drag term (1 / Earth radii)
    pub bstar: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_per_day: f64,
}

impl ElementSet {
    /// Parse a two-line element set, validating layout and checksums.
    pub fn from_tle(
        name: Option<&str>,
        line1: &str,
        line2: &str,
    ) -> Result<Self, ElementSetError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        validate_line(line1, 1)?;
        validate_line(line2, 2)?;

        let id1 = line1[2..7].trim();
        let id2 = line2[2..7].trim();
        if id1 != id2 {
            return Err(ElementSetError::CatalogMismatch {
                line1: id1.to_string(),
                line2: id2.to_string(),
            });
        }

        let name = name
            .map(|n| n.trim().trim_start_matches("0 ").trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            catalog_id: parse_catalog_number(id1)?,
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            epoch: parse_epoch(&line1[18..20], &line1[20..32])?,
            bstar: parse_implied_exponent(&line1[53..61], "bstar")?,
            inclination_deg: parse_field(&line2[8..16], "inclination")?,
            raan_deg: parse_field(&line2[17..25], "raan")?,
            eccentricity: parse_field(&format!("0.{}", line2[26..33].trim()), "eccentricity")?,
            arg_perigee_deg: parse_field(&line2[34..42], "argument of perigee")?,
            mean_anomaly_deg: parse_field(&line2[43..51], "mean anomaly")?,
            mean_motion_rev_per_day: parse_field(&line2[52..63], "mean motion")?,
        })
    }

    /// Display name, falling back to the catalog number
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", self.catalog_id))
    }

    /// Semi-major axis (km) from the mean motion
    pub fn semi_major_axis_km(&self) -> Option<f64> {
        if !self.mean_motion_rev_per_day.is_finite() || self.mean_motion_rev_per_day <= 0.0 {
            return None;
        }
        let n_rad_s = self.mean_motion_rev_per_day * TAU / SECONDS_PER_DAY;
        Some((MU_EARTH_KM3_S2 / (n_rad_s * n_rad_s)).cbrt())
    }

    /// Perigee and apogee altitude above the equatorial radius (km)
    pub fn perigee_apogee_km(&self) -> Option<(f64, f64)> {
        if !(0.0..1.0).contains(&self.eccentricity) {
            return None;
        }
        let a_km = self.semi_major_axis_km()?;
        Some((
            a_km * (1.0 - self.eccentricity) - WGS84_A_KM,
            a_km * (1.0 + self.eccentricity) - WGS84_A_KM,
        ))
    }

    /// Orbital period in minutes
    pub fn period_minutes(&self) -> Option<f64> {
        if self.mean_motion_rev_per_day > 0.0 {
            Some(1440.0 / self.mean_motion_rev_per_day)
        } else {
            None
        }
    }
}

/// Modulo-10 checksum: digits count at face value, '-' counts as one.
pub fn tle_checksum(line: &str) -> u32 {
    line.chars()
        .take(TLE_LINE_LEN - 1)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

/// Layout and checksum check for one element line (`number` is 1 or 2)
pub(crate) fn validate_line(line: &str, number: u8) -> Result<(), ElementSetError> {
    if line.len() != TLE_LINE_LEN || !line.is_ascii() {
        return Err(ElementSetError::LineLength {
            line: number,
            len: line.len(),
        });
    }
    let prefix = format!("{} ", number);
    if !line.starts_with(&prefix) {
        return Err(ElementSetError::LineNumber { line: number });
    }

    let expected = line
        .chars()
        .nth(TLE_LINE_LEN - 1)
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| ElementSetError::Field {
            field: "checksum",
            value: line[TLE_LINE_LEN - 1..].to_string(),
        })?;
    let computed = tle_checksum(line);
    if expected != computed {
        return Err(ElementSetError::Checksum {
            line: number,
            expected,
            computed,
        });
    }
    Ok(())
}

fn parse_field(raw: &str, field: &'static str) -> Result<f64, ElementSetError> {
    raw.trim().parse::<f64>().map_err(|_| ElementSetError::Field {
        field,
        value: raw.to_string(),
    })
}

/// Catalog number, including the Alpha-5 scheme (A0000 = 100000, I and O skipped)
fn parse_catalog_number(raw: &str) -> Result<u32, ElementSetError> {
    let invalid = || ElementSetError::Field {
        field: "catalog number",
        value: raw.to_string(),
    };

    let mut chars = raw.chars();
    let first = chars.next().ok_or_else(invalid)?;
    if first.is_ascii_digit() {
        return raw.parse::<u32>().map_err(|_| invalid());
    }

    let letter = first.to_ascii_uppercase();
    if !letter.is_ascii_uppercase() || letter == 'I' || letter == 'O' {
        return Err(invalid());
    }
    let mut value = letter as u32 - 'A' as u32 + 10;
    if letter > 'I' {
        value -= 1;
    }
    if letter > 'O' {
        value -= 1;
    }
    let rest: u32 = chars.as_str().parse().map_err(|_| invalid())?;
    Ok(value * 10_000 + rest)
}

/// Fields like " -11606-4" meaning -0.11606e-4
fn parse_implied_exponent(raw: &str, field: &'static str) -> Result<f64, ElementSetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let invalid = || ElementSetError::Field {
        field,
        value: raw.to_string(),
    };

    let (sign, body) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let split = body.rfind(['-', '+']).ok_or_else(invalid)?;
    let (mantissa, exponent) = body.split_at(split);
    let mantissa: f64 = format!("0.{}", mantissa.trim())
        .parse()
        .map_err(|_| invalid())?;
    let exponent: i32 = exponent.parse().map_err(|_| invalid())?;
    Ok(sign * mantissa * 10f64.powi(exponent))
}

fn parse_epoch(year: &str, day_of_year: &str) -> Result<DateTime<Utc>, ElementSetError> {
    let yy: i32 = year.trim().parse().map_err(|_| ElementSetError::Field {
        field: "epoch year",
        value: year.to_string(),
    })?;
    let day = parse_field(day_of_year, "epoch day")?;
    let bad_day = || ElementSetError::Field {
        field: "epoch day",
        value: day_of_year.to_string(),
    };
    if !(1.0..367.0).contains(&day) {
        return Err(bad_day());
    }
    let full_year = if yy < 57 { 2000 + yy } else { 1900 + yy };

    let jan1 = Utc
        .with_ymd_and_hms(full_year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ElementSetError::Field {
            field: "epoch year",
            value: year.to_string(),
        })?;
    let micros = ((day - 1.0) * SECONDS_PER_DAY * 1e6).round() as i64;
    jan1.checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(bad_day)
}
