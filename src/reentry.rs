//! Orbital lifetime estimate
//!
//! A coarse decay estimate driven by the element set's B* drag term and
//! perigee altitude: the perigee is assumed to sink at a rate proportional
//! to B*, the semi-major axis and an exponential density factor relative to
//! 120 km, with a scale height picked by perigee band. It is a screening
//! heuristic, not an atmosphere-model lifetime.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::ElementSet;
use crate::frames::WGS84_A_KM;
use crate::propagation::{PropagationError, Propagator};

/// Perigee altitude at which an object is considered to have decayed (km)
pub const DECAY_ALTITUDE_KM: f64 = 120.0;

/// Perigee altitudes at or above this are treated as long-lived (km)
const LONG_LIVED_PERIGEE_KM: f64 = 600.0;

/// Decay rates below this are treated as no decay (km/day)
const MIN_DECAY_RATE_KM_DAY: f64 = 0.001;

/// Re-entry risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReentryRisk {
    /// Under a week
    Imminent,
    /// Under 30 days
    High,
    /// Under 180 days
    Moderate,
    /// Under five years
    Low,
    Negligible,
    /// No drag term to estimate from
    #[serde(rename = "none")]
    NoDragData,
}

impl ReentryRisk {
    pub fn from_days(days: f64) -> Self {
        if days < 7.0 {
            Self::Imminent
        } else if days < 30.0 {
            Self::High
        } else if days < 180.0 {
            Self::Moderate
        } else if days < 365.0 * 5.0 {
            Self::Low
        } else {
            Self::Negligible
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imminent => "imminent",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Negligible => "negligible",
            Self::NoDragData => "none",
        }
    }

    /// Whether the object belongs on a re-entry watch list
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Self::Negligible | Self::NoDragData)
    }
}

impl fmt::Display for ReentryRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime estimate for one object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeEstimate {
    pub catalog_id: u32,
    pub name: Option<String>,
    pub risk: ReentryRisk,
    pub estimated_days_remaining: Option<f64>,
    pub estimated_reentry: Option<DateTime<Utc>>,
    pub perigee_alt_km: f64,
    pub apogee_alt_km: f64,
    /// Altitude and speed at the evaluation instant
    pub current_alt_km: f64,
    pub current_speed_km_s: f64,
    pub bstar: f64,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub period_min: f64,
    pub semi_major_axis_km: f64,
}

/// Scale height (km) used for the density factor at a perigee altitude
fn scale_height_km(perigee_alt_km: f64) -> f64 {
    if perigee_alt_km < 200.0 {
        30.0
    } else if perigee_alt_km < 400.0 {
        50.0
    } else if perigee_alt_km < 600.0 {
        60.0
    } else {
        80.0
    }
}

/// Perigee decay rate estimate in km/day
pub fn decay_rate_km_per_day(bstar: f64, perigee_alt_km: f64, semi_major_axis_km: f64) -> f64 {
    let rho_factor = (-(perigee_alt_km - DECAY_ALTITUDE_KM) / scale_height_km(perigee_alt_km)).exp();
    bstar.abs() * 1e5 * rho_factor * semi_major_axis_km
}

/// Estimate the remaining orbital lifetime of one object
///
/// The propagator supplies the current altitude and speed at `now`; the
/// decay estimate itself uses only the mean elements.
pub fn estimate_lifetime<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &ElementSet,
    now: DateTime<Utc>,
) -> Result<LifetimeEstimate, PropagationError> {
    let invalid = |code: &str| PropagationError::InvalidElements {
        catalog_id: elements.catalog_id,
        code: code.to_string(),
    };
    let semi_major_axis_km = elements
        .semi_major_axis_km()
        .ok_or_else(|| invalid("mean motion must be positive"))?;
    let (perigee_alt_km, apogee_alt_km) = elements
        .perigee_apogee_km()
        .ok_or_else(|| invalid("eccentricity out of range"))?;
    let period_min = elements
        .period_minutes()
        .ok_or_else(|| invalid("mean motion must be positive"))?;

    let state = propagator.propagate(elements, now)?;

    let (risk, days) = if perigee_alt_km >= LONG_LIVED_PERIGEE_KM {
        // Rough figure for the lower long-lived band only
        let days = (perigee_alt_km < 800.0)
            .then(|| (perigee_alt_km - DECAY_ALTITUDE_KM) * 365.0 / 100.0);
        (ReentryRisk::Negligible, days)
    } else if elements.bstar.abs() > 1e-10 {
        let rate = decay_rate_km_per_day(elements.bstar, perigee_alt_km, semi_major_axis_km);
        if rate > MIN_DECAY_RATE_KM_DAY {
            let days = (perigee_alt_km - DECAY_ALTITUDE_KM).max(0.0) / rate;
            (ReentryRisk::from_days(days), Some(days))
        } else {
            (ReentryRisk::Negligible, None)
        }
    } else {
        (ReentryRisk::NoDragData, None)
    };

    let estimated_reentry = match (risk, days) {
        (ReentryRisk::Negligible, _) | (_, None) => None,
        (_, Some(days)) => Some(now + Duration::milliseconds((days * 86_400_000.0).round() as i64)),
    };

    log::debug!(
        "Lifetime {}: perigee {:.1} km, risk {}, days {:?}",
        elements.catalog_id,
        perigee_alt_km,
        risk,
        days
    );

    Ok(LifetimeEstimate {
        catalog_id: elements.catalog_id,
        name: elements.name.clone(),
        risk,
        estimated_days_remaining: days,
        estimated_reentry,
        perigee_alt_km,
        apogee_alt_km,
        current_alt_km: state.position.norm() - WGS84_A_KM,
        current_speed_km_s: state.speed(),
        bstar: elements.bstar,
        inclination_deg: elements.inclination_deg,
        eccentricity: elements.eccentricity,
        period_min,
        semi_major_axis_km,
    })
}

/// Objects with perigee at or below `max_perigee_km` and an elevated risk,
/// soonest first, at most `limit`
///
/// Objects whose estimate fails are skipped.
pub fn reentry_candidates<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &[ElementSet],
    now: DateTime<Utc>,
    max_perigee_km: f64,
    limit: usize,
) -> Vec<LifetimeEstimate> {
    let mut candidates: Vec<LifetimeEstimate> = elements
        .par_iter()
        .filter_map(|set| match estimate_lifetime(propagator, set, now) {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                log::trace!("{}", e);
                None
            }
        })
        .filter(|estimate| estimate.perigee_alt_km <= max_perigee_km && estimate.risk.is_elevated())
        .collect();

    candidates.sort_by(|a, b| {
        let a_days = a.estimated_days_remaining.unwrap_or(f64::INFINITY);
        let b_days = b.estimated_days_remaining.unwrap_or(f64::INFINITY);
        a_days.total_cmp(&b_days).then(a.catalog_id.cmp(&b.catalog_id))
    });
    candidates.truncate(limit);
    candidates
}
