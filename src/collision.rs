//! Monte Carlo collision probability
//!
//! Both objects are propagated to the candidate TCA, their positions are
//! perturbed with independent isotropic Gaussian noise, and the fraction of
//! sample pairs closer than the combined hard-body radius is the probability
//! of collision.
//!
//! Samples are drawn in fixed-size chunks, each with its own RNG seeded from
//! the base seed plus the chunk index, so results are reproducible for a
//! given seed regardless of how many threads run the chunks.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ElementSet;
use crate::frames::offset_seconds;
use crate::propagation::{PropagationError, Propagator};

/// Samples per RNG chunk
const SAMPLE_CHUNK: usize = 1024;

/// Monte Carlo parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub num_samples: usize,
    /// 1-sigma position uncertainty per axis, per object (km)
    pub position_sigma_km: f64,
    /// Combined hard-body radius (km)
    pub hard_body_radius_km: f64,
    pub seed: u64,
    /// Half-width of the nominal closest-approach scan (s)
    pub scan_window_s: f64,
    /// Evenly spaced scan instants, both window ends included
    pub scan_points: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            position_sigma_km: 1.0,
            hard_body_radius_km: 0.05,
            seed: 42,
            scan_window_s: 600.0,
            scan_points: 50,
        }
    }
}

impl CollisionConfig {
    pub fn high_precision() -> Self {
        Self {
            num_samples: 1_000_000,
            ..Default::default()
        }
    }
}

/// Action band for a probability of collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PocRisk {
    /// Actionable
    Red,
    /// Watch
    Yellow,
    /// Negligible
    Green,
}

impl PocRisk {
    pub fn from_poc(poc: f64) -> Self {
        if poc > 1e-4 {
            Self::Red
        } else if poc > 1e-6 {
            Self::Yellow
        } else {
            Self::Green
        }
    }
}

/// Result of one Monte Carlo run
#[derive(Debug, Clone, Serialize)]
pub struct CollisionEstimate {
    pub object_a_id: u32,
    pub object_b_id: u32,
    pub tca: DateTime<Utc>,
    /// Exactly `hits / samples`
    pub poc: f64,
    pub hits: usize,
    pub samples: usize,
    pub risk: PocRisk,
    /// Unperturbed separation at the TCA (km)
    pub nominal_miss_km: f64,
    /// Smallest unperturbed separation seen by the scan around the TCA (km)
    pub closest_approach_km: f64,
    pub closest_approach_time: DateTime<Utc>,
    pub relative_velocity_km_s: f64,
    pub position_sigma_km: f64,
    pub hard_body_radius_km: f64,
}

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error("invalid Monte Carlo configuration: {0}")]
    InvalidConfig(String),
}

/// Estimate the probability that two objects collide around `tca`.
pub fn estimate_collision_probability<P: Propagator + ?Sized>(
    propagator: &P,
    a: &ElementSet,
    b: &ElementSet,
    tca: DateTime<Utc>,
    config: &CollisionConfig,
) -> Result<CollisionEstimate, CollisionError> {
    if config.num_samples == 0 {
        return Err(CollisionError::InvalidConfig(
            "num_samples must be > 0".to_string(),
        ));
    }
    if !config.hard_body_radius_km.is_finite() || config.hard_body_radius_km < 0.0 {
        return Err(CollisionError::InvalidConfig(format!(
            "hard_body_radius_km must be finite and >= 0, got {}",
            config.hard_body_radius_km
        )));
    }
    let normal = Normal::new(0.0, config.position_sigma_km)
        .ok()
        .filter(|_| config.position_sigma_km.is_finite())
        .ok_or_else(|| {
            CollisionError::InvalidConfig(format!(
                "position_sigma_km must be finite and >= 0, got {}",
                config.position_sigma_km
            ))
        })?;

    let state_a = propagator.propagate(a, tca)?;
    let state_b = propagator.propagate(b, tca)?;
    let nominal_miss_km = state_a.distance_to(&state_b);

    let hits = count_hits(
        &state_a.position,
        &state_b.position,
        &normal,
        config.hard_body_radius_km,
        config.num_samples,
        config.seed,
    );
    let poc = hits as f64 / config.num_samples as f64;

    let (closest_approach_km, closest_approach_time) =
        scan_closest_approach(propagator, a, b, tca, nominal_miss_km, config);

    log::debug!(
        "PoC {}-{}: {}/{} hits, nominal miss {:.3} km",
        a.catalog_id,
        b.catalog_id,
        hits,
        config.num_samples,
        nominal_miss_km
    );

    Ok(CollisionEstimate {
        object_a_id: a.catalog_id,
        object_b_id: b.catalog_id,
        tca,
        poc,
        hits,
        samples: config.num_samples,
        risk: PocRisk::from_poc(poc),
        nominal_miss_km,
        closest_approach_km,
        closest_approach_time,
        relative_velocity_km_s: (state_a.velocity - state_b.velocity).norm(),
        position_sigma_km: config.position_sigma_km,
        hard_body_radius_km: config.hard_body_radius_km,
    })
}

/// Count perturbed sample pairs closer than `radius_km`
fn count_hits(
    nominal_a: &Vector3<f64>,
    nominal_b: &Vector3<f64>,
    normal: &Normal<f64>,
    radius_km: f64,
    num_samples: usize,
    seed: u64,
) -> usize {
    let chunks = num_samples.div_ceil(SAMPLE_CHUNK);

    (0..chunks)
        .into_par_iter()
        .map(|chunk_idx| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk_idx as u64));
            let len = SAMPLE_CHUNK.min(num_samples - chunk_idx * SAMPLE_CHUNK);

            let mut draw = || {
                Vector3::new(
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                )
            };

            (0..len)
                .filter(|_| {
                    let perturbed_a = nominal_a + draw();
                    let perturbed_b = nominal_b + draw();
                    (perturbed_a - perturbed_b).norm() < radius_km
                })
                .count()
        })
        .sum()
}

/// Unperturbed closest approach over evenly spaced instants around the TCA.
///
/// Starts from the nominal TCA separation; instants where either object
/// fails to propagate are skipped.
fn scan_closest_approach<P: Propagator + ?Sized>(
    propagator: &P,
    a: &ElementSet,
    b: &ElementSet,
    tca: DateTime<Utc>,
    nominal_miss_km: f64,
    config: &CollisionConfig,
) -> (f64, DateTime<Utc>) {
    let mut best = (nominal_miss_km, tca);
    let points = config.scan_points;
    if points == 0 {
        return best;
    }

    let half = config.scan_window_s;
    let spacing = if points > 1 {
        2.0 * half / (points - 1) as f64
    } else {
        0.0
    };

    for i in 0..points {
        let time = offset_seconds(tca, -half + spacing * i as f64);
        if let (Ok(sa), Ok(sb)) = (propagator.propagate(a, time), propagator.propagate(b, time)) {
            let distance = sa.distance_to(&sb);
            if distance < best.0 {
                best = (distance, time);
            }
        }
    }
    best
}
