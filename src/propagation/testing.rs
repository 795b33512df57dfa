//! Analytic propagators for unit tests

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use nalgebra::{Rotation3, Vector3};

use super::{PropagationError, Propagator, StateVector};
use crate::data::{ElementSet, MU_EARTH_KM3_S2};
use crate::frames::seconds_between;

/// Straight-line motion from a reference epoch, keyed by catalog ID
#[derive(Debug, Clone)]
pub struct LinearPropagator {
    epoch: DateTime<Utc>,
    tracks: HashMap<u32, (Vector3<f64>, Vector3<f64>)>,
    failing: HashSet<u32>,
}

impl LinearPropagator {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            tracks: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn insert(&mut self, catalog_id: u32, position: Vector3<f64>, velocity: Vector3<f64>) {
        self.tracks.insert(catalog_id, (position, velocity));
    }

    pub fn fail(&mut self, catalog_id: u32) {
        self.failing.insert(catalog_id);
    }

    /// Placeholder element set carrying only a catalog ID
    pub fn elements(catalog_id: u32) -> ElementSet {
        ElementSet {
            catalog_id,
            ..Default::default()
        }
    }
}

impl Propagator for LinearPropagator {
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let catalog_id = elements.catalog_id;
        if self.failing.contains(&catalog_id) {
            return Err(PropagationError::Failed {
                catalog_id,
                time,
                code: "forced failure".into(),
            });
        }
        let (position, velocity) =
            self.tracks
                .get(&catalog_id)
                .ok_or_else(|| PropagationError::InvalidElements {
                    catalog_id,
                    code: "unknown object".into(),
                })?;
        let dt = seconds_between(self.epoch, time);
        Ok(StateVector::new(position + velocity * dt, *velocity, time))
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

/// Two-body circular orbit, optionally unavailable during a time interval
#[derive(Debug, Clone)]
pub struct CircularOrbitPropagator {
    pub epoch: DateTime<Utc>,
    pub radius_km: f64,
    pub inclination_rad: f64,
    pub raan_rad: f64,
    /// Argument of latitude at epoch
    pub phase_rad: f64,
    pub gap: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl CircularOrbitPropagator {
    pub fn new(epoch: DateTime<Utc>, radius_km: f64, inclination_deg: f64) -> Self {
        Self {
            epoch,
            radius_km,
            inclination_rad: inclination_deg.to_radians(),
            raan_rad: 0.0,
            phase_rad: 0.0,
            gap: None,
        }
    }

    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH_KM3_S2 / self.radius_km.powi(3)).sqrt()
    }
}

impl Propagator for CircularOrbitPropagator {
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        if let Some((from, to)) = self.gap {
            if time >= from && time <= to {
                return Err(PropagationError::Failed {
                    catalog_id: elements.catalog_id,
                    time,
                    code: "gap".into(),
                });
            }
        }

        let n = self.mean_motion();
        let u = self.phase_rad + n * seconds_between(self.epoch, time);
        let r = self.radius_km;
        let speed = r * n;

        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), self.raan_rad)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination_rad);
        let position = rotation * Vector3::new(r * u.cos(), r * u.sin(), 0.0);
        let velocity = rotation * Vector3::new(-speed * u.sin(), speed * u.cos(), 0.0);

        Ok(StateVector::new(position, velocity, time))
    }

    fn name(&self) -> &'static str {
        "circular"
    }
}

/// Rejects everything
#[derive(Debug, Clone, Copy)]
pub struct FailingPropagator;

impl Propagator for FailingPropagator {
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        Err(PropagationError::Failed {
            catalog_id: elements.catalog_id,
            time,
            code: "6".into(),
        })
    }
}
