//! Configuration for high-fidelity propagation

use serde::{Deserialize, Serialize};

use super::forces::{CompositeForce, GravityModel};
use super::hifi_propagator::{HiFiError, HiFiPropagator};
use super::integrator::RungeKutta4;

/// High-fidelity propagation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiFiSettings {
    /// Total propagation time (seconds)
    pub duration_s: f64,
    /// Fixed integration step (seconds)
    pub step_s: f64,
    pub gravity: GravityModel,
    pub include_drag: bool,
    /// Integration stops once altitude falls below this (km)
    pub reentry_altitude_km: f64,
}

impl Default for HiFiSettings {
    fn default() -> Self {
        Self {
            duration_s: 5400.0,
            step_s: 60.0,
            gravity: GravityModel::J2,
            include_drag: true,
            reentry_altitude_km: 100.0,
        }
    }
}

impl HiFiSettings {
    /// Quick look: two-minute steps
    pub fn fast() -> Self {
        Self {
            step_s: 120.0,
            ..Default::default()
        }
    }

    /// Ten-second steps
    pub fn high_precision() -> Self {
        Self {
            step_s: 10.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), HiFiError> {
        if !self.step_s.is_finite() || self.step_s <= 0.0 {
            return Err(HiFiError::InvalidConfig(format!(
                "step_s must be positive, got {}",
                self.step_s
            )));
        }
        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return Err(HiFiError::InvalidConfig(format!(
                "duration_s must be non-negative, got {}",
                self.duration_s
            )));
        }
        if !self.reentry_altitude_km.is_finite() {
            return Err(HiFiError::InvalidConfig(
                "reentry_altitude_km must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_forces(&self) -> CompositeForce {
        CompositeForce::for_gravity(self.gravity, self.include_drag)
    }

    /// RK4 propagator with these settings' forces, step and re-entry altitude
    pub fn build_propagator(&self) -> Result<HiFiPropagator, HiFiError> {
        self.validate()?;
        Ok(HiFiPropagator::new(RungeKutta4::new(), self.build_forces())
            .with_step(self.step_s)
            .with_reentry_altitude_km(self.reentry_altitude_km))
    }
}
