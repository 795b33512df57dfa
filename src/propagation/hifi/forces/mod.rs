//! Force models for orbital mechanics
//!
//! Each force model implements the `ForceModel` trait, which computes
//! the acceleration contribution at a given spacecraft state. Models are
//! combined with `CompositeForce`, which sums their contributions.
//!
//! # Available Models
//!
//! - **EarthGravity**: Central body gravity with optional J2 perturbation
//! - **AtmosphericDrag**: Drag using a configurable atmosphere model

mod drag;
mod gravity;

pub use drag::{AtmosphericDrag, DRAG_CUTOFF_ALTITUDE_M};
pub use gravity::{EarthGravity, GravityModel};

use crate::propagation::hifi::atmosphere::PiecewiseExponential;
use crate::propagation::hifi::state::SpacecraftState;
use nalgebra::Vector3;

/// Trait for force model contributions
///
/// Models should be thread-safe for parallel propagation.
pub trait ForceModel: Send + Sync {
    /// Acceleration in m/s², in the same frame as `state.orbital.position`
    fn acceleration(&self, state: &SpacecraftState) -> Vector3<f64>;

    /// Force model name for debugging and logging
    fn name(&self) -> &'static str;

    /// Brief description of the model
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Composite force model that aggregates multiple force contributions
///
/// # Example
///
/// ```ignore
/// let mut forces = CompositeForce::new();
/// forces.add(Box::new(EarthGravity::j2()));
/// forces.add(Box::new(AtmosphericDrag::new(PiecewiseExponential::new())));
///
/// let total_accel = forces.total_acceleration(&state);
/// ```
pub struct CompositeForce {
    forces: Vec<Box<dyn ForceModel>>,
}

impl Default for CompositeForce {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeForce {
    /// Create an empty composite force model
    pub fn new() -> Self {
        Self { forces: Vec::new() }
    }

    /// Add a force model to the composite
    pub fn add(&mut self, force: Box<dyn ForceModel>) {
        log::debug!("Adding force model: {}", force.name());
        self.forces.push(force);
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// List all force model names
    pub fn model_names(&self) -> Vec<&'static str> {
        self.forces.iter().map(|f| f.name()).collect()
    }

    /// Sum of all force contributions
    pub fn total_acceleration(&self, state: &SpacecraftState) -> Vector3<f64> {
        self.forces
            .iter()
            .map(|f| f.acceleration(state))
            .fold(Vector3::zeros(), |acc, a| acc + a)
    }
}

/// Standard force model configurations
impl CompositeForce {
    /// Point mass gravity only
    pub fn point_mass_only() -> Self {
        let mut forces = Self::new();
        forces.add(Box::new(EarthGravity::point_mass()));
        forces
    }

    /// Gravity of the chosen fidelity, plus drag over the banded atmosphere if requested
    pub fn for_gravity(gravity: GravityModel, include_drag: bool) -> Self {
        let mut forces = Self::new();
        forces.add(Box::new(EarthGravity::from_model(gravity)));
        if include_drag {
            forces.add(Box::new(AtmosphericDrag::new(PiecewiseExponential::new())));
        }
        forces
    }

    /// Basic LEO configuration: J2 gravity + drag
    pub fn leo_basic() -> Self {
        Self::for_gravity(GravityModel::J2, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::hifi::state::{OrbitalState, EARTH_RADIUS_M, MU_EARTH};
    use chrono::{TimeZone, Utc};

    fn circular(altitude_m: f64) -> SpacecraftState {
        let epoch = Utc.with_ymd_and_hms(2026, 1, 29, 12, 0, 0).unwrap();
        let r = EARTH_RADIUS_M + altitude_m;
        SpacecraftState::with_defaults(OrbitalState::new(
            Vector3::new(r, 0.0, 0.0),
            Vector3::new(0.0, (MU_EARTH / r).sqrt(), 0.0),
            epoch,
        ))
    }

    #[test]
    fn test_composite_force_empty() {
        let forces = CompositeForce::new();
        assert!(forces.is_empty());
        assert_eq!(forces.total_acceleration(&circular(400_000.0)), Vector3::zeros());
    }

    #[test]
    fn test_composite_force_gravity() {
        let forces = CompositeForce::point_mass_only();
        let state = circular(400_000.0);

        let accel = forces.total_acceleration(&state);

        assert!(accel.x < 0.0);
        assert!(accel.y.abs() < 1e-10);
        assert!(accel.z.abs() < 1e-10);

        // μ/r² ≈ 8.7 m/s² at 400 km
        let r = state.orbital.radius();
        let expected_mag = MU_EARTH / (r * r);
        assert!((accel.norm() - expected_mag).abs() / expected_mag < 1e-10);
    }

    #[test]
    fn test_leo_basic_sums_models() {
        let forces = CompositeForce::leo_basic();
        assert_eq!(forces.len(), 2);
        assert_eq!(forces.model_names(), vec!["Earth Gravity (J2)", "Atmospheric Drag"]);

        let state = circular(300_000.0);
        let gravity = EarthGravity::j2().acceleration(&state);
        let drag = AtmosphericDrag::new(PiecewiseExponential::new()).acceleration(&state);
        let total = forces.total_acceleration(&state);
        assert!((total - (gravity + drag)).norm() < 1e-15);
        assert!(drag.norm() > 0.0);
    }

    #[test]
    fn test_for_gravity_without_drag() {
        let forces = CompositeForce::for_gravity(GravityModel::PointMass, false);
        assert_eq!(forces.model_names(), vec!["Earth Gravity (Point Mass)"]);
    }
}
