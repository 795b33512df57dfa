//! Atmospheric drag force model
//!
//! Computes acceleration due to atmospheric drag using the formula:
//!
//! a = -½ ρ (Cd × A / m) |v_rel| v_rel
//!
//! where:
//! - ρ is atmospheric density from the configured atmosphere model
//! - v_rel is velocity relative to the co-rotating atmosphere
//! - Cd × A / m comes from the spacecraft state

use super::ForceModel;
use crate::propagation::hifi::atmosphere::AtmosphereModel;
use crate::propagation::hifi::state::{SpacecraftState, OMEGA_EARTH};
use nalgebra::Vector3;

/// Altitude above which the drag term is dropped (meters)
pub const DRAG_CUTOFF_ALTITUDE_M: f64 = 1_000_000.0;

/// Atmospheric drag force model
///
/// Generic over the atmosphere model so density models can be swapped.
pub struct AtmosphericDrag<A: AtmosphereModel> {
    atmosphere: A,

    /// Above this altitude the drag term is zero (meters)
    max_altitude: f64,
}

impl<A: AtmosphereModel> AtmosphericDrag<A> {
    /// Create a new drag model with the given atmosphere and the 1000 km cutoff
    pub fn new(atmosphere: A) -> Self {
        Self::with_cutoff(atmosphere, DRAG_CUTOFF_ALTITUDE_M)
    }

    /// Create with a custom cutoff altitude in meters
    pub fn with_cutoff(atmosphere: A, max_altitude: f64) -> Self {
        Self {
            atmosphere,
            max_altitude,
        }
    }

    /// Get reference to the atmosphere model
    pub fn atmosphere(&self) -> &A {
        &self.atmosphere
    }

    /// Velocity relative to the atmosphere, which co-rotates with Earth (v - ω × r)
    fn relative_velocity(&self, state: &SpacecraftState) -> Vector3<f64> {
        let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
        let v_atm = omega.cross(&state.orbital.position);
        state.orbital.velocity - v_atm
    }
}

impl<A: AtmosphereModel> ForceModel for AtmosphericDrag<A> {
    fn acceleration(&self, state: &SpacecraftState) -> Vector3<f64> {
        let altitude = state.orbital.altitude();
        if altitude > self.max_altitude || state.cd_area_to_mass <= 0.0 {
            return Vector3::zeros();
        }

        let rho = self.atmosphere.density(altitude / 1000.0);
        if rho <= 0.0 {
            return Vector3::zeros();
        }

        let v_rel = self.relative_velocity(state);
        let v_rel_mag = v_rel.norm();

        -0.5 * rho * state.cd_area_to_mass * v_rel_mag * v_rel
    }

    fn name(&self) -> &'static str {
        "Atmospheric Drag"
    }

    fn description(&self) -> &'static str {
        "Aerodynamic drag from atmospheric density"
    }
}
