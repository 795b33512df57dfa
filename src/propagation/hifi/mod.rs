//! High-fidelity orbit propagation
//!
//! Numerical integration of the equations of motion for trajectory
//! refinement beyond the analytic propagator.
//!
//! # Architecture
//!
//! The module is organized around composable components:
//!
//! - **Integrator**: Fixed-step numerical integration (classic RK4)
//! - **AtmosphereModel**: Atmospheric density models (piecewise exponential)
//! - **ForceModel**: Individual force contributions (gravity with J2, drag)
//! - **HiFiPropagator**: Orchestrates integration with configurable forces
//!
//! # Example
//!
//! ```ignore
//! use spacewatch::propagation::hifi::*;
//!
//! let mut forces = CompositeForce::new();
//! forces.add(Box::new(EarthGravity::j2()));
//! forces.add(Box::new(AtmosphericDrag::new(PiecewiseExponential::new())));
//!
//! let propagator = HiFiPropagator::new(RungeKutta4::new(), forces).with_step(30.0);
//! let trajectory = propagator.propagate(initial_state, 5400.0)?;
//! ```

pub mod atmosphere;
pub mod forces;
pub mod integrator;
pub mod state;

mod hifi_propagator;
mod settings;

pub use atmosphere::{AtmosphereModel, Exponential, PiecewiseExponential};
pub use forces::{AtmosphericDrag, CompositeForce, EarthGravity, ForceModel, GravityModel};
pub use hifi_propagator::{HiFiError, HiFiPropagator, HiFiSample, HiFiTrajectory, ReentryEvent};
pub use integrator::{Integrator, RungeKutta4};
pub use settings::HiFiSettings;
pub use state::{cd_area_to_mass_from_bstar, OrbitalState, SpacecraftState};

use chrono::{DateTime, Utc};

use crate::data::ElementSet;
use crate::propagation::Propagator;

/// Seed from `propagator` at `start` and integrate per `settings`
///
/// The drag parameter comes from the element set's B* term, falling back to
/// the default Cd and area-to-mass ratio when B* is effectively zero.
pub fn propagate_high_fidelity<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &ElementSet,
    start: DateTime<Utc>,
    settings: &HiFiSettings,
) -> Result<HiFiTrajectory, HiFiError> {
    let hifi = settings.build_propagator()?;
    let seed = propagator.propagate(elements, start)?;

    let initial = SpacecraftState::from_bstar(OrbitalState::from_state_vector(&seed), elements.bstar);
    log::debug!(
        "High-fidelity run for {} from {} ({} s, Cd·A/m {:.5} m²/kg)",
        elements.catalog_id,
        start,
        settings.duration_s,
        initial.cd_area_to_mass
    );

    hifi.propagate(initial, settings.duration_s)
}
