//! Numerical integrators for orbit propagation
//!
//! The `Integrator` trait abstracts the stepping method so the propagator can
//! be driven by different schemes. The only implementation is classic
//! fixed-step fourth-order Runge-Kutta: there is no error estimate and no
//! step-size control, so callers needing tighter accuracy shorten the step.

use crate::frames::offset_seconds;
use crate::propagation::hifi::state::OrbitalState;
use nalgebra::Vector3;

/// Time derivative of an orbital state: (velocity, acceleration)
pub type Derivatives<'a> = dyn Fn(&OrbitalState) -> (Vector3<f64>, Vector3<f64>) + 'a;

/// Trait for numerical integrators
///
/// Implementations must be `Send + Sync` to allow parallel propagation
/// of multiple satellites.
pub trait Integrator: Send + Sync {
    /// Advance `state` by `dt` seconds
    fn step(&self, state: &OrbitalState, dt: f64, derivatives: &Derivatives<'_>) -> OrbitalState;

    /// Integrator name
    fn name(&self) -> &'static str;

    /// Integrator order
    fn order(&self) -> u8;

    /// Number of function evaluations per step
    fn stages(&self) -> usize;
}

/// Classic fourth-order Runge-Kutta
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKutta4;

impl RungeKutta4 {
    pub fn new() -> Self {
        Self
    }
}

impl Integrator for RungeKutta4 {
    fn step(&self, state: &OrbitalState, dt: f64, derivatives: &Derivatives<'_>) -> OrbitalState {
        let half = dt / 2.0;
        let mid_epoch = offset_seconds(state.epoch, half);
        let end_epoch = offset_seconds(state.epoch, dt);

        let (v1, a1) = derivatives(state);

        let s2 = OrbitalState::new(
            state.position + v1 * half,
            state.velocity + a1 * half,
            mid_epoch,
        );
        let (v2, a2) = derivatives(&s2);

        let s3 = OrbitalState::new(
            state.position + v2 * half,
            state.velocity + a2 * half,
            mid_epoch,
        );
        let (v3, a3) = derivatives(&s3);

        let s4 = OrbitalState::new(state.position + v3 * dt, state.velocity + a3 * dt, end_epoch);
        let (v4, a4) = derivatives(&s4);

        let new_pos = state.position + (v1 + 2.0 * v2 + 2.0 * v3 + v4) * (dt / 6.0);
        let new_vel = state.velocity + (a1 + 2.0 * a2 + 2.0 * a3 + a4) * (dt / 6.0);

        OrbitalState::new(new_pos, new_vel, end_epoch)
    }

    fn name(&self) -> &'static str {
        "Runge-Kutta 4"
    }

    fn order(&self) -> u8 {
        4
    }

    fn stages(&self) -> usize {
        4
    }
}
