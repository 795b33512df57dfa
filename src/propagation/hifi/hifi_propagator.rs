//! High-fidelity orbit propagator
//!
//! Orchestrates the numerical integration with configurable force models
//! to produce a sampled trajectory.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::Serialize;
use thiserror::Error;

use super::forces::CompositeForce;
use super::integrator::Integrator;
use super::state::{OrbitalState, SpacecraftState};
use crate::frames::GeodeticPosition;
use crate::propagation::{PropagationError, StateVector};

/// Failure of a high-fidelity propagation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HiFiError {
    /// The seeding propagator could not produce the initial state
    #[error(transparent)]
    Seed(#[from] PropagationError),

    #[error("invalid high-fidelity settings: {0}")]
    InvalidConfig(String),

    #[error("invalid initial state: {0}")]
    InvalidState(String),

    /// The state stopped being finite
    #[error("integration diverged at {time}")]
    Diverged { time: DateTime<Utc> },
}

/// One output sample of a trajectory
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HiFiSample {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub geodetic: GeodeticPosition,
    /// Inertial position (km)
    pub position_km: Vector3<f64>,
    /// Inertial velocity (km/s)
    pub velocity_km_s: Vector3<f64>,
    pub speed_km_s: f64,
}

impl HiFiSample {
    fn from_orbital(orbital: &OrbitalState) -> Self {
        let state = orbital.to_state_vector();
        Self {
            time: state.epoch,
            // Sidereal angle evaluated at this sample's own time
            geodetic: state.geodetic(),
            position_km: state.position,
            velocity_km_s: state.velocity,
            speed_km_s: state.speed(),
        }
    }

    pub fn state_vector(&self) -> StateVector {
        StateVector::new(self.position_km, self.velocity_km_s, self.time)
    }
}

/// Where and when integration stopped below the re-entry altitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReentryEvent {
    pub time: DateTime<Utc>,
    pub altitude_km: f64,
}

/// Result of a high-fidelity propagation
#[derive(Debug, Clone, Serialize)]
pub struct HiFiTrajectory {
    /// Initial state followed by one sample per completed step
    pub samples: Vec<HiFiSample>,
    pub steps_taken: usize,
    pub step_s: f64,
    /// Drag parameter used (Cd·A/m, m²/kg)
    pub cd_area_to_mass: f64,
    /// Two-body specific energy at the first and last sample (J/kg)
    pub initial_energy: f64,
    pub final_energy: f64,
    /// Set when integration stopped early below the re-entry altitude
    pub reentry: Option<ReentryEvent>,
}

impl HiFiTrajectory {
    pub fn final_sample(&self) -> Option<&HiFiSample> {
        self.samples.last()
    }

    pub fn reentered(&self) -> bool {
        self.reentry.is_some()
    }
}

/// High-fidelity orbit propagator
///
/// Combines a numerical integrator with force models and steps a spacecraft
/// state forward with a fixed step.
pub struct HiFiPropagator {
    integrator: Box<dyn Integrator>,
    forces: CompositeForce,
    step_s: f64,
    reentry_altitude_m: f64,
}

impl HiFiPropagator {
    /// Create a propagator with a 60 s step and a 100 km re-entry altitude
    pub fn new(integrator: impl Integrator + 'static, forces: CompositeForce) -> Self {
        Self {
            integrator: Box::new(integrator),
            forces,
            step_s: 60.0,
            reentry_altitude_m: 100_000.0,
        }
    }

    pub fn with_step(mut self, step_s: f64) -> Self {
        self.step_s = step_s;
        self
    }

    pub fn with_reentry_altitude_km(mut self, altitude_km: f64) -> Self {
        self.reentry_altitude_m = altitude_km * 1000.0;
        self
    }

    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    pub fn forces(&self) -> &CompositeForce {
        &self.forces
    }

    /// Propagate `initial` for `duration_s` seconds
    ///
    /// Takes `floor(duration_s / step)` steps and returns the initial state
    /// plus one sample per step. Stops early, flagging the trajectory, once
    /// the altitude drops below the re-entry altitude.
    pub fn propagate(
        &self,
        initial: SpacecraftState,
        duration_s: f64,
    ) -> Result<HiFiTrajectory, HiFiError> {
        if !self.step_s.is_finite() || self.step_s <= 0.0 {
            return Err(HiFiError::InvalidConfig(format!(
                "step must be positive, got {}",
                self.step_s
            )));
        }
        if !duration_s.is_finite() || duration_s < 0.0 {
            return Err(HiFiError::InvalidConfig(format!(
                "duration must be non-negative, got {}",
                duration_s
            )));
        }
        if !is_finite_state(&initial.orbital) || initial.orbital.position.norm() < 1.0 {
            return Err(HiFiError::InvalidState(
                "position magnitude too small or not finite".to_string(),
            ));
        }

        let steps = (duration_s / self.step_s).floor() as usize;
        log::debug!(
            "{} (order {}) over {} force models: {} steps of {} s, {} force evaluations",
            self.integrator.name(),
            self.integrator.order(),
            self.forces.len(),
            steps,
            self.step_s,
            steps * self.integrator.stages()
        );

        let cd_area_to_mass = initial.cd_area_to_mass;
        let initial_energy = initial.orbital.specific_energy();
        let mut state = initial;
        let mut samples = Vec::with_capacity(steps + 1);
        samples.push(HiFiSample::from_orbital(&state.orbital));

        let mut steps_taken = 0;
        let mut reentry = None;

        for _ in 0..steps {
            let forces = &self.forces;
            let derivatives = |orbital: &OrbitalState| {
                let stage_state = SpacecraftState::new(orbital.clone(), cd_area_to_mass);
                (orbital.velocity, forces.total_acceleration(&stage_state))
            };

            state.orbital = self.integrator.step(&state.orbital, self.step_s, &derivatives);
            if !is_finite_state(&state.orbital) {
                return Err(HiFiError::Diverged {
                    time: state.orbital.epoch,
                });
            }
            steps_taken += 1;
            samples.push(HiFiSample::from_orbital(&state.orbital));

            let altitude = state.orbital.altitude();
            if altitude < self.reentry_altitude_m {
                log::info!(
                    "Re-entry altitude reached at {} ({:.1} km) after {} steps",
                    state.orbital.epoch,
                    altitude / 1000.0,
                    steps_taken
                );
                reentry = Some(ReentryEvent {
                    time: state.orbital.epoch,
                    altitude_km: altitude / 1000.0,
                });
                break;
            }
        }

        Ok(HiFiTrajectory {
            samples,
            steps_taken,
            step_s: self.step_s,
            cd_area_to_mass,
            initial_energy,
            final_energy: state.orbital.specific_energy(),
            reentry,
        })
    }
}

fn is_finite_state(state: &OrbitalState) -> bool {
    state.position.iter().chain(state.velocity.iter()).all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::sidereal_angle;
    use crate::propagation::hifi::forces::GravityModel;
    use crate::propagation::hifi::integrator::RungeKutta4;
    use crate::propagation::hifi::state::{EARTH_RADIUS_M, MU_EARTH};
    use chrono::{Duration, TimeZone};

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 29, 12, 0, 0).unwrap()
    }

    fn circular(altitude_m: f64, inclination_deg: f64) -> SpacecraftState {
        let r = EARTH_RADIUS_M + altitude_m;
        let v = (MU_EARTH / r).sqrt();
        let i = inclination_deg.to_radians();
        SpacecraftState::with_defaults(OrbitalState::new(
            Vector3::new(r, 0.0, 0.0),
            Vector3::new(0.0, v * i.cos(), v * i.sin()),
            epoch(),
        ))
    }

    fn propagator(gravity: GravityModel, include_drag: bool) -> HiFiPropagator {
        HiFiPropagator::new(
            RungeKutta4::new(),
            CompositeForce::for_gravity(gravity, include_drag),
        )
    }

    #[test]
    fn test_sample_count() {
        let hifi = propagator(GravityModel::J2, true);
        let trajectory = hifi.propagate(circular(500_000.0, 51.6), 5400.0).unwrap();

        assert_eq!(trajectory.steps_taken, 90);
        assert_eq!(trajectory.samples.len(), 91);
        assert_eq!(trajectory.samples[0].time, epoch());
        assert_eq!(
            trajectory.final_sample().unwrap().time,
            epoch() + Duration::seconds(5400)
        );
        assert!(!trajectory.reentered());
    }

    #[test]
    fn test_partial_step_is_dropped() {
        let hifi = propagator(GravityModel::PointMass, false).with_step(30.0);
        let trajectory = hifi.propagate(circular(500_000.0, 0.0), 100.0).unwrap();

        assert_eq!(trajectory.samples.len(), 4);
        assert_eq!(
            trajectory.final_sample().unwrap().time,
            epoch() + Duration::seconds(90)
        );

        let empty = hifi.propagate(circular(500_000.0, 0.0), 0.0).unwrap();
        assert_eq!(empty.samples.len(), 1);
        assert_eq!(empty.steps_taken, 0);
    }

    #[test]
    fn test_point_mass_energy_conservation() {
        // 2000 km, well above the drag cutoff, three orbits
        let initial = circular(2_000_000.0, 51.6);
        let e0 = initial.orbital.specific_energy();
        let period = initial.orbital.period().unwrap();

        let hifi = propagator(GravityModel::PointMass, false);
        let trajectory = hifi.propagate(initial, 3.0 * period).unwrap();
        assert_eq!(trajectory.samples.len(), (3.0 * period / 60.0).floor() as usize + 1);

        for sample in &trajectory.samples {
            let state = OrbitalState::from_state_vector(&sample.state_vector());
            let drift = ((state.specific_energy() - e0) / e0).abs();
            assert!(drift < 1e-6, "energy drift {} at {}", drift, sample.time);
        }
        assert!(((trajectory.final_energy - e0) / e0).abs() < 1e-6);
    }

    #[test]
    fn test_j2_energy_conservation() {
        let initial = circular(2_000_000.0, 51.6);
        let e0 = initial.orbital.j2_specific_energy();
        let two_body_e0 = initial.orbital.specific_energy();
        let period = initial.orbital.period().unwrap();

        let hifi = propagator(GravityModel::J2, false);
        let trajectory = hifi.propagate(initial, 3.0 * period).unwrap();

        let mut max_two_body_change: f64 = 0.0;
        for sample in &trajectory.samples {
            let state = OrbitalState::from_state_vector(&sample.state_vector());
            let drift = ((state.j2_specific_energy() - e0) / e0).abs();
            assert!(drift < 1e-6, "J2 energy drift {} at {}", drift, sample.time);
            max_two_body_change = max_two_body_change
                .max(((state.specific_energy() - two_body_e0) / two_body_e0).abs());
        }

        // Oblateness trades energy in and out of the two-body term
        assert!(max_two_body_change > 1e-4);
    }

    #[test]
    fn test_drag_decays_orbit() {
        let initial = circular(300_000.0, 51.6);
        let a0 = initial.orbital.semi_major_axis();

        let dragless = propagator(GravityModel::PointMass, false)
            .propagate(initial.clone(), 5400.0)
            .unwrap();
        let with_drag = propagator(GravityModel::PointMass, true)
            .propagate(initial, 5400.0)
            .unwrap();

        let a_dragless = -MU_EARTH / (2.0 * dragless.final_energy);
        let a_drag = -MU_EARTH / (2.0 * with_drag.final_energy);

        assert!((a_dragless - a0).abs() < 10.0);
        assert!(a_drag < a0 - 100.0, "semi-major axis only fell {} m", a0 - a_drag);
        assert!(with_drag.final_energy < with_drag.initial_energy);
    }

    #[test]
    fn test_reentry_stops_early() {
        // 120 km with 90% of circular speed: falls below 100 km within minutes
        let r = EARTH_RADIUS_M + 120_000.0;
        let v = 0.9 * (MU_EARTH / r).sqrt();
        let initial = SpacecraftState::with_defaults(OrbitalState::new(
            Vector3::new(r, 0.0, 0.0),
            Vector3::new(0.0, v, 0.0),
            epoch(),
        ));

        let hifi = propagator(GravityModel::PointMass, false).with_step(10.0);
        let trajectory = hifi.propagate(initial, 5400.0).unwrap();

        let reentry = trajectory.reentry.expect("should re-enter");
        assert!(reentry.altitude_km < 100.0);
        assert!(trajectory.steps_taken < 540);
        assert_eq!(trajectory.samples.len(), trajectory.steps_taken + 1);
        assert_eq!(trajectory.final_sample().unwrap().time, reentry.time);
    }

    #[test]
    fn test_geodetic_tracks_earth_rotation() {
        let hifi = propagator(GravityModel::PointMass, false);
        let trajectory = hifi.propagate(circular(700_000.0, 0.0), 1800.0).unwrap();

        for sample in &trajectory.samples {
            let inertial_lon = sample.position_km.y.atan2(sample.position_km.x);
            let expected = (inertial_lon - sidereal_angle(sample.time)).to_degrees();
            let mut diff = sample.geodetic.longitude_deg - expected;
            diff = (diff + 540.0).rem_euclid(360.0) - 180.0;
            assert!(diff.abs() < 1e-6, "longitude off by {} at {}", diff, sample.time);
            assert!(sample.geodetic.latitude_deg.abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let hifi = propagator(GravityModel::J2, true).with_step(0.0);
        assert!(matches!(
            hifi.propagate(circular(500_000.0, 0.0), 600.0),
            Err(HiFiError::InvalidConfig(_))
        ));

        let hifi = propagator(GravityModel::J2, true);
        assert!(matches!(
            hifi.propagate(circular(500_000.0, 0.0), -1.0),
            Err(HiFiError::InvalidConfig(_))
        ));

        let origin = SpacecraftState::with_defaults(OrbitalState::new(
            Vector3::zeros(),
            Vector3::zeros(),
            epoch(),
        ));
        assert!(matches!(
            hifi.propagate(origin, 600.0),
            Err(HiFiError::InvalidState(_))
        ));
    }
}
