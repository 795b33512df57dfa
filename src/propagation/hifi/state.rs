//! Orbital and spacecraft state representations
//!
//! Provides the core state vectors used for numerical integration. Internally
//! everything is SI (meters, m/s); conversions to the km-based
//! [`StateVector`] happen at the module boundary.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::propagation::StateVector;

/// Full orbital state vector for numerical integration
///
/// Position and velocity are in the same Earth-centered inertial frame the
/// seeding propagator reports in.
#[derive(Debug, Clone)]
pub struct OrbitalState {
    /// Position (meters)
    pub position: Vector3<f64>,

    /// Velocity (m/s)
    pub velocity: Vector3<f64>,

    /// Epoch of this state
    pub epoch: DateTime<Utc>,
}

impl OrbitalState {
    /// Create a new orbital state
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: DateTime<Utc>) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Create from a propagator state in km and km/s
    pub fn from_state_vector(state: &StateVector) -> Self {
        Self {
            position: state.position * 1000.0,
            velocity: state.velocity * 1000.0,
            epoch: state.epoch,
        }
    }

    /// Convert back to km and km/s
    pub fn to_state_vector(&self) -> StateVector {
        StateVector::new(self.position_km(), self.velocity_km_s(), self.epoch)
    }

    /// Get position in kilometers
    pub fn position_km(&self) -> Vector3<f64> {
        self.position / 1000.0
    }

    /// Get velocity in km/s
    pub fn velocity_km_s(&self) -> Vector3<f64> {
        self.velocity / 1000.0
    }

    /// Distance from Earth center in meters
    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    /// Altitude above the equatorial radius in meters
    pub fn altitude(&self) -> f64 {
        self.radius() - EARTH_RADIUS_M
    }

    /// Altitude above the equatorial radius in kilometers
    pub fn altitude_km(&self) -> f64 {
        self.altitude() / 1000.0
    }

    /// Orbital speed in m/s
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Two-body specific orbital energy (vis-viva) in J/kg
    pub fn specific_energy(&self) -> f64 {
        let v2 = self.velocity.norm_squared();
        let r = self.position.norm();
        0.5 * v2 - MU_EARTH / r
    }

    /// Specific energy including the J2 term of the geopotential, in J/kg
    ///
    /// This is the quantity conserved by the gravity-only J2 dynamics.
    pub fn j2_specific_energy(&self) -> f64 {
        let r = self.position.norm();
        let z2_r2 = self.position.z * self.position.z / (r * r);
        let j2_potential =
            MU_EARTH * J2 * EARTH_RADIUS_M * EARTH_RADIUS_M / (2.0 * r * r * r) * (3.0 * z2_r2 - 1.0);
        self.specific_energy() + j2_potential
    }

    /// Semi-major axis in meters (negative for hyperbolic)
    pub fn semi_major_axis(&self) -> f64 {
        -MU_EARTH / (2.0 * self.specific_energy())
    }

    /// Orbital period in seconds (only valid for elliptical orbits)
    pub fn period(&self) -> Option<f64> {
        let a = self.semi_major_axis();
        if a > 0.0 {
            Some(2.0 * std::f64::consts::PI * (a.powi(3) / MU_EARTH).sqrt())
        } else {
            None
        }
    }
}

/// Orbital state plus the physical property drag depends on
#[derive(Debug, Clone)]
pub struct SpacecraftState {
    /// Orbital state (position, velocity, epoch)
    pub orbital: OrbitalState,

    /// Drag coefficient times area over mass (Cd * A / m) in m²/kg
    pub cd_area_to_mass: f64,
}

impl SpacecraftState {
    /// Create a new spacecraft state
    pub fn new(orbital: OrbitalState, cd_area_to_mass: f64) -> Self {
        Self {
            orbital,
            cd_area_to_mass,
        }
    }

    /// Create a spacecraft state with the default Cd = 2.2, A/m = 0.01 m²/kg
    pub fn with_defaults(orbital: OrbitalState) -> Self {
        Self::new(orbital, DEFAULT_CD * DEFAULT_AREA_TO_MASS)
    }

    /// Create a spacecraft state whose drag term is derived from an SGP4 B* term
    pub fn from_bstar(orbital: OrbitalState, bstar: f64) -> Self {
        Self::new(orbital, cd_area_to_mass_from_bstar(bstar))
    }

    /// Ballistic coefficient (m / (Cd * A)) in kg/m²
    ///
    /// Lower values mean more drag, faster decay.
    pub fn ballistic_coefficient(&self) -> f64 {
        if self.cd_area_to_mass > 0.0 {
            1.0 / self.cd_area_to_mass
        } else {
            f64::INFINITY
        }
    }
}

/// Convert an SGP4 B* drag term (1/earth radii) to Cd * A / m in m²/kg
///
/// B* = ρ₀ · (Cd·A/m) / 2 with ρ₀ = 0.15696615 kg/m²/ER. A B* that is
/// effectively zero or not finite falls back to Cd = 2.2 and A/m = 0.01 m²/kg.
pub fn cd_area_to_mass_from_bstar(bstar: f64) -> f64 {
    if !bstar.is_finite() || bstar.abs() <= BSTAR_EPSILON {
        return DEFAULT_CD * DEFAULT_AREA_TO_MASS;
    }
    2.0 * bstar.abs() / BSTAR_REFERENCE_DENSITY
}

// Physical constants
/// Earth's gravitational parameter (GM) in m³/s²
pub const MU_EARTH: f64 = 3.986004418e14;

/// Earth's equatorial radius (WGS-84) in meters
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Earth's second zonal harmonic
pub const J2: f64 = 1.08263e-3;

pub use crate::frames::OMEGA_EARTH;

/// SGP4 reference density ρ₀ in kg/m²/ER
pub const BSTAR_REFERENCE_DENSITY: f64 = 0.156_966_15;

/// Default drag coefficient when the element set carries no drag term
pub const DEFAULT_CD: f64 = 2.2;

/// Default area-to-mass ratio in m²/kg
pub const DEFAULT_AREA_TO_MASS: f64 = 0.01;

const BSTAR_EPSILON: f64 = 1e-12;
