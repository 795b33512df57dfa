//! Earth gravity force model
//!
//! Two fidelity levels:
//! - Point mass (μ/r²)
//! - Point mass + J2 (oblateness)

use super::ForceModel;
use crate::propagation::hifi::state::{SpacecraftState, EARTH_RADIUS_M, J2, MU_EARTH};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Gravity model fidelity selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GravityModel {
    /// Simple point mass: a = -μ/r³ × r
    PointMass,

    /// Point mass + J2 oblateness perturbation
    #[default]
    J2,
}

/// Earth gravity force model
pub struct EarthGravity {
    model: GravityModel,
}

impl EarthGravity {
    /// Create a gravity model from a configuration enum
    pub fn from_model(model: GravityModel) -> Self {
        Self { model }
    }

    /// Create a point mass gravity model
    pub fn point_mass() -> Self {
        Self::from_model(GravityModel::PointMass)
    }

    /// Create a J2 gravity model
    ///
    /// J2 accounts for Earth's oblateness (equatorial bulge).
    pub fn j2() -> Self {
        Self::from_model(GravityModel::J2)
    }

    pub fn model(&self) -> GravityModel {
        self.model
    }

    /// Point mass acceleration: a = -μ/r³ × r
    fn point_mass_accel(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.norm();
        if r < 1.0 {
            // Avoid singularity at origin
            return Vector3::zeros();
        }
        let r3 = r * r * r;
        -MU_EARTH / r3 * position
    }

    /// J2 perturbation acceleration in Cartesian coordinates
    fn j2_accel(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let x = position.x;
        let y = position.y;
        let z = position.z;
        let r = position.norm();

        if r < 1.0 {
            return Vector3::zeros();
        }

        let r2 = r * r;
        let r5 = r2 * r2 * r;
        let re2 = EARTH_RADIUS_M * EARTH_RADIUS_M;

        // (3/2) × J2 × μ × Re² / r⁵
        let factor = 1.5 * J2 * MU_EARTH * re2 / r5;
        let z2_r2 = (z * z) / r2;

        Vector3::new(
            factor * x * (5.0 * z2_r2 - 1.0),
            factor * y * (5.0 * z2_r2 - 1.0),
            factor * z * (5.0 * z2_r2 - 3.0),
        )
    }
}

impl ForceModel for EarthGravity {
    fn acceleration(&self, state: &SpacecraftState) -> Vector3<f64> {
        let pos = &state.orbital.position;

        match self.model {
            GravityModel::PointMass => self.point_mass_accel(pos),
            GravityModel::J2 => self.point_mass_accel(pos) + self.j2_accel(pos),
        }
    }

    fn name(&self) -> &'static str {
        match self.model {
            GravityModel::PointMass => "Earth Gravity (Point Mass)",
            GravityModel::J2 => "Earth Gravity (J2)",
        }
    }

    fn description(&self) -> &'static str {
        match self.model {
            GravityModel::PointMass => "Central body gravity μ/r²",
            GravityModel::J2 => "Central gravity with J2 oblateness",
        }
    }
}
