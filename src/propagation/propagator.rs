//! Propagator adapter
//!
//! Every downstream algorithm talks to element propagation through the
//! [`Propagator`] trait, so SGP4, a numerical integrator or an analytic mock
//! can stand behind it interchangeably.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use rayon::prelude::*;
use satkit::sgp4::sgp4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::element_set::validate_line;
use crate::data::ElementSet;
use crate::frames::{
    earth_fixed_to_geodetic, rotate_inertial_to_earth_fixed, sidereal_angle, GeodeticPosition,
};

/// Position/velocity of an object at an instant
///
/// Expressed in the Earth-centred inertial-like frame of the propagator
/// (TEME for SGP4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// Position (km)
    pub position: Vector3<f64>,
    /// Velocity (km/s)
    pub velocity: Vector3<f64>,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: DateTime<Utc>) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Distance to another state's position (km)
    pub fn distance_to(&self, other: &StateVector) -> f64 {
        (self.position - other.position).norm()
    }

    /// Speed (km/s)
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Earth-fixed position given the sidereal angle at this state's epoch
    pub fn earth_fixed(&self, sidereal_angle: f64) -> Vector3<f64> {
        rotate_inertial_to_earth_fixed(&self.position, sidereal_angle)
    }

    /// Geodetic sub-point, computing the sidereal angle for this epoch
    pub fn geodetic(&self) -> GeodeticPosition {
        let ecef = self.earth_fixed(sidereal_angle(self.epoch));
        earth_fixed_to_geodetic(ecef.x, ecef.y, ecef.z)
    }
}

/// Failure of the element-propagation primitive for one object at one instant
///
/// Never retried by the core; callers get the catalog ID and the primitive's
/// own code so they can log or retry at a higher level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("object {catalog_id}: element set rejected: {code}")]
    InvalidElements { catalog_id: u32, code: String },

    #[error("object {catalog_id}: propagation failed at {time}: {code}")]
    Failed {
        catalog_id: u32,
        time: DateTime<Utc>,
        code: String,
    },
}

impl PropagationError {
    pub fn catalog_id(&self) -> u32 {
        match self {
            Self::InvalidElements { catalog_id, .. } | Self::Failed { catalog_id, .. } => {
                *catalog_id
            }
        }
    }
}

/// One successfully propagated object of a batch
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PropagatedObject {
    /// Index into the element-set slice the batch was built from
    pub index: usize,
    pub catalog_id: u32,
    pub state: StateVector,
    /// Earth-fixed position (km)
    pub earth_fixed: Vector3<f64>,
    pub geodetic: GeodeticPosition,
}

/// Result of propagating many element sets to one instant
#[derive(Debug, Clone)]
pub struct Batch {
    pub time: DateTime<Utc>,
    /// Sidereal angle shared by every object in the batch
    pub sidereal_angle: f64,
    /// Successes, in input order
    pub objects: Vec<PropagatedObject>,
    pub failures: Vec<PropagationError>,
}

/// Uniform element-propagation interface
///
/// Implementations must be `Send + Sync`: batch entry points fan out across
/// threads, each call reading only its own inputs.
pub trait Propagator: Send + Sync {
    /// State of one object at one instant
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError>;

    /// Propagator name for logging
    fn name(&self) -> &'static str {
        "propagator"
    }

    /// Propagate many objects to one instant.
    ///
    /// The sidereal angle is computed once for the instant and reused for
    /// every object's Earth-fixed and geodetic projection. A failure for one
    /// object is recorded and does not affect the others.
    fn propagate_batch(&self, elements: &[ElementSet], time: DateTime<Utc>) -> Batch {
        let theta = sidereal_angle(time);

        let results: Vec<Result<PropagatedObject, PropagationError>> = elements
            .par_iter()
            .enumerate()
            .map(|(index, set)| {
                let state = self.propagate(set, time)?;
                let earth_fixed = rotate_inertial_to_earth_fixed(&state.position, theta);
                let geodetic = earth_fixed_to_geodetic(earth_fixed.x, earth_fixed.y, earth_fixed.z);
                Ok(PropagatedObject {
                    index,
                    catalog_id: set.catalog_id,
                    state,
                    earth_fixed,
                    geodetic,
                })
            })
            .collect();

        let mut objects = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(object) => objects.push(object),
                Err(e) => {
                    log::trace!("{}", e);
                    failures.push(e);
                }
            }
        }

        log::debug!(
            "{}: propagated {} of {} objects at {}",
            self.name(),
            objects.len(),
            elements.len(),
            time
        );

        Batch {
            time,
            sidereal_angle: theta,
            objects,
            failures,
        }
    }
}

impl<P: Propagator + ?Sized> Propagator for &P {
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        (**self).propagate(elements, time)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// SGP4 via satkit
///
/// Stateless: the element lines are reparsed on every call so the adapter
/// can be shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let catalog_id = elements.catalog_id;
        validate_line(&elements.line1, 1)
            .and_then(|_| validate_line(&elements.line2, 2))
            .map_err(|e| PropagationError::InvalidElements {
                catalog_id,
                code: e.to_string(),
            })?;

        let mut tle = satkit::TLE::load_2line(&elements.line1, &elements.line2).map_err(|e| {
            PropagationError::InvalidElements {
                catalog_id,
                code: e.to_string(),
            }
        })?;

        let instant = to_instant(time).map_err(|code| PropagationError::Failed {
            catalog_id,
            time,
            code,
        })?;

        match sgp4(&mut tle, &[instant]) {
            Ok(result) => {
                // TEME, meters and m/s
                let pos = result.pos.column(0);
                let vel = result.vel.column(0);
                let position = Vector3::new(pos[0], pos[1], pos[2]) / 1000.0;
                let velocity = Vector3::new(vel[0], vel[1], vel[2]) / 1000.0;

                if !position.iter().chain(velocity.iter()).all(|v| v.is_finite()) {
                    return Err(PropagationError::Failed {
                        catalog_id,
                        time,
                        code: "non-finite state".to_string(),
                    });
                }

                Ok(StateVector::new(position, velocity, time))
            }
            Err(e) => Err(PropagationError::Failed {
                catalog_id,
                time,
                code: format!("{:?}", e),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "SGP4"
    }
}

/// Convert a chrono instant into satkit's time type
fn to_instant(time: DateTime<Utc>) -> Result<satkit::Instant, String> {
    use chrono::{Datelike, Timelike};

    let seconds = time.second() as f64 + time.nanosecond() as f64 * 1e-9;
    satkit::Instant::from_datetime(
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        seconds,
    )
    .map_err(|e| format!("{:?}", e))
}
