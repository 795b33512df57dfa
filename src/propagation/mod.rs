//! Orbital propagation
//!
//! ## Propagator adapter
//!
//! The `propagator` submodule defines the [`Propagator`] trait every
//! analysis runs against, with SGP4 via satkit as the reference
//! implementation, and the `track` submodule samples ground tracks through it.
//!
//! ## High-fidelity propagation
//!
//! The `hifi` submodule integrates the equations of motion (two-body, J2,
//! drag) with fixed-step RK4 from a state seeded by any [`Propagator`].
//!
//! # Example
//!
//! ```ignore
//! use spacewatch::propagation::{Propagator, Sgp4Propagator};
//! use spacewatch::propagation::hifi::{propagate_high_fidelity, HiFiSettings};
//!
//! let sgp4 = Sgp4Propagator::new();
//! let state = sgp4.propagate(&elements, now)?;
//! let trajectory = propagate_high_fidelity(&sgp4, &elements, now, &HiFiSettings::default())?;
//! ```

pub mod hifi;
mod propagator;
mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use propagator::*;
pub use track::*;
