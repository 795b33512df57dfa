//! Atmospheric density models for drag calculations
//!
//! A trait-based abstraction so drag can run against different density
//! models.
//!
//! # Models
//!
//! - **PiecewiseExponential**: 28-band table of reference density and scale
//!   height from sea level to 1000 km (default)
//! - **Exponential**: single reference density and scale height

mod exponential;

pub use exponential::{Exponential, PiecewiseExponential};

/// Trait for atmospheric density models
///
/// Implementations must be thread-safe (Send + Sync) to allow
/// parallel propagation of multiple satellites.
pub trait AtmosphereModel: Send + Sync {
    /// Mass density in kg/m³ at a geometric altitude in kilometers
    fn density(&self, altitude_km: f64) -> f64;

    /// Model name for logging and display
    fn name(&self) -> &'static str;

    /// Brief description of the model
    fn description(&self) -> &'static str {
        "Atmospheric density model"
    }
}
