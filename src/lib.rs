//! Spacewatch - orbital analytics
//!
//! Conjunction screening with time-of-closest-approach refinement,
//! ground-station pass prediction, Monte Carlo collision probability and
//! numerical propagation, all running against a pluggable element
//! propagator.

pub mod collision;
pub mod config;
pub mod conjunction;
pub mod data;
pub mod frames;
pub mod propagation;
pub mod reentry;
pub mod visibility;

pub use collision::{estimate_collision_probability, CollisionConfig, CollisionEstimate, PocRisk};
pub use config::AnalyticsConfig;
pub use conjunction::{screen_conjunctions, screen_horizon, ConjunctionEvent, RiskLevel, ScreeningConfig};
pub use data::{load_catalog, ElementSet};
pub use propagation::hifi::{propagate_high_fidelity, HiFiSettings, HiFiTrajectory};
pub use propagation::{Propagator, Sgp4Propagator, StateVector};
pub use reentry::{estimate_lifetime, LifetimeEstimate, ReentryRisk};
pub use visibility::{predict_passes, GroundStation, Pass, PassConfig, Site};
