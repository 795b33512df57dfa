//! Element set data and catalog loading

pub mod element_set;
mod loader;

pub use element_set::{ElementSet, ElementSetError, MU_EARTH_KM3_S2};
pub use loader::{latest_per_object, load_catalog, parse_records, parse_tle_text, ElementRecord};
