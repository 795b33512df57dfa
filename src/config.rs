//! Analysis configuration
//!
//! Groups the per-analysis parameter structs so a single JSON file can tune
//! a whole run. Every section and field is optional and falls back to its
//! default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::collision::CollisionConfig;
use crate::conjunction::ScreeningConfig;
use crate::propagation::hifi::HiFiSettings;
use crate::visibility::{PassConfig, Site};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub site: Site,
    pub screening: ScreeningConfig,
    pub passes: PassConfig,
    pub collision: CollisionConfig,
    pub hifi: HiFiSettings,
}

impl AnalyticsConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse analytics config")
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded analytics config from {:?}", path);
        Ok(config)
    }
}
