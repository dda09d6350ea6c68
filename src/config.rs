//! Runtime configuration for the sampling extension
//!
//! Values come from a JSON file and may be overridden from the environment.

use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, SamplingError};

/// Sampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed used by nodes whose `seed` input is negative. `None` draws from OS entropy.
    pub global_seed: Option<u64>,
    /// Graph path under which distribution nodes are created
    pub default_graph_root: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            global_seed: None,
            default_graph_root: constants::graph::DEFAULT_ROOT.to_string(),
        }
    }
}

impl SamplingConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SamplingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading sampling config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply `NODLE_GLOBAL_SEED` / `NODLE_GRAPH_ROOT` overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(constants::env::GLOBAL_SEED) {
            let raw = raw.trim();
            if raw.is_empty() {
                self.global_seed = None;
            } else {
                let seed = raw.parse::<u64>().map_err(|e| {
                    SamplingError::Config(format!(
                        "{} must be a non-negative integer, got '{}': {}",
                        constants::env::GLOBAL_SEED,
                        raw,
                        e
                    ))
                })?;
                self.global_seed = Some(seed);
            }
        }

        if let Some(root) = lookup(constants::env::GRAPH_ROOT) {
            self.default_graph_root = root;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !self.default_graph_root.starts_with(constants::graph::SEPARATOR) {
            return Err(SamplingError::Config(format!(
                "default_graph_root must be an absolute path, got '{}'",
                self.default_graph_root
            )));
        }
        if self.global_seed.is_none() {
            warn!("No global seed configured; negative node seeds draw from OS entropy");
        }
        Ok(())
    }
}
