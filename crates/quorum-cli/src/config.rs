//! TOML configuration for the `quorum` CLI.
//!
//! ```toml
//! [scheduler]
//! min_participants = 3
//! min_block_slots = 2
//! max_block_multiplier = 2
//!
//! [display]
//! timezone = "Europe/Berlin"
//! ```
//!
//! Every key is optional. Command-line flags override the file, and the file
//! overrides the built-in defaults.

use std::path::Path;

use anyhow::{Context, Result};
use quorum_engine::SchedulerConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub scheduler: SchedulerConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// IANA zone used to project slots for display.
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// Scheduler limits given on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchedulerOverrides {
    pub min_participants: Option<usize>,
    pub min_block_slots: Option<usize>,
    pub max_block_multiplier: Option<usize>,
}

impl CliConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(Path::new(path)),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply flag overrides and validate the result.
    pub fn scheduler_config(&self, overrides: SchedulerOverrides) -> Result<SchedulerConfig> {
        let config = SchedulerConfig {
            min_participants: overrides
                .min_participants
                .unwrap_or(self.scheduler.min_participants),
            min_block_slots: overrides
                .min_block_slots
                .unwrap_or(self.scheduler.min_block_slots),
            max_block_multiplier: overrides
                .max_block_multiplier
                .unwrap_or(self.scheduler.max_block_multiplier),
        };
        config.validate().context("Invalid scheduler settings")?;
        Ok(config)
    }
}
