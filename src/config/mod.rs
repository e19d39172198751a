// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Application configuration
//!
//! The configuration is a YAML file with one section per component; every
//! field has a default, so a partial file (or no file at all) is valid.
//! Command-line flags override file values through [`Config::apply_args`].
//!
//! ```yaml
//! simulator:
//!   address: 127.0.0.1
//!   port: 8888
//!   tick_interval_ms: 500
//! polling:
//!   poll_interval_ms: 1000
//! ```

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

mod polling;
mod simulator;
pub mod utils;

pub use polling::PollingConfig;
pub use simulator::SimulatorConfig;
pub use utils::validate_specific_rules;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulator server settings.
    pub simulator: SimulatorConfig,

    /// Polling client settings.
    pub polling: PollingConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Load the configuration file if it exists, falling back to defaults.
    ///
    /// The simulator must run out of the box, so a missing file only logs a
    /// warning. A file that exists but does not parse is still an error.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            warn!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides on top of the loaded values.
    ///
    /// The address and port apply to both sides of the link since the
    /// binaries each drive only one side.
    pub fn apply_args(
        &mut self,
        address: Option<String>,
        port: Option<u16>,
        tick_interval_ms: Option<u64>,
        poll_interval_ms: Option<u64>,
    ) {
        if let Some(address) = address {
            self.simulator.address = address.clone();
            self.polling.address = address;
        }
        if let Some(port) = port {
            self.simulator.port = port;
            self.polling.port = port;
        }
        if let Some(tick_interval_ms) = tick_interval_ms {
            self.simulator.tick_interval_ms = tick_interval_ms;
        }
        if let Some(poll_interval_ms) = poll_interval_ms {
            self.polling.poll_interval_ms = poll_interval_ms;
        }
    }
}
