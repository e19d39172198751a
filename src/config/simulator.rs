// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulator server configuration
//!
//! Settings for the mock PLC simulator: where it listens and how fast its
//! background simulation loop ticks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the simulator server component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Flag to enable or disable the simulator server.
    ///
    /// When disabled the daemon starts no listener and the simulation loop
    /// does not run.
    pub enabled: bool,

    /// The network address the simulator will bind to.
    ///
    /// Default is "127.0.0.1"; use "0.0.0.0" to accept connections from the
    /// whole network segment. The link carries no authentication, so only
    /// bind wider than localhost on a trusted network.
    pub address: String,

    /// The TCP port the simulator will listen on. Default 8888.
    pub port: u16,

    /// Period of the background simulation loop in milliseconds.
    ///
    /// Every tick perturbs all register values, whether or not any client
    /// is connected. Default 500.
    pub tick_interval_ms: u64,
}

impl SimulatorConfig {
    /// Simulation loop period as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The `address:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".to_string(), // Localhost for security
            port: 8888,
            tick_interval_ms: 500,
        }
    }
}
