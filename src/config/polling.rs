// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling client configuration
//!
//! Settings for the sensor client: which simulator to talk to, how often to
//! poll, and the bounds on every blocking operation. Every network wait the
//! client performs is covered by one of these timeouts; a hung peer can
//! never wedge the polling flow.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the polling sensor client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Address of the simulator (or real PLC gateway) to connect to.
    pub address: String,

    /// TCP port of the simulator. Default 8888.
    pub port: u16,

    /// Interval between poll cycles in milliseconds. Default 1000.
    pub poll_interval_ms: u64,

    /// Bound on connection establishment in milliseconds. Default 5000.
    pub connect_timeout_ms: u64,

    /// Bound on one request/response round in milliseconds. Default 5000.
    pub request_timeout_ms: u64,

    /// Pause before the single reconnect attempt that follows a failed
    /// poll, in milliseconds. Default 1000.
    pub reconnect_delay_ms: u64,

    /// Bound on handing one event to the subscriber in milliseconds.
    ///
    /// A subscriber that stays full longer than this loses the event; the
    /// poll loop keeps running. Default 250.
    pub dispatch_timeout_ms: u64,
}

impl PollingConfig {
    /// The `address:port` string the client connects to.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8888,
            poll_interval_ms: 1000,
            connect_timeout_ms: 5000,
            request_timeout_ms: 5000,
            reconnect_delay_ms: 1000,
            dispatch_timeout_ms: 250,
        }
    }
}
