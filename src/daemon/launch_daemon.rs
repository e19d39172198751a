// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module provides functionality for running and managing the
//! background tasks of the sensor link simulator:
//!
//! - The simulator TCP server accepting client sessions
//! - The register simulation loop
//! - System health monitoring (heartbeat)
//!
//! Each service runs as an independent Tokio task; the daemon structure
//! tracks and coordinates them so the whole set can be started and shut
//! down together.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_sensorlink::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch the daemon with all enabled services
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::registers::RegisterStore;
use crate::simulator::{run_simulation_loop, SimulatorServer};

/// How long [`Daemon::join`] waits for each task after shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinates the simulator's background services.
///
/// The `running` flag is shared with every task; each task checks it
/// periodically and terminates gracefully once it is cleared, so shutdown
/// can be triggered from a different task than the one running the accept
/// loop (e.g. a ctrl-c handler).
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    store: RegisterStore,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon with an empty task list and a freshly seeded
    /// register store.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            store: RegisterStore::new(),
        }
    }

    /// The register store shared by every service.
    ///
    /// Embedding code (or tests) can read and write registers directly
    /// through this handle; it is the same store the sessions serve.
    pub fn registers(&self) -> RegisterStore {
        self.store.clone()
    }

    /// Launch all configured services.
    ///
    /// Binds the simulator's listening socket before returning, so a bind
    /// failure (port in use, permission denied) fails the launch instead of
    /// surfacing later inside a background task.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        if config.simulator.enabled {
            self.start_simulation_loop(config)?;
            self.start_simulator_server(config).await?;
        } else {
            info!("Simulator server is disabled in configuration");
        }

        self.start_heartbeat()?;
        Ok(())
    }

    /// Start the register simulation loop.
    ///
    /// The loop ticks for the daemon's entire lifetime, whether or not any
    /// client is connected.
    fn start_simulation_loop(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting simulation loop with tick interval {} ms",
            config.simulator.tick_interval_ms
        );

        let store = self.store.clone();
        let running = self.running.clone();
        let tick_interval = config.simulator.tick_interval();
        let task = tokio::spawn(async move {
            run_simulation_loop(store, tick_interval, running).await
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the simulator TCP server.
    async fn start_simulator_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting simulator server on {}",
            config.simulator.bind_address()
        );

        let server = SimulatorServer::bind(
            &config.simulator,
            self.store.clone(),
            self.running.clone(),
        )
        .await?;

        let task = tokio::spawn(async move { server.run().await });
        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs a liveness message periodically, so
    /// an external monitor can tell the daemon is still making progress.
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut seconds = 0u64;
            while running.load(Ordering::SeqCst) {
                // Check the flag every second so shutdown is not held up
                // for a whole heartbeat period
                time::sleep(Duration::from_secs(1)).await;
                seconds += 1;
                if seconds % 60 == 0 {
                    debug!("Daemon heartbeat: running for {} s", seconds);
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Signal every task to stop. Safe to call from any task or thread;
    /// idempotent.
    pub fn shutdown(&self) {
        info!("Shutting down daemon");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to finish, bounded per task.
    ///
    /// A task that ignores the shutdown signal past the bound is logged and
    /// left behind rather than blocking the shutdown path indefinitely.
    pub async fn join(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            match time::timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(result)) => result?,
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => warn!("Task did not stop within {:?}, abandoning it", JOIN_TIMEOUT),
            }
        }
        info!("Daemon stopped");
        Ok(())
    }
}
