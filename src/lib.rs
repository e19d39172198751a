// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Simulated PLC Sensor Link
//!
//! Communication layer for a predictive-maintenance system: a mock PLC
//! simulator that serves named numeric registers over a newline-delimited
//! JSON-over-TCP protocol, and a polling client that delivers periodic
//! register snapshots to a subscriber.
//!
//! ## Components
//!
//! * [`protocol`] - Request/response messages and JSON line framing,
//!   shared by the client and the server
//! * [`registers`] - The static register table and the shared register
//!   store mutated by the simulation loop
//! * [`simulator`] - The TCP simulator server and its per-session loops
//! * [`client`] - The polling sensor client and its event stream
//! * [`daemon`] - Background task management for the simulator services
//! * [`config`] - YAML configuration with command-line overrides

pub mod client;
pub mod config;
pub mod daemon;
pub mod protocol;
pub mod registers;
pub mod simulator;
