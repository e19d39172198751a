// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register table, shared store and simulation noise
//!
//! A register is a named simulated sensor/actuator value with bounds. The
//! static table lists the registers both sides of the link know about; the
//! store holds their live values on the simulator side.

pub mod noise;
pub mod store;
pub mod table;

pub use noise::NoiseGenerator;
pub use store::RegisterStore;
pub use table::{find_register, register_ids, RegisterSpec, REGISTER_TABLE};
