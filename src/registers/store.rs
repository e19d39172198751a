// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared register store
//!
//! The store owns the authoritative current value of every register. It is
//! mutated by exactly two actors, the simulation loop and client `write`
//! commands, and read by client `read` commands from any number of
//! concurrent sessions. A single mutex around the register map is the only
//! lock in the system; every access serializes through it, so a reader can
//! never observe a value mid-update.

use log::info;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::noise::NoiseGenerator;
use super::table::{RegisterSpec, REGISTER_TABLE};

/// Mutable state of one register.
///
/// `base_value` is the center the simulation oscillates around. Only an
/// explicit write moves it; simulation ticks recompute `current_value` from
/// it, so repeated ticks wander around a stable center until a write
/// rebases it.
#[derive(Debug, Clone)]
struct RegisterState {
    spec: &'static RegisterSpec,
    current_value: f64,
    base_value: f64,
}

/// Thread-safe map of register id to simulated value.
///
/// Cloning the store is cheap and shares the underlying map, the same way
/// the sessions and the simulation loop share it at runtime.
#[derive(Clone)]
pub struct RegisterStore {
    inner: Arc<Mutex<HashMap<String, RegisterState>>>,
}

impl RegisterStore {
    /// Create a store seeded from the static register table.
    ///
    /// Every register starts at the midpoint of its range, both as current
    /// and as base value.
    pub fn new() -> Self {
        let mut registers = HashMap::new();
        for spec in REGISTER_TABLE {
            let mid = spec.midpoint();
            registers.insert(
                spec.id.to_string(),
                RegisterState {
                    spec,
                    current_value: mid,
                    base_value: mid,
                },
            );
        }
        info!("Initialized {} registers", registers.len());

        Self {
            inner: Arc::new(Mutex::new(registers)),
        }
    }

    /// Current value of one register, or `None` for an unknown id.
    pub fn get(&self, id: &str) -> Option<f64> {
        let registers = self.inner.lock().unwrap();
        registers.get(id).map(|state| state.current_value)
    }

    /// Current values of a batch of registers.
    ///
    /// Never fails outright: known ids land in the value map, unknown ids in
    /// the missing list, and a mixed batch yields both.
    pub fn get_many(&self, ids: &[String]) -> (BTreeMap<String, f64>, Vec<String>) {
        let registers = self.inner.lock().unwrap();
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();

        for id in ids {
            match registers.get(id) {
                Some(state) => {
                    values.insert(id.clone(), state.current_value);
                }
                None => missing.push(id.clone()),
            }
        }

        (values, missing)
    }

    /// Write a value to a register, rebasing its simulation center.
    ///
    /// The value is clamped to the register bounds so the range invariant
    /// holds after every mutation; the stored (possibly clamped) value is
    /// returned. Returns `None` for an unknown id.
    pub fn set(&self, id: &str, value: f64) -> Option<f64> {
        let mut registers = self.inner.lock().unwrap();
        match registers.get_mut(id) {
            Some(state) => {
                let value = value.clamp(state.spec.min_value, state.spec.max_value);
                state.current_value = value;
                state.base_value = value;
                Some(value)
            }
            None => None,
        }
    }

    /// One simulation step over every register.
    ///
    /// Each register gets `base + trend(elapsed) + noise`, clamped to its
    /// bounds. The trend is a category-specific sine wave keyed on the
    /// register display name; the noise is Gaussian with a category-specific
    /// standard deviation. `elapsed_secs` is the time since the simulation
    /// loop started.
    pub fn simulate_tick(&self, elapsed_secs: f64, rng: &mut NoiseGenerator) {
        let mut registers = self.inner.lock().unwrap();
        for state in registers.values_mut() {
            let (trend, noise) = trend_and_noise(state.spec, elapsed_secs, rng);
            let next = state.base_value + trend + noise;
            state.current_value = next.clamp(state.spec.min_value, state.spec.max_value);
        }
    }

    /// Snapshot of every register's current value.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let registers = self.inner.lock().unwrap();
        registers
            .iter()
            .map(|(id, state)| (id.clone(), state.current_value))
            .collect()
    }

    /// Number of registers in the store.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// True when the store holds no registers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-category trend and noise terms.
///
/// The categories mimic how the corresponding physical quantities behave on
/// a real machine: temperature drifts slowly, vibration oscillates fast,
/// pressure occasionally spikes. The exact numbers are cosmetic; the shape
/// (sine period, amplitude, noise sigma per category) is the contract.
fn trend_and_noise(
    spec: &RegisterSpec,
    elapsed_secs: f64,
    rng: &mut NoiseGenerator,
) -> (f64, f64) {
    let name = spec.display_name;

    if name.contains("Temperature") {
        // Slow 60 s cycle, ±5 degrees, ±2 degree noise
        ((elapsed_secs / 60.0).sin() * 5.0, rng.gauss(2.0))
    } else if name.contains("Pressure") {
        // 30 s cycle, ±1 bar, with a 1% chance of a transient spike
        let mut trend = (elapsed_secs / 30.0).sin();
        if rng.random_range(0.0, 1.0) < 0.01 {
            trend += rng.random_range(1.0, 3.0);
        }
        (trend, rng.gauss(0.1))
    } else if name.contains("Vibration") {
        // Fast 10 s oscillation, ±2 mm/s, ±1 mm/s noise
        ((elapsed_secs / 10.0).sin() * 2.0, rng.gauss(1.0))
    } else if name.contains("Speed") {
        // Gradual 2 minute cycle, ±100 RPM, ±10 RPM noise
        ((elapsed_secs / 120.0).sin() * 100.0, rng.gauss(10.0))
    } else if name.contains("Current") {
        // Load variations over a 45 s cycle, ±5 A, ±1 A noise
        ((elapsed_secs / 45.0).sin() * 5.0, rng.gauss(1.0))
    } else if name.contains("Voltage") {
        // Relatively stable, 3 minute cycle, ±10 V, ±2 V noise
        ((elapsed_secs / 180.0).sin() * 10.0, rng.gauss(2.0))
    } else {
        // Default pattern scaled to the register's range
        let range = spec.range();
        (
            (elapsed_secs / 60.0).sin() * range * 0.1,
            rng.gauss(range * 0.05),
        )
    }
}
