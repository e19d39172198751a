// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Static register table
//!
//! The set of simulated registers is fixed at build time and identical on
//! both sides of the link: the simulator seeds its store from this table and
//! the polling client uses it to know which ids to request. No register is
//! ever added or removed at runtime.

/// Description of one simulated physical quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterSpec {
    /// Register address, e.g. `D20`. Unique across the table.
    pub id: &'static str,
    /// Human-readable label; also keys the simulation category.
    pub display_name: &'static str,
    /// Engineering unit of the value.
    pub unit: &'static str,
    /// Lower bound; values are clamped to `[min_value, max_value]`.
    pub min_value: f64,
    /// Upper bound, inclusive.
    pub max_value: f64,
}

impl RegisterSpec {
    /// Full span of the register, used by the default simulation category.
    pub fn range(&self) -> f64 {
        self.max_value - self.min_value
    }

    /// Midpoint of the range; the initial current and base value.
    pub fn midpoint(&self) -> f64 {
        (self.min_value + self.max_value) / 2.0
    }
}

/// The machine-parameter registers exposed by the simulated PLC.
pub const REGISTER_TABLE: &[RegisterSpec] = &[
    RegisterSpec {
        id: "D20",
        display_name: "Temperature",
        unit: "°C",
        min_value: 0.0,
        max_value: 100.0,
    },
    RegisterSpec {
        id: "D21",
        display_name: "Pressure",
        unit: "bar",
        min_value: 0.0,
        max_value: 10.0,
    },
    RegisterSpec {
        id: "D22",
        display_name: "Vibration",
        unit: "mm/s",
        min_value: 0.0,
        max_value: 50.0,
    },
    RegisterSpec {
        id: "D23",
        display_name: "Speed",
        unit: "RPM",
        min_value: 0.0,
        max_value: 3000.0,
    },
    RegisterSpec {
        id: "D24",
        display_name: "Current",
        unit: "A",
        min_value: 0.0,
        max_value: 100.0,
    },
    RegisterSpec {
        id: "D25",
        display_name: "Voltage",
        unit: "V",
        min_value: 0.0,
        max_value: 500.0,
    },
];

/// All register ids, in table order. This is the batch the polling client
/// requests on every poll cycle.
pub fn register_ids() -> Vec<String> {
    REGISTER_TABLE.iter().map(|spec| spec.id.to_string()).collect()
}

/// Look up a register description by id.
pub fn find_register(id: &str) -> Option<&'static RegisterSpec> {
    REGISTER_TABLE.iter().find(|spec| spec.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let ids = register_ids();
        for (i, id) in ids.iter().enumerate() {
            assert!(!ids[i + 1..].contains(id), "duplicate register id {}", id);
        }
    }

    #[test]
    fn bounds_are_ordered() {
        for spec in REGISTER_TABLE {
            assert!(
                spec.min_value < spec.max_value,
                "register {} has an empty range",
                spec.id
            );
        }
    }

    #[test]
    fn lookup_finds_known_and_rejects_unknown() {
        assert_eq!(find_register("D20").unwrap().display_name, "Temperature");
        assert!(find_register("D99").is_none());
    }
}
