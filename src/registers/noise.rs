// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pseudo-random noise for the register simulation
//!
//! The simulation loop perturbs every register with Gaussian noise around
//! its trend. The generator is a fast XORShift PRNG with a Box-Muller
//! transform on top; it is not cryptographic, but it is cheap, has no
//! external state, and a fixed seed reproduces the exact sample sequence,
//! which the store tests rely on.

use std::time::SystemTime;

/// XORShift pseudo-random generator with Gaussian output.
pub struct NoiseGenerator {
    /// Internal XORShift state; evolves with every sample.
    rng_state: u32,
}

impl NoiseGenerator {
    /// Create a generator with a fixed seed.
    ///
    /// The same seed produces the same sample sequence.
    pub fn new(seed: u32) -> Self {
        Self {
            // XORShift degenerates on an all-zero state
            rng_state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Create a generator seeded from the system clock.
    pub fn new_from_system_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u32;
        Self::new(seed)
    }

    /// Next uniform sample in `[-1.0, 1.0]`.
    pub fn random_float(&mut self) -> f64 {
        // XOR Shift algorithm for pseudo-random numbers
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    /// Next uniform sample in `[min, max]`.
    pub fn random_range(&mut self, min: f64, max: f64) -> f64 {
        let unit = (self.random_float() + 1.0) / 2.0;
        min + unit * (max - min)
    }

    /// Next sample from a standard Gaussian distribution (mean 0, sigma 1),
    /// via the Box-Muller transform.
    pub fn random_gaussian(&mut self) -> f64 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = u1.max(0.0001);

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Gaussian sample scaled to the given standard deviation.
    pub fn gauss(&mut self, sigma: f64) -> f64 {
        self.random_gaussian() * sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = NoiseGenerator::new(12345);
        let mut b = NoiseGenerator::new(12345);
        for _ in 0..100 {
            assert_eq!(a.random_float(), b.random_float());
        }
    }

    #[test]
    fn uniform_samples_stay_in_range() {
        let mut generator = NoiseGenerator::new_from_system_time();
        for _ in 0..1000 {
            let sample = generator.random_float();
            assert!((-1.0..=1.0).contains(&sample));

            let ranged = generator.random_range(1.0, 3.0);
            assert!((1.0..=3.0).contains(&ranged));
        }
    }

    #[test]
    fn gaussian_mean_is_near_zero() {
        let mut generator = NoiseGenerator::new(42);
        let n = 10_000;
        let mean = (0..n).map(|_| generator.random_gaussian()).sum::<f64>() / n as f64;
        // Loose bound; the distribution check only needs the center
        assert_relative_eq!(mean, 0.0, epsilon = 0.05);
    }

    #[test]
    fn zero_seed_does_not_wedge_the_generator() {
        let mut generator = NoiseGenerator::new(0);
        let first = generator.random_float();
        let second = generator.random_float();
        assert_ne!(first, second);
    }
}
