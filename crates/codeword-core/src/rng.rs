//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a seeded `StdRng`. In tests and simulations,
//! a scripted or fixed-seed implementation is injected so that role
//! distribution and prompt selection are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// Production RNG backed by `rand`'s `StdRng`.
#[derive(Debug, Clone)]
pub struct StdRandom(StdRng);

impl StdRandom {
    /// Seeds from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Seeds from a fixed value, for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for StdRandom {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Picks an index in `0..len` uniformly. `len` must be non-zero.
#[allow(clippy::cast_possible_truncation)]
pub fn pick_index(len: usize, rng: &mut dyn DeterministicRng) -> usize {
    debug_assert!(len > 0, "pick_index on an empty range");
    let max = len.saturating_sub(1).min(u32::MAX as usize) as u32;
    (rng.next_u32_range(0, max) as usize).min(len - 1)
}

/// Fisher–Yates shuffle driven by a `DeterministicRng`.
///
/// Draws exactly `items.len() - 1` values (none for slices shorter than 2).
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn DeterministicRng) {
    for i in (1..items.len()).rev() {
        let j = pick_index(i + 1, rng);
        items.swap(i, j);
    }
}
