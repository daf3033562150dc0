//! Seeded randomness
//!
//! Every random choice in the simulation (spawn position, velocity, letter
//! corruption, Level 5 chaos rolls) goes through [`RandomSource`] so a run is
//! reproducible from its seed and tests can script exact outcomes.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Source of uniform samples in [0, 1)
pub trait RandomSource {
    /// Next uniform sample in [0, 1)
    fn next_unit(&mut self) -> f32;

    /// True with probability `p`
    fn chance(&mut self, p: f32) -> bool {
        self.next_unit() < p
    }

    /// Uniform sample in [lo, hi)
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_unit() * (hi - lo)
    }

    /// Uniform sample in [-half, half)
    fn spread(&mut self, half: f32) -> f32 {
        (self.next_unit() - 0.5) * 2.0 * half
    }

    /// Uniform index into a collection of `len` items (`len` must be non-zero)
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() requires a non-empty collection");
        ((self.next_unit() * len as f32) as usize).min(len.saturating_sub(1))
    }
}

/// Production RNG: PCG32 seeded from the run seed
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: Pcg32,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SimRng {
    fn next_unit(&mut self) -> f32 {
        self.inner.random::<f32>()
    }
}

/// Replays a fixed list of samples, then repeats `fallback` forever
///
/// Used by tests and replays to force specific rolls.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    samples: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedRng {
    pub fn new(samples: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            fallback: fallback.clamp(0.0, 0.999_999),
        }
    }

    /// Always returns the same sample
    pub fn constant(value: f32) -> Self {
        Self::new(std::iter::empty(), value)
    }
}

impl RandomSource for ScriptedRng {
    fn next_unit(&mut self) -> f32 {
        self.samples.pop_front().unwrap_or(self.fallback)
    }
}
