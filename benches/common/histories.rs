//! History generators for extraction benchmarks.
//!
//! Produces deterministic batches of [`HistoryPair`]s with controllable
//! access density, seeded through `rand::rngs::StdRng`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use staleness::ds::{AccessRegistry, HistoryPair};

#[derive(Debug, Clone, Copy)]
pub enum Density {
    /// Every step accessed with probability `p`.
    Uniform { p: f64 },
    /// A handful of accesses, mostly outside the short windows.
    Sparse,
    /// Every bit set.
    Saturated,
    /// No accesses at all.
    Idle,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSpec {
    pub rows: usize,
    pub window_bits: usize,
    pub density: Density,
    pub seed: u64,
}

impl BatchSpec {
    pub fn generate(self) -> Vec<HistoryPair> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let words = self.window_bits.div_ceil(64);
        (0..self.rows)
            .map(|_| {
                let read = stream(&mut rng, words, self.window_bits, self.density);
                let write = stream(&mut rng, words, self.window_bits, self.density);
                HistoryPair::from_words(read, write)
            })
            .collect()
    }
}

fn stream(rng: &mut StdRng, words: usize, window_bits: usize, density: Density) -> Vec<u64> {
    let mut out = vec![0u64; words];
    match density {
        Density::Idle => {},
        Density::Saturated => out.fill(u64::MAX),
        Density::Uniform { p } => {
            for step in 0..window_bits {
                if rng.gen_bool(p) {
                    out[step / 64] |= 1 << (step % 64);
                }
            }
        },
        Density::Sparse => {
            for _ in 0..3 {
                let step = rng.gen_range(0..window_bits);
                out[step / 64] |= 1 << (step % 64);
            }
        },
    }
    out
}

/// Fills a registry with `keys` keys over `steps` steps of random traffic.
pub fn populated_registry(
    keys: u64,
    steps: u64,
    window_bits: usize,
    seed: u64,
) -> AccessRegistry<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut registry = AccessRegistry::with_capacity(window_bits, keys as usize);
    for step in 0..steps {
        let key = rng.gen_range(0..keys);
        if rng.gen_bool(0.8) {
            registry.record_read(key, step);
        } else {
            registry.record_write(key, step);
        }
    }
    registry
}
