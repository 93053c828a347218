//! Seeded randomness for samplers and blueprint builds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic random source owned by one chain, swap driver or build.
///
/// Every handle is created from an explicit `u64` seed. Chains and swap
/// attempts get their own handle seeded through [`derive_substream_seed`], so
/// adding a chain never shifts the draws of another.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a handle from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform value in `[0, 1)`.
    pub fn uniform01(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws a uniform index in `[0, upper)`; `upper` must be positive.
    pub fn index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

/// Seed of substream `substream` under `master_seed`.
///
/// SipHash-1-3 with zero keys over both words; stable across platforms.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
