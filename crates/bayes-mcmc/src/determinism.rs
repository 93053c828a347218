use bayes_core::derive_substream_seed;

const SWAP_STREAM: u64 = 0xC0FF_EE00_5A5A_0001;

/// Seed of the RNG driving chain `index`.
pub fn chain_seed(master_seed: u64, index: usize) -> u64 {
    derive_substream_seed(master_seed, index as u64)
}

/// Seed of the RNG that picks and tests heat swaps.
pub fn swap_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed ^ SWAP_STREAM, 0)
}

/// Seed used to draw missing initial values while building the model.
pub fn build_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed ^ SWAP_STREAM, 1)
}
