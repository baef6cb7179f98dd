//! Seed handling for reproducible, block-parallel Monte Carlo streams.
//!
//! A run is identified by one `u64` seed. Draws are produced in fixed-size blocks and block
//! `b` owns a `StdRng` seeded from `(seed, b)` through SplitMix64, so the full sequence depends
//! only on the seed and the block size, never on how blocks are scheduled across threads.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

#[derive(Debug, Clone, Copy)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    #[inline]
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Seed of stream `stream_index` derived from `base_seed`.
#[inline]
pub fn stream_seed(base_seed: u64, stream_index: usize) -> u64 {
    let mut sm = SplitMix64::new(base_seed ^ (stream_index as u64).wrapping_mul(7_919));
    sm.next_u64()
}

/// Independent generator for stream `stream_index` of a run seeded with `base_seed`.
#[inline]
pub fn stream_rng(base_seed: u64, stream_index: usize) -> StdRng {
    StdRng::seed_from_u64(stream_seed(base_seed, stream_index))
}

/// Fresh seed from the thread RNG, used when the caller does not pin one.
pub fn fresh_seed() -> u64 {
    rand::rng().random::<u64>()
}
