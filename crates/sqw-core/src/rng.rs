//! Seeded random streams for initial states, thermal baths and workers.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Role a random stream plays in a simulation run.
///
/// Every role maps to a fixed substream id, so a run is reproducible from its
/// master seed alone regardless of how many workers it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Random initial spin configuration.
    Initial,
    /// Bath used while thermalizing before accumulation.
    Thermalize,
    /// Bath of the `k`-th accumulation worker.
    Worker(usize),
}

impl Stream {
    /// Substream id fed to [`derive_substream_seed`].
    pub fn id(self) -> u64 {
        match self {
            Stream::Initial => 0,
            Stream::Thermalize => 1,
            Stream::Worker(k) => 2 + k as u64,
        }
    }
}

/// `StdRng` that remembers the seed it was built from.
#[derive(Debug, Clone)]
pub struct RngHandle {
    seed: u64,
    rng: StdRng,
}

impl RngHandle {
    /// Stream seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Substream `substream` of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Stream for `role` under `master_seed`.
    pub fn for_stream(master_seed: u64, role: Stream) -> Self {
        Self::substream(master_seed, role.id())
    }

    /// Seed this handle was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// SipHash-1-3 of `(master_seed, substream)` under zero keys.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
