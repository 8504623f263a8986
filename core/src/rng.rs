//! Deterministic random number generation for level generation.
//!
//! RULE: the generator never touches a platform RNG. Each level number gets
//! its own stream, seeded from (master_seed XOR scrambled level number), so
//! level N looks the same on every machine for a given seed and generating
//! level N never depends on having generated N-1.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct LevelRng {
    inner: Pcg64Mcg,
}

impl LevelRng {
    pub fn for_level(master_seed: u64, level: u64) -> Self {
        let derived_seed = master_seed ^ level.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial with probability 1/2.
    pub fn coin(&mut self) -> bool {
        self.inner.next_u64() & 1 == 1
    }

    /// Pick one element. Panics on an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// Partial Fisher-Yates: move `k` random elements to the front.
    pub fn choose_prefix<T>(&mut self, items: &mut [T], k: usize) {
        let k = k.min(items.len());
        for i in 0..k {
            let j = i + self.next_u64_below((items.len() - i) as u64) as usize;
            items.swap(i, j);
        }
    }
}
