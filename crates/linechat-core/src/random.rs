//! Random number generation abstraction for coordinator election
//!
//! Election picks a replacement coordinator uniformly at random. The trait
//! lets production code use entropy-seeded randomness while tests swap in a
//! fixed seed for deterministic, repeatable elections.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Abstraction over the randomness used to pick an election winner.
pub trait RandomSource: Send {
    /// Pick an index uniformly in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Entropy-seeded randomness for production use.
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Deterministic randomness from a fixed seed.
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_stay_in_range() {
        let mut rng = SystemRandom::new();
        for _ in 0..100 {
            assert!(rng.pick(3) < 3);
        }
        assert_eq!(rng.pick(1), 0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let picks_a: Vec<usize> = (0..32).map(|_| a.pick(10)).collect();
        let picks_b: Vec<usize> = (0..32).map(|_| b.pick(10)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRandom::new(1);
        let mut b = SeededRandom::new(2);
        let picks_a: Vec<usize> = (0..32).map(|_| a.pick(1000)).collect();
        let picks_b: Vec<usize> = (0..32).map(|_| b.pick(1000)).collect();
        assert_ne!(picks_a, picks_b);
    }
}
