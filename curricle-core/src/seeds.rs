//! Seed selection for reproducible example sampling.
//!
//! When the training set is bounded, each batch draws a set of distinct
//! example seeds from the pool without replacement. Task seeds are derived
//! from data seeds by a fixed offset so task identity stays correlated to,
//! but distinguishable from, data identity.

use crate::error::{TrainError, TrainResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Offset between an example's data seed and its task seed.
pub const TASK_SEED_OFFSET: u64 = 1;

/// Draws unique seeds from a bounded pool. The randomness source is
/// injected so callers (and tests) control reproducibility explicitly.
#[derive(Debug)]
pub struct SeedSampler<R: Rng> {
    rng: R,
}

impl SeedSampler<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> SeedSampler<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draw exactly `count` distinct integers uniformly from `[0, pool_size)`.
    ///
    /// Callers must not depend on the order of the returned seeds.
    pub fn sample(&mut self, pool_size: u64, count: usize) -> TrainResult<Vec<u64>> {
        if count as u64 > pool_size {
            return Err(TrainError::InvalidSampleRequest {
                requested: count,
                pool: pool_size,
            });
        }
        let mut seeds = BTreeSet::new();
        while seeds.len() < count {
            seeds.insert(self.rng.gen_range(0..pool_size));
        }
        Ok(seeds.into_iter().collect())
    }
}

/// Deterministic per-step seed, mixing the run seed with the step index
/// (splitmix64 finalizer). Every stochastic draw at step `i` is keyed by
/// this value so an interrupted run replays identical batches.
pub fn step_seed(run_seed: u64, step: u64) -> u64 {
    let mut z = run_seed ^ step.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_distinct_and_in_range() {
        let mut sampler = SeedSampler::seeded(7);
        let seeds = sampler.sample(100, 32).unwrap();

        assert_eq!(seeds.len(), 32);
        let unique: BTreeSet<_> = seeds.iter().copied().collect();
        assert_eq!(unique.len(), 32);
        assert!(seeds.iter().all(|&s| s < 100));
    }

    #[test]
    fn test_oversized_request_rejected() {
        let mut sampler = SeedSampler::seeded(7);
        let err = sampler.sample(100, 101).unwrap_err();
        assert!(matches!(
            err,
            TrainError::InvalidSampleRequest {
                requested: 101,
                pool: 100
            }
        ));
    }

    #[test]
    fn test_exhaustive_draw_allowed() {
        let mut sampler = SeedSampler::seeded(3);
        let seeds = sampler.sample(16, 16).unwrap();
        assert_eq!(seeds, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_draw() {
        let a = SeedSampler::seeded(99).sample(1000, 64).unwrap();
        let b = SeedSampler::seeded(99).sample(1000, 64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_seed_varies_by_step() {
        let s0 = step_seed(42, 0);
        let s1 = step_seed(42, 1);
        let s2 = step_seed(42, 2);
        assert_ne!(s0, s1);
        assert_ne!(s1, s2);
        assert_eq!(step_seed(42, 1), s1);
    }
}
