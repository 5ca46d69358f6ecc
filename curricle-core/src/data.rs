//! Synthetic input sampling.
//!
//! Samplers are pure functions of their seed material: the same seeds
//! always produce the same batch, which the resume protocol relies on.

use ndarray::Array3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Seed material for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSeeds {
    /// One seed per batch row, selected from a bounded training pool.
    PerExample(Vec<u64>),
    /// A single step-derived seed covering the whole batch.
    Step(u64),
}

impl BatchSeeds {
    /// Shift every seed by a fixed offset (task seeds vs data seeds).
    pub fn offset(&self, offset: u64) -> Self {
        match self {
            Self::PerExample(seeds) => {
                Self::PerExample(seeds.iter().map(|s| s.wrapping_add(offset)).collect())
            }
            Self::Step(seed) => Self::Step(seed.wrapping_add(offset)),
        }
    }
}

pub trait DataSampler: Send {
    /// Sample a `[batch, n_points, n_dims]` input tensor. Dimensions at and
    /// beyond `n_dims_truncated` are zero.
    fn sample_xs(
        &self,
        n_points: usize,
        batch: usize,
        n_dims_truncated: usize,
        seeds: &BatchSeeds,
    ) -> Array3<f32>;
}

/// Iid standard-normal inputs over the active dimensions.
#[derive(Debug, Clone)]
pub struct GaussianSampler {
    n_dims: usize,
}

impl GaussianSampler {
    pub fn new(n_dims: usize) -> Self {
        Self { n_dims }
    }

    fn fill_row(&self, xs: &mut Array3<f32>, row: usize, active_dims: usize, rng: &mut StdRng) {
        let n_points = xs.shape()[1];
        for p in 0..n_points {
            for d in 0..active_dims {
                xs[[row, p, d]] = StandardNormal.sample(rng);
            }
        }
    }
}

impl DataSampler for GaussianSampler {
    fn sample_xs(
        &self,
        n_points: usize,
        batch: usize,
        n_dims_truncated: usize,
        seeds: &BatchSeeds,
    ) -> Array3<f32> {
        let active = n_dims_truncated.min(self.n_dims);
        let mut xs = Array3::zeros((batch, n_points, self.n_dims));
        match seeds {
            BatchSeeds::PerExample(list) => {
                debug_assert_eq!(list.len(), batch);
                for (row, seed) in list.iter().enumerate().take(batch) {
                    let mut rng = StdRng::seed_from_u64(*seed);
                    self.fill_row(&mut xs, row, active, &mut rng);
                }
            }
            BatchSeeds::Step(seed) => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for row in 0..batch {
                    self.fill_row(&mut xs, row, active, &mut rng);
                }
            }
        }
        xs
    }
}
