//! Synthetic regression tasks.
//!
//! A task carries the ground-truth function for one batch: it labels the
//! sampled inputs and supplies the training loss and the per-position
//! metric used for logging.

use crate::data::BatchSeeds;
use ndarray::{Array2, Array3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Scalar training loss over a full batch of predictions.
pub type LossFn = Box<dyn Fn(&Array2<f32>, &Array2<f32>) -> f64 + Send>;

/// Elementwise metric, `[batch, n_points]` in and out.
pub type PointwiseFn = Box<dyn Fn(&Array2<f32>, &Array2<f32>) -> Array2<f32> + Send>;

pub trait Task: Send {
    /// Label the inputs: `[batch, n_points, n_dims]` to `[batch, n_points]`.
    fn evaluate(&self, xs: &Array3<f32>) -> Array2<f32>;

    fn training_metric(&self) -> LossFn;

    fn metric(&self) -> PointwiseFn;
}

pub trait TaskSampler: Send {
    fn sample(&self, batch: usize, seeds: &BatchSeeds) -> Box<dyn Task>;
}

pub fn mean_squared_error(output: &Array2<f32>, targets: &Array2<f32>) -> f64 {
    let n = output.len().max(1) as f64;
    output
        .iter()
        .zip(targets.iter())
        .map(|(o, t)| {
            let d = (o - t) as f64;
            d * d
        })
        .sum::<f64>()
        / n
}

pub fn squared_error(output: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
    let mut out = output - targets;
    out.mapv_inplace(|d| d * d);
    out
}

/// `ys = xs . w`, one weight vector per batch row.
pub struct LinearRegressionTask {
    ws: Array2<f32>,
}

impl Task for LinearRegressionTask {
    fn evaluate(&self, xs: &Array3<f32>) -> Array2<f32> {
        let (batch, n_points, n_dims) = xs.dim();
        debug_assert_eq!(self.ws.shape(), &[batch, n_dims]);
        let mut ys = Array2::zeros((batch, n_points));
        for b in 0..batch {
            for p in 0..n_points {
                let mut acc = 0.0f32;
                for d in 0..n_dims {
                    acc += xs[[b, p, d]] * self.ws[[b, d]];
                }
                ys[[b, p]] = acc;
            }
        }
        ys
    }

    fn training_metric(&self) -> LossFn {
        Box::new(|output, targets| mean_squared_error(output, targets))
    }

    fn metric(&self) -> PointwiseFn {
        Box::new(|output, targets| squared_error(output, targets))
    }
}

/// Samples linear regression tasks with standard-normal weight vectors.
///
/// Weights span the full `n_dims`; curriculum truncation acts through the
/// zeroed input dimensions, not through the task.
#[derive(Debug, Clone)]
pub struct LinearRegressionSampler {
    n_dims: usize,
}

impl LinearRegressionSampler {
    pub fn new(n_dims: usize) -> Self {
        Self { n_dims }
    }
}

impl TaskSampler for LinearRegressionSampler {
    fn sample(&self, batch: usize, seeds: &BatchSeeds) -> Box<dyn Task> {
        let mut ws = Array2::zeros((batch, self.n_dims));
        match seeds {
            BatchSeeds::PerExample(list) => {
                debug_assert_eq!(list.len(), batch);
                for (row, seed) in list.iter().enumerate().take(batch) {
                    let mut rng = StdRng::seed_from_u64(*seed);
                    for d in 0..self.n_dims {
                        ws[[row, d]] = StandardNormal.sample(&mut rng);
                    }
                }
            }
            BatchSeeds::Step(seed) => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for row in 0..batch {
                    for d in 0..self.n_dims {
                        ws[[row, d]] = StandardNormal.sample(&mut rng);
                    }
                }
            }
        }
        Box::new(LinearRegressionTask { ws })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_linear_task_labels_inputs() {
        let ws = arr2(&[[1.0f32, 2.0]]);
        let task = LinearRegressionTask { ws };
        let mut xs = Array3::zeros((1, 2, 2));
        xs[[0, 0, 0]] = 3.0;
        xs[[0, 0, 1]] = 0.5;
        xs[[0, 1, 0]] = -1.0;

        let ys = task.evaluate(&xs);
        assert_eq!(ys[[0, 0]], 4.0);
        assert_eq!(ys[[0, 1]], -1.0);
    }

    #[test]
    fn test_mse_zero_for_identical() {
        let a = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
        assert_eq!(mean_squared_error(&a, &a), 0.0);
        assert!(squared_error(&a, &a).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mse_matches_hand_computation() {
        let a = arr2(&[[0.0f32, 0.0]]);
        let b = arr2(&[[1.0f32, 3.0]]);
        assert_eq!(mean_squared_error(&a, &b), (1.0 + 9.0) / 2.0);
    }

    #[test]
    fn test_sampler_is_seed_deterministic() {
        use crate::data::{DataSampler, GaussianSampler};

        let sampler = LinearRegressionSampler::new(4);
        let xs = GaussianSampler::new(4).sample_xs(3, 2, 4, &BatchSeeds::Step(1));

        let seeds = BatchSeeds::Step(77);
        let ya = sampler.sample(2, &seeds).evaluate(&xs);
        let yb = sampler.sample(2, &seeds).evaluate(&xs);
        assert_eq!(ya, yb);

        let yc = sampler.sample(2, &BatchSeeds::Step(78)).evaluate(&xs);
        assert_ne!(ya, yc);
    }
}
