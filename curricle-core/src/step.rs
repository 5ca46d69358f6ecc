//! Single optimization step execution.

use crate::error::{TrainError, TrainResult};
use crate::model::Model;
use crate::optim::Optimizer;
use crate::task::LossFn;
use ndarray::{Array2, Array3};

#[derive(Debug)]
pub struct StepOutcome {
    pub loss: f64,
    /// Detached predictions for downstream metric computation.
    pub output: Array2<f32>,
}

/// Run one optimization step: clear gradients, forward, loss, backward,
/// update. Model parameters and optimizer state mutate exactly once.
///
/// A non-finite loss is fatal and is surfaced before any parameter update,
/// so the last saved checkpoint always holds finite, fully-trained weights.
pub fn run_step(
    model: &mut dyn Model,
    optimizer: &mut dyn Optimizer,
    xs: &Array3<f32>,
    ys: &Array2<f32>,
    loss_fn: &LossFn,
    step: u64,
) -> TrainResult<StepOutcome> {
    optimizer.zero_grad();
    let output = model.forward(xs, ys);
    let loss = loss_fn(&output, ys);
    if !loss.is_finite() {
        return Err(TrainError::NonFiniteLoss { step, loss });
    }
    let grads = model.backward(xs, ys, &output);
    optimizer.push_grads(&grads);
    optimizer.step(model.params_mut());
    Ok(StepOutcome { loss, output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;
    use crate::optim::Adam;
    use crate::task::mean_squared_error;

    fn fixtures() -> (Array3<f32>, Array2<f32>) {
        let mut xs = Array3::zeros((1, 2, 2));
        xs[[0, 0, 0]] = 1.0;
        xs[[0, 1, 1]] = -1.0;
        let mut ys = Array2::zeros((1, 2));
        ys[[0, 0]] = 2.0;
        ys[[0, 1]] = 1.0;
        (xs, ys)
    }

    #[test]
    fn test_run_step_reduces_loss() {
        let mut model = LinearModel::new(2, 3);
        let mut adam = Adam::new(model.params().len(), 0.05);
        let (xs, ys) = fixtures();
        let loss_fn: LossFn = Box::new(|o, t| mean_squared_error(o, t));

        let mut last = f64::MAX;
        for step in 0..50 {
            let outcome = run_step(&mut model, &mut adam, &xs, &ys, &loss_fn, step).unwrap();
            last = outcome.loss;
        }
        let first = {
            let fresh = LinearModel::new(2, 3);
            mean_squared_error(&fresh.forward(&xs, &ys), &ys)
        };
        assert!(last < first, "loss {last} did not improve on {first}");
    }

    #[test]
    fn test_non_finite_loss_is_fatal() {
        let mut model = LinearModel::new(2, 3);
        let before = model.params().to_vec();
        let mut adam = Adam::new(before.len(), 0.05);
        let (xs, ys) = fixtures();
        let loss_fn: LossFn = Box::new(|_, _| f64::NAN);

        let err = run_step(&mut model, &mut adam, &xs, &ys, &loss_fn, 7).unwrap_err();
        assert!(matches!(err, TrainError::NonFiniteLoss { step: 7, .. }));
        // Surfaced before the update: parameters untouched.
        assert_eq!(model.params(), before.as_slice());
    }
}
