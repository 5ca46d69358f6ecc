//! Model collaborators.
//!
//! The trait is the seam the training loop sees: forward, closed-form
//! gradients of the squared-error training loss, and a serializable
//! parameter snapshot. Two reference families are provided, dispatched by
//! configuration the way `build_model` does it upstream.

use crate::config::{ModelConfig, ModelFamily};
use crate::error::{TrainError, TrainResult};
use ndarray::{Array2, Array3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Serializable parameter snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub family: String,
    pub n_dims: usize,
    pub params: Vec<f32>,
}

pub trait Model: Send {
    /// Expected input dimensionality.
    fn n_dims(&self) -> usize;

    /// Predict one value per sequence position. `ys` carries the in-context
    /// targets for families that condition on them; the reference families
    /// predict from the current input alone.
    fn forward(&self, xs: &Array3<f32>, ys: &Array2<f32>) -> Array2<f32>;

    /// Gradient of the mean squared training loss with respect to `params`.
    fn backward(&self, xs: &Array3<f32>, ys: &Array2<f32>, output: &Array2<f32>) -> Vec<f32>;

    fn params(&self) -> &[f32];

    fn params_mut(&mut self) -> &mut [f32];

    fn state_dict(&self) -> ModelState;

    fn load_state_dict(&mut self, state: &ModelState) -> TrainResult<()>;
}

/// Build the configured model family with seeded deterministic init.
pub fn build_model(config: &ModelConfig, seed: u64) -> Box<dyn Model> {
    match config.family {
        ModelFamily::Linear => Box::new(LinearModel::new(config.n_dims, seed)),
        ModelFamily::Mlp => Box::new(MlpModel::new(config.n_dims, config.hidden_size, seed)),
    }
}

const INIT_SCALE: f32 = 0.02;

fn init_params(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let v: f32 = StandardNormal.sample(&mut rng);
            v * INIT_SCALE
        })
        .collect()
}

fn check_state(state: &ModelState, family: &str, n_dims: usize, n_params: usize) -> TrainResult<()> {
    if state.family != family {
        return Err(TrainError::config(format!(
            "model state family mismatch: checkpoint has '{}', model is '{family}'",
            state.family
        )));
    }
    if state.n_dims != n_dims || state.params.len() != n_params {
        return Err(TrainError::config(format!(
            "model state shape mismatch: checkpoint {}x{}, model {n_dims}x{n_params}",
            state.n_dims,
            state.params.len()
        )));
    }
    Ok(())
}

/// `out[b, p] = w . xs[b, p, :]`.
pub struct LinearModel {
    n_dims: usize,
    params: Vec<f32>,
}

impl LinearModel {
    pub fn new(n_dims: usize, seed: u64) -> Self {
        Self {
            n_dims,
            params: init_params(n_dims, seed),
        }
    }
}

impl Model for LinearModel {
    fn n_dims(&self) -> usize {
        self.n_dims
    }

    fn forward(&self, xs: &Array3<f32>, _ys: &Array2<f32>) -> Array2<f32> {
        let (batch, n_points, n_dims) = xs.dim();
        let mut out = Array2::zeros((batch, n_points));
        for b in 0..batch {
            for p in 0..n_points {
                let mut acc = 0.0f32;
                for d in 0..n_dims {
                    acc += self.params[d] * xs[[b, p, d]];
                }
                out[[b, p]] = acc;
            }
        }
        out
    }

    fn backward(&self, xs: &Array3<f32>, ys: &Array2<f32>, output: &Array2<f32>) -> Vec<f32> {
        let (batch, n_points, n_dims) = xs.dim();
        let scale = 2.0 / (batch * n_points) as f32;
        let mut grads = vec![0.0f32; n_dims];
        for b in 0..batch {
            for p in 0..n_points {
                let residual = scale * (output[[b, p]] - ys[[b, p]]);
                for d in 0..n_dims {
                    grads[d] += residual * xs[[b, p, d]];
                }
            }
        }
        grads
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn state_dict(&self) -> ModelState {
        ModelState {
            family: "linear".into(),
            n_dims: self.n_dims,
            params: self.params.clone(),
        }
    }

    fn load_state_dict(&mut self, state: &ModelState) -> TrainResult<()> {
        check_state(state, "linear", self.n_dims, self.params.len())?;
        self.params.copy_from_slice(&state.params);
        Ok(())
    }
}

/// One-hidden-layer relu MLP applied per position.
///
/// Flat parameter layout: `[w1 (hidden * n_dims), b1 (hidden), w2 (hidden), b2 (1)]`.
pub struct MlpModel {
    n_dims: usize,
    hidden: usize,
    params: Vec<f32>,
}

impl MlpModel {
    pub fn new(n_dims: usize, hidden: usize, seed: u64) -> Self {
        Self {
            n_dims,
            hidden,
            params: init_params(hidden * n_dims + hidden + hidden + 1, seed),
        }
    }

    fn split(&self) -> (&[f32], &[f32], &[f32], f32) {
        let (w1, rest) = self.params.split_at(self.hidden * self.n_dims);
        let (b1, rest) = rest.split_at(self.hidden);
        let (w2, b2) = rest.split_at(self.hidden);
        (w1, b1, w2, b2[0])
    }

    /// Hidden pre-activations for one position.
    fn pre_activations(&self, xs: &Array3<f32>, b: usize, p: usize) -> Vec<f32> {
        let (w1, b1, _, _) = self.split();
        let mut pre = vec![0.0f32; self.hidden];
        for (j, pre_j) in pre.iter_mut().enumerate() {
            let mut acc = b1[j];
            let row = &w1[j * self.n_dims..(j + 1) * self.n_dims];
            for d in 0..self.n_dims {
                acc += row[d] * xs[[b, p, d]];
            }
            *pre_j = acc;
        }
        pre
    }
}

impl Model for MlpModel {
    fn n_dims(&self) -> usize {
        self.n_dims
    }

    fn forward(&self, xs: &Array3<f32>, _ys: &Array2<f32>) -> Array2<f32> {
        let (batch, n_points, _) = xs.dim();
        let (_, _, w2, b2) = self.split();
        let mut out = Array2::zeros((batch, n_points));
        for b in 0..batch {
            for p in 0..n_points {
                let pre = self.pre_activations(xs, b, p);
                let mut acc = b2;
                for j in 0..self.hidden {
                    acc += w2[j] * pre[j].max(0.0);
                }
                out[[b, p]] = acc;
            }
        }
        out
    }

    fn backward(&self, xs: &Array3<f32>, ys: &Array2<f32>, output: &Array2<f32>) -> Vec<f32> {
        let (batch, n_points, n_dims) = xs.dim();
        let (_, _, w2, _) = self.split();
        let scale = 2.0 / (batch * n_points) as f32;

        let w1_len = self.hidden * n_dims;
        let mut grads = vec![0.0f32; self.params.len()];
        let b1_off = w1_len;
        let w2_off = w1_len + self.hidden;
        let b2_off = w2_off + self.hidden;

        for b in 0..batch {
            for p in 0..n_points {
                let d_out = scale * (output[[b, p]] - ys[[b, p]]);
                let pre = self.pre_activations(xs, b, p);
                grads[b2_off] += d_out;
                for j in 0..self.hidden {
                    let h = pre[j].max(0.0);
                    grads[w2_off + j] += d_out * h;
                    if pre[j] > 0.0 {
                        let d_pre = d_out * w2[j];
                        grads[b1_off + j] += d_pre;
                        for d in 0..n_dims {
                            grads[j * n_dims + d] += d_pre * xs[[b, p, d]];
                        }
                    }
                }
            }
        }
        grads
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn state_dict(&self) -> ModelState {
        ModelState {
            family: "mlp".into(),
            n_dims: self.n_dims,
            params: self.params.clone(),
        }
    }

    fn load_state_dict(&mut self, state: &ModelState) -> TrainResult<()> {
        check_state(state, "mlp", self.n_dims, self.params.len())?;
        self.params.copy_from_slice(&state.params);
        Ok(())
    }
}
