//! Optimizer collaborators.

use crate::error::{TrainError, TrainResult};
use serde::{Deserialize, Serialize};

/// Serializable optimizer internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub t: u64,
    pub m: Vec<f32>,
    pub v: Vec<f32>,
}

pub trait Optimizer: Send {
    /// Clear accumulated gradients.
    fn zero_grad(&mut self);

    /// Accumulate a gradient contribution.
    fn push_grads(&mut self, grads: &[f32]);

    /// Apply one update to `params` from the accumulated gradients.
    fn step(&mut self, params: &mut [f32]);

    fn state_dict(&self) -> OptimizerState;

    fn load_state_dict(&mut self, state: &OptimizerState) -> TrainResult<()>;
}

/// Adam with bias-corrected first and second moments.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    t: u64,
    m: Vec<f32>,
    v: Vec<f32>,
    grads: Vec<f32>,
}

impl Adam {
    pub fn new(n_params: usize, lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            grads: vec![0.0; n_params],
        }
    }
}

impl Optimizer for Adam {
    fn zero_grad(&mut self) {
        self.grads.fill(0.0);
    }

    fn push_grads(&mut self, grads: &[f32]) {
        debug_assert_eq!(grads.len(), self.grads.len());
        for (acc, g) in self.grads.iter_mut().zip(grads) {
            *acc += g;
        }
    }

    fn step(&mut self, params: &mut [f32]) {
        debug_assert_eq!(params.len(), self.grads.len());
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t.min(i32::MAX as u64) as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t.min(i32::MAX as u64) as i32);
        for i in 0..params.len() {
            let g = self.grads[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }

    fn state_dict(&self) -> OptimizerState {
        OptimizerState {
            t: self.t,
            m: self.m.clone(),
            v: self.v.clone(),
        }
    }

    fn load_state_dict(&mut self, state: &OptimizerState) -> TrainResult<()> {
        if state.m.len() != self.m.len() || state.v.len() != self.v.len() {
            return Err(TrainError::config(format!(
                "optimizer state length mismatch: checkpoint {}/{}, optimizer {}",
                state.m.len(),
                state.v.len(),
                self.m.len()
            )));
        }
        self.t = state.t;
        self.m.copy_from_slice(&state.m);
        self.v.copy_from_slice(&state.v);
        Ok(())
    }
}
