use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::{MlErr, Result};

/// Adam optimization algorithm.
///
/// Keeps running estimates of the first and second moments of every parameter's gradient and
/// takes bias corrected steps from them.
#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,

    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

/// The hyperparameters of `Adam`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamParams {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl Adam {
    /// Returns a new `Adam` for `size` parameters.
    pub fn new(size: usize, params: AdamParams) -> Self {
        let AdamParams {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = params;

        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: vec![0.; size],
            v: vec![0.; size],
            t: 0,
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f64], grad: &[f64]) -> Result<()> {
        let size = self.m.len();
        if params.len() != size || grad.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "adam state",
                got: params.len().max(grad.len()),
                expected: size,
            });
        }

        self.t = self.t.saturating_add(1);
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        let lr_t = lr * (1. - b2.powi(self.t)).sqrt() / (1. - b1.powi(self.t));

        params
            .par_iter_mut()
            .zip(grad)
            .zip(self.m.par_iter_mut())
            .zip(self.v.par_iter_mut())
            .for_each(|(((w, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;
                *w -= lr_t * *m / (v.sqrt() + eps);
            });

        Ok(())
    }
}
