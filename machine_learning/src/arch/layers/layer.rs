use ndarray::{Array2, ArrayView2};

use super::Dense;
use crate::{Result, arch::activations::ActFn};

#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    /// Returns the amount of parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
        }
    }

    /// Returns the amount of inputs and outputs of this layer.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Dense(l) => l.dim(),
        }
    }

    pub fn act_fn(&self) -> Option<&ActFn> {
        match self {
            Dense(l) => l.act_fn(),
        }
    }

    pub fn forward(&mut self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            Dense(l) => l.forward(params, x),
        }
    }

    pub fn predict(&self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            Dense(l) => l.predict(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f64],
        grad: &mut [f64],
        d: Array2<f64>,
    ) -> Result<Array2<f64>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
        }
    }
}
