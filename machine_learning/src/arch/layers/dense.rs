use ndarray::{Zip, linalg, prelude::*};

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer.
///
/// The layer does not own its parameters, it views a slice of `(n + 1) * m` scalars holding the
/// `n x m` row major weight matrix followed by the `m` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f64>,
    z: Array2<f64>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - The activation applied to the outputs, `None` for a linear layer.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: Array2::zeros((0, dim.0)),
            z: Array2::zeros((0, dim.1)),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act_fn(&self) -> Option<&ActFn> {
        self.act_fn.as_ref()
    }

    /// Makes a forward pass keeping what `backward` needs.
    pub fn forward(&mut self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let z = self.weighted_sum(params, x)?;
        let a = self.activate(z.clone());

        self.x = x.to_owned();
        self.z = z;
        Ok(a)
    }

    /// Makes a forward pass without touching the layer's state.
    pub fn predict(&self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let z = self.weighted_sum(params, x)?;
        Ok(self.activate(z))
    }

    /// Writes this layer's gradient into `grad` given the delta of its outputs.
    ///
    /// # Returns
    /// The delta of this layer's inputs.
    pub fn backward(
        &mut self,
        params: &[f64],
        grad: &mut [f64],
        mut d: Array2<f64>,
    ) -> Result<Array2<f64>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "layer delta",
                got: d.len(),
                expected: self.z.len(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            Zip::from(&mut d)
                .and(&self.z)
                .par_for_each(|d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    fn weighted_sum(&self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "layer input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = x.dot(&w);
        z += &b;
        Ok(z)
    }

    fn activate(&self, mut z: Array2<f64>) -> Array2<f64> {
        if let Some(act_fn) = &self.act_fn {
            z.par_mapv_inplace(|z| act_fn.f(z));
        }

        z
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f64],
    ) -> Result<(ArrayViewMut2<'a, f64>, ArrayViewMut1<'a, f64>)> {
        let w_size = self.check_len("layer gradient", grad.len())?;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.mismatch(w_size))?;
        let db = ArrayViewMut1::from(db_raw);
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f64]) -> Result<(ArrayView2<'a, f64>, ArrayView1<'a, f64>)> {
        let w_size = self.check_len("layer parameters", params.len())?;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.mismatch(w_size))?;
        let biases = ArrayView1::from(b_raw);
        Ok((weights, biases))
    }

    /// Checks that a slice has exactly this layer's size.
    ///
    /// # Returns
    /// The amount of weights at the start of the slice.
    fn check_len(&self, what: &'static str, len: usize) -> Result<usize> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got: len,
                expected: self.size,
            });
        }

        Ok(self.size - self.dim.1)
    }

    fn mismatch(&self, got: usize) -> MlErr {
        MlErr::SizeMismatch {
            what: "layer weights",
            got,
            expected: self.dim.0 * self.dim.1,
        }
    }
}
