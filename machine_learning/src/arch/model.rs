use ndarray::{Array2, ArrayView2};

use super::{LayerParams, loss::LossFn};
use crate::{Result, optimization::Optimizer};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Computes the output of the model for `x` without touching its state.
    fn predict(&self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Computes the gradient of the loss function with respect to the parameters of the model over
    /// the provided batches. **`params` gets updated** for each batch according to the
    /// optimization algorithm.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer for writing the computed gradient on each batch pass.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the weights on each gradient calculation.
    /// * `batches` - The batches of data.
    ///
    /// # Returns
    /// The epoch loss.
    fn backprop<'a, L, O, I>(
        &mut self,
        params: &mut [f64],
        grad: &mut [f64],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<f64>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (ArrayView2<'a, f64>, ArrayView2<'a, f64>)>;

    /// Splits the flat parameter buffer into per layer weights and biases, input layer first.
    fn layers(&self, params: &[f64]) -> Result<Vec<LayerParams>>;
}
