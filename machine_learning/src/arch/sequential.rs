use ndarray::{Array1, Array2, ArrayView2};

use super::{LayerParams, Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers_iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Makes a forward pass through the network, keeping what `backprop` needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_size("model parameters", params.len())?;

        let mut out: Option<Array2<f64>> = None;
        let mut rest = params;

        for layer in self.layers.iter_mut() {
            let (layer_params, tail) = rest.split_at(layer.size());
            let input = out.as_ref().map_or(x, |a| a.view());
            let next = layer.forward(layer_params, input)?;
            out = Some(next);
            rest = tail;
        }

        Ok(out.unwrap_or_else(|| x.to_owned()))
    }

    fn check_size(&self, what: &'static str, len: usize) -> Result<()> {
        let expected = self.size();
        if len != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got: len,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn predict(&self, params: &[f64], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_size("model parameters", params.len())?;

        let mut out: Option<Array2<f64>> = None;
        let mut rest = params;

        for layer in self.layers.iter() {
            let (layer_params, tail) = rest.split_at(layer.size());
            let input = out.as_ref().map_or(x, |a| a.view());
            let next = layer.predict(layer_params, input)?;
            out = Some(next);
            rest = tail;
        }

        Ok(out.unwrap_or_else(|| x.to_owned()))
    }

    // NOTE: since getting the actual loss would require forwarding over all batches again at
    // the end of the epoch, it is approximated by averaging the loss of each batch.
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
        I: Iterator<Item = (ArrayView2<'a, f64>, ArrayView2<'a, f64>)>,
    {
        self.check_size("model gradient", grad.len())?;

        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            let y_pred = self.forward(params, x)?;
            if y_pred.dim() != y.dim() {
                return Err(MlErr::SizeMismatch {
                    what: "batch targets",
                    got: y.len(),
                    expected: y_pred.len(),
                });
            }

            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let mut d = loss_fn.loss_prime(y_pred.view(), y);
            let mut end = params.len();

            for layer in self.layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(params, grad)?;
        }

        if num_batches == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(total_loss / num_batches as f64)
    }

    fn layers(&self, params: &[f64]) -> Result<Vec<LayerParams>> {
        self.check_size("model parameters", params.len())?;

        let mut rest = params;
        let mut layers = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let (n, m) = layer.dim();
            let (layer_params, tail) = rest.split_at(layer.size());
            let (w, b) = layer_params.split_at(n * m);

            let weights = Array2::from_shape_vec((n, m), w.to_vec()).map_err(|_| {
                MlErr::SizeMismatch {
                    what: "layer weights",
                    got: w.len(),
                    expected: n * m,
                }
            })?;

            layers.push(LayerParams::new(weights, Array1::from(b.to_vec()))?);
            rest = tail;
        }

        Ok(layers)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{arch::activations::ActFn, arch::loss::Mse, optimization::GradientDescent};

    fn model() -> Sequential {
        Sequential::new([
            Layer::dense((2, 3), Some(ActFn::sigmoid(1.))),
            Layer::dense((3, 1), None),
        ])
    }

    #[test]
    fn size_adds_up_layers() {
        assert_eq!(model().size(), 3 * 3 + 4);
    }

    #[test]
    fn layers_follow_the_flat_layout() {
        let model = model();
        let params: Vec<f64> = (0..model.size()).map(|i| i as f64).collect();

        let layers = model.layers(&params).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].weights, array![[0., 1., 2.], [3., 4., 5.]]);
        assert_eq!(layers[0].biases, array![6., 7., 8.]);
        assert_eq!(layers[1].weights, array![[9.], [10.], [11.]]);
        assert_eq!(layers[1].biases, array![12.]);
    }

    #[test]
    fn backprop_without_batches_is_an_error() {
        let mut model = model();
        let mut params = vec![0.; model.size()];
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.1);

        let res = model.backprop(
            &mut params,
            &mut grad,
            &Mse,
            &mut optimizer,
            std::iter::empty(),
        );
        assert!(matches!(res, Err(MlErr::EmptyDataset)));
    }

    #[test]
    fn backprop_lowers_the_loss() {
        let mut model = model();
        let mut params: Vec<f64> = (0..model.size()).map(|i| (i as f64 - 6.) / 10.).collect();
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.5);

        let x = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]];
        let y = array![[0.], [1.], [1.], [2.]];

        let mut epoch = || {
            let batches = [(x.view(), y.view())].into_iter();
            model
                .backprop(&mut params, &mut grad, &Mse, &mut optimizer, batches)
                .unwrap()
        };

        let first = epoch();
        let mut last = first;
        for _ in 0..200 {
            last = epoch();
        }

        assert!(last < first / 10., "{first} -> {last}");
    }
}
