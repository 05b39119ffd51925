use ndarray::{Array2, ArrayView2};

use crate::{
    Result,
    arch::{LayerParams, Model, Sequential, activations::ActFn, check_chain, layers::Layer},
};

/// A network ready for inference: logistic hidden layers and a linear terminal layer.
#[derive(Clone, Debug)]
pub struct TrainedModel {
    model: Sequential,
    params: Vec<f64>,
}

impl TrainedModel {
    /// Rebuilds a network from its layers, input side first.
    ///
    /// # Returns
    /// An error if the layers don't chain.
    pub fn from_layers(layers: &[LayerParams]) -> Result<Self> {
        check_chain(layers)?;

        let last = layers.len() - 1;
        let model = Sequential::new(layers.iter().enumerate().map(|(i, layer)| {
            let act_fn = (i != last).then(|| ActFn::sigmoid(1.));
            Layer::dense(layer.dim(), act_fn)
        }));

        let mut params = Vec::with_capacity(model.size());
        for layer in layers {
            layer.flatten_into(&mut params);
        }

        Ok(Self { model, params })
    }

    pub fn layers(&self) -> Result<Vec<LayerParams>> {
        self.model.layers(&self.params)
    }

    /// Returns the amount of trainable parameters.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    pub fn input_size(&self) -> usize {
        self.model.layers_iter().next().map_or(0, |l| l.dim().0)
    }

    pub fn output_size(&self) -> usize {
        self.model.layers_iter().last().map_or(0, |l| l.dim().1)
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.model.predict(&self.params, x)
    }
}
