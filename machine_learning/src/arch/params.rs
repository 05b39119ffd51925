use ndarray::{Array1, Array2};

use crate::{MlErr, Result};

/// The weights and biases of a single dense layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerParams {
    /// `inputs x outputs`.
    pub weights: Array2<f64>,
    /// One per output.
    pub biases: Array1<f64>,
}

impl LayerParams {
    /// Creates a new `LayerParams`, failing if the biases don't match the weights' outputs.
    pub fn new(weights: Array2<f64>, biases: Array1<f64>) -> Result<Self> {
        let layer = Self { weights, biases };
        layer.check(0)?;
        Ok(layer)
    }

    /// Returns the amount of inputs and outputs of the layer.
    pub fn dim(&self) -> (usize, usize) {
        self.weights.dim()
    }

    /// Returns the amount of scalars of the layer.
    pub fn size(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Appends the layer to a flat parameter buffer, weights first.
    pub fn flatten_into(&self, buf: &mut Vec<f64>) {
        buf.extend(self.weights.iter());
        buf.extend(self.biases.iter());
    }

    fn check(&self, layer: usize) -> Result<()> {
        let outputs = self.weights.ncols();
        if self.biases.len() != outputs {
            return Err(MlErr::BrokenChain {
                layer,
                what: "bias length",
                got: self.biases.len(),
                expected: outputs,
            });
        }

        Ok(())
    }
}

/// Checks that `layers` make a valid network: every bias matches its weights and every layer
/// takes as many inputs as the previous one outputs.
pub fn check_chain(layers: &[LayerParams]) -> Result<()> {
    if layers.is_empty() {
        return Err(MlErr::BrokenChain {
            layer: 0,
            what: "layer count",
            got: 0,
            expected: 1,
        });
    }

    for (i, layer) in layers.iter().enumerate() {
        layer.check(i)?;
    }

    for (i, pair) in layers.windows(2).enumerate() {
        let outputs = pair[0].weights.ncols();
        let inputs = pair[1].weights.nrows();

        if inputs != outputs {
            return Err(MlErr::BrokenChain {
                layer: i + 1,
                what: "input width",
                got: inputs,
                expected: outputs,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use super::*;

    fn layer(n: usize, m: usize) -> LayerParams {
        LayerParams::new(Array2::zeros((n, m)), Array1::zeros(m)).unwrap()
    }

    #[test]
    fn valid_chain() {
        check_chain(&[layer(3, 4), layer(4, 5)]).unwrap();
    }

    #[test]
    fn mismatched_widths_point_at_the_consumer() {
        let err = check_chain(&[layer(3, 4), layer(5, 2)]).unwrap_err();
        assert!(matches!(
            err,
            MlErr::BrokenChain { layer: 1, what: "input width", got: 5, expected: 4 }
        ));
    }

    #[test]
    fn bias_must_match_outputs() {
        let err = LayerParams::new(Array2::zeros((2, 3)), Array1::zeros(2)).unwrap_err();
        assert!(matches!(err, MlErr::BrokenChain { what: "bias length", .. }));

        let bad = LayerParams {
            weights: Array2::zeros((4, 2)),
            biases: Array1::zeros(3),
        };
        let err = check_chain(&[layer(3, 4), bad]).unwrap_err();
        assert!(matches!(err, MlErr::BrokenChain { layer: 1, what: "bias length", .. }));
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(check_chain(&[]).is_err());
    }

    #[test]
    fn flattening_puts_weights_before_biases() {
        let layer = LayerParams::new(
            Array2::from_shape_vec((2, 2), vec![1., 2., 3., 4.]).unwrap(),
            Array1::from(vec![5., 6.]),
        )
        .unwrap();

        let mut buf = vec![0.];
        layer.flatten_into(&mut buf);
        assert_eq!(buf, [0., 1., 2., 3., 4., 5., 6.]);
    }
}
