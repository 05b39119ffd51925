use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// Two consecutive layers, or a layer's weights and biases, disagree on a dimension.
    BrokenChain {
        layer: usize,
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnsupportedObjective(String),
    EmptyDataset,
    InvalidSpec(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::BrokenChain {
                layer,
                what,
                got,
                expected,
            } => write!(
                f,
                "Layer {layer} breaks the layer chain, its {what} is {got} and should be {expected}"
            ),
            MlErr::UnsupportedObjective(name) => write!(
                f,
                "The objective function {name:?} does not exist, only \"mse\" is supported"
            ),
            MlErr::EmptyDataset => write!(f, "The dataset has no samples"),
            MlErr::InvalidSpec(msg) => write!(f, "Invalid trainer spec: {msg}"),
        }
    }
}

impl Error for MlErr {}
