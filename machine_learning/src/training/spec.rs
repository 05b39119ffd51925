use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::optimization::AdamParams;

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam(AdamParams),
    GradientDescent { learning_rate: f64 },
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self::Adam(AdamParams::default())
    }
}

/// The specification for `EarlyStopping`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStoppingSpec {
    /// The least a loss has to drop below the best one to count as an improvement.
    pub min_delta: f64,
    /// The amount of epochs without improvement tolerated before stopping.
    pub patience: usize,
}

impl Default for EarlyStoppingSpec {
    fn default() -> Self {
        Self {
            min_delta: 1e-6,
            patience: 50,
        }
    }
}

/// The specification for a `Trainer`.
///
/// The input and output widths of the network come from the dataset it is trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSpec {
    /// The widths of the hidden layers, input side first.
    pub hidden: Vec<usize>,
    pub objective: String,
    pub optimizer: OptimizerSpec,
    pub max_epochs: usize,
    pub batch_size: NonZeroUsize,
    pub early_stopping: EarlyStoppingSpec,
    pub seed: Option<u64>,
}

impl Default for TrainerSpec {
    fn default() -> Self {
        Self {
            hidden: vec![64, 256, 1024],
            objective: "mse".to_string(),
            optimizer: OptimizerSpec::default(),
            max_epochs: 1000,
            batch_size: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
            early_stopping: EarlyStoppingSpec::default(),
            seed: Some(20),
        }
    }
}
