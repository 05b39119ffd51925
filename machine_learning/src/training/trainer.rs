use crate::{Result, arch::LayerParams};

/// The outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// The loss of every epoch that ran, in order.
    pub losses: Vec<f64>,
    pub best_epoch: usize,
    pub best_loss: f64,
    pub stopped_early: bool,
}

impl TrainingReport {
    pub fn epochs(&self) -> usize {
        self.losses.len()
    }
}

pub trait Trainer {
    fn train(&mut self) -> Result<TrainingReport>;

    /// The flat parameters of the model being trained.
    fn params(&self) -> &[f64];

    fn layers(&self) -> Result<Vec<LayerParams>>;
}
