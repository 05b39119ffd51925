use std::num::NonZeroUsize;

use log::{debug, info};
use rand::Rng;

use super::{EarlyStopping, Trainer, TrainingReport, Verdict};
use crate::{
    Result,
    arch::{LayerParams, Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself and its parameters.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    params: Vec<f64>,
    grad: Vec<f64>,
    optimizer: O,
    dataset: Dataset,
    loss_fn: L,

    max_epochs: usize,
    batch_size: NonZeroUsize,
    early_stopping: EarlyStopping,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `params` - The initial parameters of the model.
    /// * `optimizer` - The optimizer used after every batch.
    /// * `dataset` - The dataset the model will be trained with.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `max_epochs` - The most epochs a `train` call runs.
    /// * `batch_size` - The amount of samples per batch.
    /// * `early_stopping` - Decides when to stop before `max_epochs`.
    /// * `rng` - A random number generator, used for shuffling the dataset every epoch.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: M,
        params: Vec<f64>,
        optimizer: O,
        dataset: Dataset,
        loss_fn: L,
        max_epochs: usize,
        batch_size: NonZeroUsize,
        early_stopping: EarlyStopping,
        rng: R,
    ) -> Self {
        Self {
            grad: vec![0.; params.len()],
            model,
            params,
            optimizer,
            dataset,
            loss_fn,
            max_epochs,
            batch_size,
            early_stopping,
            rng,
        }
    }

    /// Trains the model for at most `max_epochs` epochs.
    ///
    /// Every epoch shuffles the dataset and runs over all of its batches. If early stopping
    /// triggers, the parameters of the best epoch are restored, otherwise the ones of the last
    /// epoch are kept.
    pub fn train(&mut self) -> Result<TrainingReport> {
        let log_every = self.max_epochs / 10 + 1;
        let mut losses = Vec::with_capacity(self.max_epochs);
        let mut stopped_early = false;

        for epoch in 0..self.max_epochs {
            self.dataset.shuffle(&mut self.rng);
            let batches = self.dataset.batches(self.batch_size);

            let loss = self.model.backprop(
                &mut self.params,
                &mut self.grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            losses.push(loss);

            if epoch % log_every == 0 {
                info!(epoch = epoch, loss = loss; "training");
            }

            if self.early_stopping.update(epoch, loss, &self.params) == Verdict::Stop {
                self.early_stopping.restore(&mut self.params);
                stopped_early = true;
                debug!(epoch = epoch; "early stopping");
                break;
            }
        }

        let (best_epoch, best_loss) = self.early_stopping.best().unwrap_or((0, f64::NAN));
        if stopped_early {
            info!(
                epochs = losses.len(), best_epoch = best_epoch, best_loss = best_loss;
                "stopped early, restored the best epoch"
            );
        }

        Ok(TrainingReport {
            losses,
            best_epoch,
            best_loss,
            stopped_early,
        })
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }
}

impl<M, O, L, R> Trainer for ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    fn train(&mut self) -> Result<TrainingReport> {
        self.train()
    }

    fn params(&self) -> &[f64] {
        self.params()
    }

    fn layers(&self) -> Result<Vec<LayerParams>> {
        self.model.layers(&self.params)
    }
}
