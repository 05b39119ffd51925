mod builder;
mod early_stopping;
mod model_trainer;
mod spec;
mod trained;
mod trainer;

pub use builder::TrainerBuilder;
pub use early_stopping::{EarlyStopping, Verdict};
pub use model_trainer::ModelTrainer;
pub use spec::{EarlyStoppingSpec, OptimizerSpec, TrainerSpec};
pub use trained::TrainedModel;
pub use trainer::{Trainer, TrainingReport};

use crate::{Result, dataset::Dataset};

/// Builds a trainer for `spec`, runs it over `dataset` and returns the resulting network.
pub fn fit(spec: &TrainerSpec, dataset: Dataset) -> Result<(TrainedModel, TrainingReport)> {
    let mut trainer = TrainerBuilder::new().build(spec, dataset)?;
    let report = trainer.train()?;
    let model = TrainedModel::from_layers(&trainer.layers()?)?;
    Ok((model, report))
}
