use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::{EarlyStopping, ModelTrainer, OptimizerSpec, Trainer, TrainerSpec};
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{LossFn, Mse, Objective},
    },
    dataset::Dataset,
    initialization::glorot_normal,
    optimization::{Adam, GradientDescent, Optimizer},
};

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    /// * `dataset` - The data to train on, it fixes the input and output widths of the network.
    ///
    /// # Returns
    /// An error if the spec is invalid or names an unsupported objective.
    pub fn build(&self, spec: &TrainerSpec, dataset: Dataset) -> Result<Box<dyn Trainer>> {
        self.validate(spec)?;
        let objective: Objective = spec.objective.parse()?;
        let mut rng = self.generate_rng(spec.seed);

        let dims = self.resolve_dims(spec, &dataset);
        let model = self.resolve_model(&dims);

        let mut params = Vec::with_capacity(model.size());
        for &dim in &dims {
            glorot_normal(dim, &mut rng)?.flatten_into(&mut params);
        }

        info!(
            params = params.len(), layers = dims.len();
            "built sequential model minimizing {objective}"
        );

        self.resolve_optimizer(spec, objective, model, params, dataset, rng)
    }

    fn validate(&self, spec: &TrainerSpec) -> Result<()> {
        if spec.max_epochs == 0 {
            return Err(MlErr::InvalidSpec("max_epochs must be positive".into()));
        }

        if let Some(i) = spec.hidden.iter().position(|&width| width == 0) {
            return Err(MlErr::InvalidSpec(format!("hidden layer {i} has no units")));
        }

        let min_delta = spec.early_stopping.min_delta;
        if min_delta.is_nan() || min_delta < 0. {
            return Err(MlErr::InvalidSpec(
                "min_delta must be a non negative number".into(),
            ));
        }

        Ok(())
    }

    /// The `(inputs, outputs)` of every layer, input side first.
    fn resolve_dims(&self, spec: &TrainerSpec, dataset: &Dataset) -> Vec<(usize, usize)> {
        let widths: Vec<usize> = std::iter::once(dataset.x_size())
            .chain(spec.hidden.iter().copied())
            .chain(std::iter::once(dataset.y_size()))
            .collect();

        widths.windows(2).map(|w| (w[0], w[1])).collect()
    }

    fn resolve_model(&self, dims: &[(usize, usize)]) -> Sequential {
        let last = dims.len() - 1;
        let layers = dims.iter().enumerate().map(|(i, &dim)| {
            let factory = |act_fn| Layer::dense(dim, act_fn);
            self.resolve_act_fn(i == last, factory)
        });

        Sequential::new(layers)
    }

    fn resolve_act_fn<F>(&self, terminal: bool, layer_factory: F) -> Layer
    where
        F: FnOnce(Option<ActFn>) -> Layer,
    {
        if terminal {
            return layer_factory(None);
        }

        layer_factory(Some(ActFn::sigmoid(1.)))
    }

    fn resolve_optimizer<M>(
        &self,
        spec: &TrainerSpec,
        objective: Objective,
        model: M,
        params: Vec<f64>,
        dataset: Dataset,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        match spec.optimizer {
            OptimizerSpec::Adam(adam_params) => {
                let optimizer = Adam::new(params.len(), adam_params);
                self.resolve_loss(spec, objective, model, params, optimizer, dataset, rng)
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                let optimizer = GradientDescent::new(learning_rate);
                self.resolve_loss(spec, objective, model, params, optimizer, dataset, rng)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_loss<M, O>(
        &self,
        spec: &TrainerSpec,
        objective: Objective,
        model: M,
        params: Vec<f64>,
        optimizer: O,
        dataset: Dataset,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        match objective {
            Objective::Mse => {
                let loss = Mse::new();
                Ok(self.terminate_build(spec, model, params, optimizer, loss, dataset, rng))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn terminate_build<M, O, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        params: Vec<f64>,
        optimizer: O,
        loss: L,
        dataset: Dataset,
        rng: StdRng,
    ) -> Box<dyn Trainer>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
        L: LossFn + 'static,
    {
        let early_stopping = EarlyStopping::new(spec.early_stopping);

        let trainer = ModelTrainer::new(
            model,
            params,
            optimizer,
            dataset,
            loss,
            spec.max_epochs,
            spec.batch_size,
            early_stopping,
            rng,
        );

        Box::new(trainer)
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
