#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::{Array2, array};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    MlErr,
    arch::{
        Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{LossFn, Mse},
    },
    dataset::Dataset,
    initialization::glorot_normal,
    optimization::{AdamParams, GradientDescent},
    training::{
        self, EarlyStopping, EarlyStoppingSpec, ModelTrainer, OptimizerSpec, TrainerBuilder,
        TrainerSpec,
    },
};

/// 8 samples of `(x0, x1) -> (x0 + x1, x0 - x1)`.
fn sum_diff() -> Dataset {
    let x = Array2::from_shape_fn((8, 2), |(i, j)| match j {
        0 => (i / 2) as f64 / 3. - 1. / 3.,
        _ => (i % 2) as f64 / 3. - 1. / 3.,
    });
    let y = Array2::from_shape_fn((8, 2), |(i, j)| match j {
        0 => x[[i, 0]] + x[[i, 1]],
        _ => x[[i, 0]] - x[[i, 1]],
    });

    Dataset::new(x, y).unwrap()
}

fn small_spec() -> TrainerSpec {
    TrainerSpec {
        hidden: vec![8],
        optimizer: OptimizerSpec::Adam(AdamParams {
            learning_rate: 0.01,
            ..Default::default()
        }),
        max_epochs: 500,
        batch_size: NonZeroUsize::new(4).unwrap(),
        ..Default::default()
    }
}

#[test]
fn test_ml_sum_diff_convergence() {
    let dataset = sum_diff();
    let (x, y) = (dataset.x().to_owned(), dataset.y().to_owned());

    let (model, report) = training::fit(&small_spec(), dataset).unwrap();

    let first = report.losses[0];
    assert!(report.best_loss < first / 10., "{first} -> {}", report.best_loss);

    let y_pred = model.predict(x.view()).unwrap();
    let err = Mse.loss(y_pred.view(), y.view());
    assert!(err < first / 10., "{first} -> {err}");
}

#[test]
fn test_ml_same_seed_same_run() {
    let (a, ra) = training::fit(&small_spec(), sum_diff()).unwrap();
    let (b, rb) = training::fit(&small_spec(), sum_diff()).unwrap();

    assert_eq!(ra, rb);
    assert_eq!(a.layers().unwrap(), b.layers().unwrap());
}

#[test]
fn test_ml_early_stopping_without_progress() {
    let patience = 5;
    let spec = TrainerSpec {
        optimizer: OptimizerSpec::GradientDescent { learning_rate: 0. },
        max_epochs: 100,
        early_stopping: EarlyStoppingSpec {
            min_delta: 1e-6,
            patience,
        },
        ..small_spec()
    };

    let mut trainer = TrainerBuilder::new().build(&spec, sum_diff()).unwrap();
    let initial = trainer.params().to_vec();
    let report = trainer.train().unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.epochs(), patience + 1);
    assert_eq!(report.best_epoch, 0);
    assert_eq!(trainer.params(), initial.as_slice());
}

/// A trainer that climbs the loss: full batch gradient steps with a negative learning rate.
fn ascending_trainer(
    max_epochs: usize,
    patience: usize,
) -> ModelTrainer<Sequential, GradientDescent, Mse, StdRng> {
    let dims = [(2, 8), (8, 2)];
    let mut rng = StdRng::seed_from_u64(7);

    let mut params = Vec::new();
    for dim in dims {
        glorot_normal(dim, &mut rng).unwrap().flatten_into(&mut params);
    }

    let model = Sequential::new([
        Layer::dense(dims[0], Some(ActFn::sigmoid(1.))),
        Layer::dense(dims[1], None),
    ]);

    ModelTrainer::new(
        model,
        params,
        GradientDescent::new(-0.05),
        sum_diff(),
        Mse,
        max_epochs,
        NonZeroUsize::new(8).unwrap(),
        EarlyStopping::new(EarlyStoppingSpec {
            min_delta: 1e-6,
            patience,
        }),
        rng,
    )
}

#[test]
fn test_ml_early_stopping_rolls_back_to_the_best_epoch() {
    let patience = 4;

    let mut stopped = ascending_trainer(100, patience);
    let report = stopped.train().unwrap();
    assert!(report.stopped_early);
    assert_eq!(report.best_epoch, 0);
    assert_eq!(report.epochs(), patience + 1);
    assert!(report.losses[patience] > report.losses[0]);

    // Same seed, so these replay the same steps without early stopping getting in the way.
    let mut best = ascending_trainer(1, patience);
    best.train().unwrap();
    let mut last = ascending_trainer(patience + 1, 1000);
    assert!(!last.train().unwrap().stopped_early);

    assert_eq!(stopped.params(), best.params());
    assert_ne!(stopped.params(), last.params());
}

#[test]
fn test_ml_epoch_cap_keeps_the_last_epoch() {
    let spec = TrainerSpec {
        max_epochs: 3,
        ..small_spec()
    };

    let report = TrainerBuilder::new()
        .build(&spec, sum_diff())
        .unwrap()
        .train()
        .unwrap();

    assert!(!report.stopped_early);
    assert_eq!(report.epochs(), 3);
}

#[test]
fn test_ml_layer_shapes_follow_the_spec() {
    let spec = TrainerSpec {
        hidden: vec![4, 3],
        max_epochs: 1,
        ..small_spec()
    };

    let (model, _) = training::fit(&spec, sum_diff()).unwrap();
    let dims: Vec<_> = model.layers().unwrap().iter().map(|l| l.dim()).collect();

    assert_eq!(dims, [(2, 4), (4, 3), (3, 2)]);
    assert_eq!(model.size(), 3 * 4 + 5 * 3 + 4 * 2);
}

#[test]
fn test_ml_only_mse_is_accepted() {
    let spec = TrainerSpec {
        objective: "mae".into(),
        ..small_spec()
    };

    match TrainerBuilder::new().build(&spec, sum_diff()) {
        Err(MlErr::UnsupportedObjective(name)) => assert_eq!(name, "mae"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("mae should be rejected"),
    }
}

#[test]
fn test_ml_invalid_specs() {
    let no_epochs = TrainerSpec {
        max_epochs: 0,
        ..small_spec()
    };
    let empty_layer = TrainerSpec {
        hidden: vec![4, 0],
        ..small_spec()
    };

    for spec in [no_epochs, empty_layer] {
        assert!(matches!(
            TrainerBuilder::new().build(&spec, sum_diff()),
            Err(MlErr::InvalidSpec(_))
        ));
    }
}

#[test]
fn test_ml_prediction_width() {
    let spec = TrainerSpec {
        max_epochs: 1,
        ..small_spec()
    };
    let (model, _) = training::fit(&spec, sum_diff()).unwrap();

    let y = model.predict(array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]].view()).unwrap();
    assert_eq!(y.dim(), (3, 2));
    assert!(model.predict(array![[0.1, 0.2, 0.3]].view()).is_err());
}
