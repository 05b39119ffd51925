use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use machine_learning::{
    dataset::Dataset,
    preprocessing::StandardScaler,
    training::{self, TrainerSpec},
};
use ndarray::Array2;

use interpolator::{
    config::Calibration,
    diagnostics::{self, Bounds},
    loader::{self, DEFAULT_TRIM, DataPaths, GridData},
    patcher, reader, serializer,
};

#[derive(Parser)]
#[command(
    name = "interpolator",
    about = "Trains and maintains neural spectral interpolators."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network on a spectral grid and save it as a model file
    Train {
        /// Table of physical parameters, one `Teff logg [Fe/H]` row per spectrum
        #[arg(long)]
        params: PathBuf,

        /// Table of spectra, one row per star
        #[arg(long)]
        spectra: PathBuf,

        /// Table of spectra variances
        #[arg(long)]
        variance: PathBuf,

        /// Wavelength grid shared by every spectrum
        #[arg(long)]
        wave: PathBuf,

        /// Where to save the model file
        #[arg(long)]
        output: PathBuf,

        /// Width of every hidden layer, input side first
        #[arg(long, value_delimiter = ',', default_value = "64,256,1024")]
        hidden: Vec<usize>,

        /// Maximum amount of epochs
        #[arg(long, default_value_t = TrainerSpec::default().max_epochs)]
        epochs: usize,

        #[arg(long, default_value_t = TrainerSpec::default().batch_size)]
        batch_size: NonZeroUsize,

        /// Training objective, only `mse` is supported
        #[arg(long, default_value = "mse")]
        objective: String,

        /// Seed of the weight initialization and the batch shuffling
        #[arg(long, default_value_t = 20)]
        seed: u64,

        /// Wavelength bins dropped at each edge of the grid
        #[arg(long, default_value_t = DEFAULT_TRIM)]
        trim: usize,

        /// JSON calibration file
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Where to write the `epoch,loss` history
        #[arg(long)]
        history: Option<PathBuf>,

        /// Directory for the loss and reconstruction figures
        #[arg(long)]
        figs: Option<PathBuf>,

        /// Stamp the grid's own parameter statistics instead of the calibration's
        #[arg(long)]
        derive_normalization: bool,
    },

    /// Stamp a model file with the statistics of its parameter grid
    Patch {
        /// Model file to patch
        #[arg(long)]
        model: PathBuf,

        /// Table of physical parameters the model was trained on
        #[arg(long)]
        params: PathBuf,

        /// Where to write the patched file, the model is patched in place if absent
        #[arg(long)]
        output: Option<PathBuf>,

        /// JSON calibration file
        #[arg(long)]
        calibration: Option<PathBuf>,
    },

    /// Print the records of a model file as JSON
    Inspect {
        #[arg(long)]
        model: PathBuf,
    },

    /// Predict the spectrum of a star
    Predict {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        teff: f64,

        #[arg(long)]
        logg: f64,

        #[arg(long, allow_hyphen_values = true)]
        feh: f64,

        /// Where to write the `wavelength flux` pairs, stdout if absent
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fit a decay to the tail of a loss history
    FitLoss {
        #[arg(long)]
        history: PathBuf,

        /// First row of the fitted window
        #[arg(long, default_value_t = 10)]
        from: usize,

        /// End of the fitted window, exclusive
        #[arg(long, default_value_t = 1000)]
        to: usize,

        /// Where to draw the history with the fitted curve
        #[arg(long)]
        plot: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Train {
            params,
            spectra,
            variance,
            wave,
            output,
            hidden,
            epochs,
            batch_size,
            objective,
            seed,
            trim,
            calibration,
            history,
            figs,
            derive_normalization,
        } => {
            let paths = DataPaths {
                params,
                spectra,
                variance,
                wave,
            };
            let spec = TrainerSpec {
                hidden,
                objective,
                max_epochs: epochs,
                batch_size,
                seed: Some(seed),
                ..Default::default()
            };
            let outputs = TrainOutputs {
                model: output,
                history,
                figs,
                derive_normalization,
            };
            cmd_train(&paths, spec, trim, calibration.as_deref(), &outputs)
        }
        Commands::Patch {
            model,
            params,
            output,
            calibration,
        } => cmd_patch(&model, &params, output.as_deref(), calibration.as_deref()),
        Commands::Inspect { model } => cmd_inspect(&model),
        Commands::Predict {
            model,
            teff,
            logg,
            feh,
            output,
        } => cmd_predict(&model, [teff, logg, feh], output.as_deref()),
        Commands::FitLoss {
            history,
            from,
            to,
            plot,
        } => cmd_fit_loss(&history, from, to, plot.as_deref()),
    }
}

struct TrainOutputs {
    model: PathBuf,
    history: Option<PathBuf>,
    figs: Option<PathBuf>,
    derive_normalization: bool,
}

fn cmd_train(
    paths: &DataPaths,
    spec: TrainerSpec,
    trim: usize,
    calibration: Option<&Path>,
    outputs: &TrainOutputs,
) -> Result<()> {
    let start = Instant::now();
    let mut calibration = Calibration::load_or_default(calibration)?;
    let grid = GridData::load(paths, trim)?;

    let scaler = StandardScaler::fit(grid.params.view())?;
    let x = scaler.transform(grid.params.view())?;
    let dataset = Dataset::new(x.clone(), grid.spectra.clone())?;

    let (model, report) = training::fit(&spec, dataset)?;
    info!(
        epochs = report.epochs(), best_epoch = report.best_epoch, best_loss = report.best_loss,
        params = model.size();
        "trained in {:.1}s", start.elapsed().as_secs_f64()
    );

    if outputs.derive_normalization {
        calibration.derive_normalization(&scaler)?;
    }

    let axis = serializer::WavelengthAxis::from_grid(grid.wave.view(), &calibration)?;
    serializer::save_model(&outputs.model, &model.layers()?, &axis, &calibration)?;

    if let Some(path) = &outputs.history {
        diagnostics::write_loss_history(path, &report.losses)?;
    }

    if let Some(dir) = &outputs.figs {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        diagnostics::plot_loss(dir.join("loss.svg"), &report.losses)?;

        let predicted = model.predict(x.view())?;
        let drawn = diagnostics::plot_reconstructions(
            dir,
            grid.wave.view(),
            grid.spectra.view(),
            predicted.view(),
            diagnostics::RECONSTRUCTION_STRIDE,
        )?;
        info!(figures = drawn.len() + 1; "drew figures in {}", dir.display());
    }

    info!("done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_patch(
    model: &Path,
    params: &Path,
    output: Option<&Path>,
    calibration: Option<&Path>,
) -> Result<()> {
    let calibration = Calibration::load_or_default(calibration)?;
    let table = loader::load_table(params)?;

    let patched = patcher::patch_model(model, table.view(), output, &calibration)?;
    println!("{}", patched.display());
    Ok(())
}

fn cmd_inspect(model: &Path) -> Result<()> {
    let container = container::load(model)?;

    let records: Vec<_> = container
        .records()
        .iter()
        .map(|record| {
            serde_json::json!({
                "name": record.name,
                "shape": record.data.shape(),
                "header": record.header,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn cmd_predict(model: &Path, params: [f64; 3], output: Option<&Path>) -> Result<()> {
    let saved = reader::read_model(model)?;
    let Some(axis) = &saved.axis else {
        bail!("{} has no wavelength axis", model.display());
    };

    let x = Array2::from(vec![params]);
    let flux = saved.predict(x.view())?;
    let wave = axis.wavelengths(flux.ncols());

    let mut text = String::new();
    for (w, f) in wave.iter().zip(flux.row(0)) {
        text.push_str(&format!("{w} {f}\n"));
    }

    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{text}"),
    }

    Ok(())
}

fn cmd_fit_loss(history: &Path, from: usize, to: usize, plot: Option<&Path>) -> Result<()> {
    if from >= to {
        bail!("empty window {from}..{to}");
    }

    let history = diagnostics::read_loss_history(history)?;
    let fit = diagnostics::fit_loss_curve(&history, from..to, &Bounds::default())?;
    println!("{} {} {} {}", fit.a, fit.b, fit.c, fit.d);

    if let Some(path) = plot {
        diagnostics::plot_loss_fit(path, &history, &fit)?;
    }

    Ok(())
}
