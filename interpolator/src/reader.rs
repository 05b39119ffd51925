use std::path::{Path, PathBuf};

use container::{Header, Record};
use log::{debug, warn};
use machine_learning::{arch::LayerParams, preprocessing::StandardScaler, training::TrainedModel};
use ndarray::{Array1, Array2, ArrayView2, s};

use crate::{
    InterpolatorErr, Result,
    config::ParamStats,
    format::{self, Activation, N_PARAMS},
    serializer::WavelengthAxis,
};

/// A model file read back into memory.
#[derive(Debug, Clone)]
pub struct SavedModel {
    /// The layers, input side first.
    pub layers: Vec<LayerParams>,
    pub version: String,
    /// The statistics the inputs are standardized with.
    pub normalization: [ParamStats; N_PARAMS],
    pub axis: Option<WavelengthAxis>,
}

impl SavedModel {
    /// Rebuilds the network the file describes.
    pub fn network(&self) -> Result<TrainedModel> {
        Ok(TrainedModel::from_layers(&self.layers)?)
    }

    pub fn scaler(&self) -> Result<StandardScaler> {
        let mean = self.normalization.iter().map(|p| p.mean).collect();
        let std = self.normalization.iter().map(|p| p.std).collect();
        Ok(StandardScaler::new(Array1::from_vec(mean), Array1::from_vec(std))?)
    }

    /// Predicts the spectra of raw physical parameters, one row per star.
    pub fn predict(&self, params: ArrayView2<f64>) -> Result<Array2<f64>> {
        if self.version == format::VERSION_SAVED {
            warn!("predicting with an unpatched v{} model file", format::VERSION_SAVED);
        }

        let x = self.scaler()?.transform(params)?;
        Ok(self.network()?.predict(x.view())?)
    }
}

/// Reads a model file written by the serializer, patched or not.
pub fn read_model(path: impl AsRef<Path>) -> Result<SavedModel> {
    let path = path.as_ref();
    let container = container::load(path)?;
    let records = container.records();

    let first = records.first().ok_or_else(|| InterpolatorErr::Format {
        path: path.to_path_buf(),
        record: 0,
        expected: "at least one record".into(),
        found: "an empty file".into(),
    })?;

    let ctx = Context {
        path,
        total: records.len(),
    };
    let version = ctx.str(first, 0, format::VERSION)?.to_string();
    let normalization = ctx.normalization(&first.header, &version)?;
    let axis = read_axis(&first.header);

    let mut layers = Vec::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate().rev() {
        ctx.check_record(record, pos)?;
        layers.push(ctx.split_bias(record, pos)?);
    }

    debug!(layers = layers.len(); "read model v{version} from {}", path.display());

    Ok(SavedModel {
        layers,
        version,
        normalization,
        axis,
    })
}

/// The axis keywords are all there or the axis is unknown.
fn read_axis(header: &Header) -> Option<WavelengthAxis> {
    Some(WavelengthAxis {
        reference_pixel: usize::try_from(header.get_i64(format::CRPIX1)?).ok()?,
        axis_type: header.get_str(format::CTYPE1)?.to_string(),
        first: header.get_f64(format::CRVAL1)?,
        step: header.get_f64(format::CDELT1)?,
    })
}

struct Context<'a> {
    path: &'a Path,
    total: usize,
}

impl Context<'_> {
    fn format_err(
        &self,
        record: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> InterpolatorErr {
        InterpolatorErr::Format {
            path: PathBuf::from(self.path),
            record,
            expected: expected.into(),
            found: found.into(),
        }
    }

    fn str<'r>(&self, record: &'r Record, pos: usize, key: &str) -> Result<&'r str> {
        record
            .header
            .get_str(key)
            .ok_or_else(|| self.format_err(pos, format!("a {key} string"), "nothing"))
    }

    fn f64(&self, header: &Header, pos: usize, key: &str) -> Result<f64> {
        header
            .get_f64(key)
            .ok_or_else(|| self.format_err(pos, format!("a {key} number"), "nothing"))
    }

    fn normalization(&self, header: &Header, version: &str) -> Result<[ParamStats; N_PARAMS]> {
        let mut stats = [ParamStats::new(0., 1.); N_PARAMS];

        for (j, stat) in stats.iter_mut().enumerate() {
            let (mean_key, std_key) = match version {
                format::VERSION_SAVED => {
                    let (mean, std) = format::SAVED_STATS_KEYS[j];
                    (mean.to_string(), std.to_string())
                }
                format::VERSION_PATCHED => (
                    format::ParamField::Mean.key(j + 1),
                    format::ParamField::Std.key(j + 1),
                ),
                other => {
                    return Err(self.format_err(
                        0,
                        format!(
                            "version {} or {}",
                            format::VERSION_SAVED,
                            format::VERSION_PATCHED
                        ),
                        format!("version {other}"),
                    ));
                }
            };

            *stat = ParamStats::new(
                self.f64(header, 0, &mean_key)?,
                self.f64(header, 0, &std_key)?,
            );
        }

        Ok(stats)
    }

    fn check_record(&self, record: &Record, pos: usize) -> Result<()> {
        let expected_name = match pos {
            0 => format::TERMINAL_RECORD.to_string(),
            _ => format::hidden_record(self.total - pos),
        };

        if record.name != expected_name {
            return Err(self.format_err(pos, expected_name, record.name.clone()));
        }

        let expected = Activation::of_record(pos);
        let found = self.str(record, pos, format::AFUNC)?;
        if found.parse::<Activation>().ok() != Some(expected) {
            return Err(self.format_err(pos, format!("activation {expected}"), found));
        }

        Ok(())
    }

    fn split_bias(&self, record: &Record, pos: usize) -> Result<LayerParams> {
        let data = &record.data;
        if data.nrows() < 2 {
            return Err(self.format_err(
                pos,
                "a bias row and at least one weight row",
                format!("{} rows", data.nrows()),
            ));
        }

        let biases = data.row(0).to_owned();
        let weights = data.slice(s![1.., ..]).to_owned();
        Ok(LayerParams::new(weights, biases)?)
    }
}
