use std::{fs, path::Path};

use machine_learning::preprocessing::StandardScaler;
use serde::{Deserialize, Serialize};

use crate::{InterpolatorErr, Result, format::N_PARAMS};

/// Mean and standard deviation of one input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamStats {
    pub mean: f64,
    pub std: f64,
}

impl ParamStats {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }
}

/// Describes one physical input parameter of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub unit: String,
    /// Step used when deriving the network numerically with respect to this parameter.
    pub step: f64,
}

impl ParamDescriptor {
    pub fn new(name: &str, unit: &str, step: f64) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            step,
        }
    }
}

/// Domain calibration values written into model files.
///
/// Every field has a default, so a calibration file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Tag of the function applied to the inputs before the network.
    pub preprocessing: String,
    /// Tag of the function applied to the outputs, blank for none.
    pub postprocessing: String,
    /// Normalization statistics stamped by the serializer, `Teff`, `logg` and `[Fe/H]`.
    pub normalization: [ParamStats; N_PARAMS],
    pub parameters: [ParamDescriptor; N_PARAMS],
    pub axis_type: String,
    pub reference_pixel: usize,
    /// Wavelength step per pixel, computed from the wavelength grid when absent.
    pub step: Option<f64>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            preprocessing: "linscale".to_string(),
            postprocessing: String::new(),
            normalization: [
                ParamStats::new(5514.09, 1207.174),
                ParamStats::new(3.2167, 1.76353),
                ParamStats::new(-1.2888, 0.95909),
            ],
            parameters: [
                ParamDescriptor::new("Teff", "K", 1.0),
                ParamDescriptor::new("Logg", "dex", 0.005),
                ParamDescriptor::new("Fe/H", "dex", 0.01),
            ],
            axis_type: "AWAV".to_string(),
            reference_pixel: 1,
            step: None,
        }
    }
}

impl Calibration {
    /// Reads a calibration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| InterpolatorErr::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| InterpolatorErr::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the calibration at `path`, or the default one if there is no path.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Replaces the normalization statistics with the ones `scaler` standardizes with.
    pub fn derive_normalization(&mut self, scaler: &StandardScaler) -> Result<()> {
        let (mean, std) = (scaler.mean(), scaler.std());
        if mean.len() != N_PARAMS || std.len() != N_PARAMS {
            return Err(InterpolatorErr::InvalidInput(format!(
                "expected statistics of {N_PARAMS} parameters, found {}",
                mean.len()
            )));
        }

        for (j, stats) in self.normalization.iter_mut().enumerate() {
            *stats = ParamStats::new(mean[j], std[j]);
        }

        Ok(())
    }
}
