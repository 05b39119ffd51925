use std::path::Path;

use container::{Container, Record};
use log::{debug, info};
use machine_learning::arch::{LayerParams, check_chain};
use ndarray::{Array2, ArrayView1, s};
use serde::Serialize;

use crate::{
    InterpolatorErr, Result,
    config::Calibration,
    format::{self, Activation},
};

/// Maps output vector indices to physical wavelengths: pixel `reference_pixel` (1-based) is at
/// `first` and every pixel adds `step`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavelengthAxis {
    pub reference_pixel: usize,
    pub axis_type: String,
    pub first: f64,
    pub step: f64,
}

impl WavelengthAxis {
    /// Describes the axis of a wavelength grid, the step is the mean pixel step unless the
    /// calibration fixes one.
    pub fn from_grid(wave: ArrayView1<f64>, calibration: &Calibration) -> Result<Self> {
        let n = wave.len();
        let first = *wave
            .first()
            .ok_or_else(|| InterpolatorErr::InvalidInput("empty wavelength grid".into()))?;

        let step = match calibration.step {
            Some(step) => step,
            None if n > 1 => (wave[n - 1] - first) / (n - 1) as f64,
            None => {
                return Err(InterpolatorErr::InvalidInput(
                    "a single wavelength needs an explicit step".into(),
                ));
            }
        };

        Ok(Self {
            reference_pixel: calibration.reference_pixel,
            axis_type: calibration.axis_type.clone(),
            first,
            step,
        })
    }

    /// Returns the wavelength of every one of `n` pixels.
    pub fn wavelengths(&self, n: usize) -> Vec<f64> {
        let offset = self.reference_pixel as f64 - 1.;
        (0..n)
            .map(|i| self.first + (i as f64 - offset) * self.step)
            .collect()
    }
}

/// Lays `layers` (input side first) out as model file records, terminal layer first.
///
/// # Returns
/// `IncompatibleModel` if the layers don't chain.
pub fn build_container(
    layers: &[LayerParams],
    axis: &WavelengthAxis,
    calibration: &Calibration,
) -> Result<Container> {
    check_chain(layers)?;

    let total = layers.len();
    let mut container = Container::new();

    for (pos, j) in (0..total).rev().enumerate() {
        let name = if j == total - 1 {
            format::TERMINAL_RECORD.to_string()
        } else {
            format::hidden_record(j + 1)
        };

        let mut record = Record::new(name, stack_bias(&layers[j]));
        write_header(&mut record, pos, total, axis, calibration)?;

        debug!(record = pos; "laid out {} {:?}", record.name, record.data.dim());
        container.push(record);
    }

    Ok(container)
}

/// Writes `layers` into a new model file at `path`, replacing any previous one atomically.
pub fn save_model(
    path: impl AsRef<Path>,
    layers: &[LayerParams],
    axis: &WavelengthAxis,
    calibration: &Calibration,
) -> Result<()> {
    let path = path.as_ref();
    let container = build_container(layers, axis, calibration)?;
    container::store(path, &container)?;

    info!(
        records = container.len();
        "saved model v{} at {}", format::VERSION_SAVED, path.display()
    );
    Ok(())
}

/// Returns the `(inputs + 1) x outputs` matrix with the biases as the first row.
fn stack_bias(layer: &LayerParams) -> Array2<f64> {
    let (inputs, outputs) = layer.dim();
    let mut data = Array2::zeros((inputs + 1, outputs));

    data.row_mut(0).assign(&layer.biases);
    data.slice_mut(s![1.., ..]).assign(&layer.weights);
    data
}

fn write_header(
    record: &mut Record,
    pos: usize,
    total: usize,
    axis: &WavelengthAxis,
    calibration: &Calibration,
) -> Result<()> {
    let header = &mut record.header;

    if pos == 0 {
        header.set(format::CRPIX1, axis.reference_pixel)?;
        header.set(format::CTYPE1, axis.axis_type.as_str())?;
        header.set_with_comment(format::CRVAL1, axis.first, format::CRVAL1_COMMENT)?;
        header.set_with_comment(format::CDELT1, axis.step, format::CDELT1_COMMENT)?;
    }

    let activation = Activation::of_record(pos);
    header.set_with_comment(format::AFUNC, activation.tag(), format::AFUNC_COMMENT)?;
    header.set_with_comment(format::LAYER, total - pos, format::LAYER_COMMENT)?;
    header.set_with_comment(format::VERSION, format::VERSION_SAVED, format::VERSION_COMMENT)?;
    header.set_with_comment(
        format::PREPRO,
        calibration.preprocessing.as_str(),
        format::PREPRO_COMMENT,
    )?;

    let stats = calibration.normalization.iter();
    let names = format::SAVED_STATS_NAMES.iter();
    for ((stats, name), (mean_key, std_key)) in stats.zip(names).zip(format::SAVED_STATS_KEYS) {
        header.set_with_comment(mean_key, stats.mean, format!("Mean of the {name}"))?;
        header.set_with_comment(std_key, stats.std, format!("Std of the {name}"))?;
    }

    header.set_with_comment(
        format::POSTPR,
        calibration.postprocessing.as_str(),
        format::POSTPR_COMMENT,
    )?;
    header.set_with_comment(format::HLAYER, total - 1, format::HLAYER_COMMENT)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;

    fn axis() -> WavelengthAxis {
        WavelengthAxis {
            reference_pixel: 1,
            axis_type: "AWAV".into(),
            first: 4000.,
            step: 1.25,
        }
    }

    #[test]
    fn bias_is_the_first_row() {
        let layer = LayerParams::new(array![[1., 2.], [3., 4.], [5., 6.]], array![-1., -2.]).unwrap();
        assert_eq!(
            stack_bias(&layer),
            array![[-1., -2.], [1., 2.], [3., 4.], [5., 6.]]
        );
    }

    #[test]
    fn axis_step_comes_from_the_grid_or_the_calibration() {
        let wave = array![4000., 4001., 4003., 4006.];
        let mut calibration = Calibration::default();

        let axis = WavelengthAxis::from_grid(wave.view(), &calibration).unwrap();
        assert_eq!((axis.first, axis.step), (4000., 2.));
        assert_eq!(axis.wavelengths(3), [4000., 4002., 4004.]);

        calibration.step = Some(1.25);
        let axis = WavelengthAxis::from_grid(wave.view(), &calibration).unwrap();
        assert_eq!(axis.step, 1.25);

        calibration.step = None;
        assert!(WavelengthAxis::from_grid(array![1.].view(), &calibration).is_err());
    }

    #[test]
    fn three_layers_are_reversed() {
        let layers = [
            LayerParams::new(Array2::zeros((3, 2)), Array1::zeros(2)).unwrap(),
            LayerParams::new(Array2::zeros((2, 4)), Array1::zeros(4)).unwrap(),
            LayerParams::new(Array2::zeros((4, 6)), Array1::zeros(6)).unwrap(),
        ];

        let container = build_container(&layers, &axis(), &Calibration::default()).unwrap();
        let summary: Vec<_> = container
            .records()
            .iter()
            .map(|r| (r.name.as_str(), r.data.dim(), r.header.get_i64(format::LAYER)))
            .collect();

        assert_eq!(
            summary,
            [
                ("TERM_WEIGHTS", (5, 6), Some(3)),
                ("HIDDEN_LAYER_2", (3, 4), Some(2)),
                ("HIDDEN_LAYER_1", (4, 2), Some(1)),
            ]
        );
    }
}
