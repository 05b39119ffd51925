use std::path::{Path, PathBuf};

use container::{Container, FileGuard, Value};
use log::{debug, info};
use ndarray::{ArrayView2, Axis};
use serde::Serialize;

use crate::{
    InterpolatorErr, Result,
    config::{Calibration, ParamDescriptor},
    format::{self, ParamField},
};

/// Everything the patched format records about one physical input parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub unit: String,
    pub lower: f64,
    pub upper: f64,
    pub step: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl ParameterSummary {
    /// Summarizes every column of `table`, one per descriptor.
    pub fn from_table(
        table: ArrayView2<f64>,
        descriptors: &[ParamDescriptor],
    ) -> Result<Vec<Self>> {
        if table.ncols() != descriptors.len() {
            return Err(InterpolatorErr::InvalidInput(format!(
                "expected {} parameter columns, found {}",
                descriptors.len(),
                table.ncols()
            )));
        }

        if table.nrows() == 0 {
            return Err(InterpolatorErr::InvalidInput("empty parameter table".into()));
        }

        let summaries = table
            .axis_iter(Axis(1))
            .zip(descriptors)
            .map(|(column, descriptor)| Self {
                name: descriptor.name.clone(),
                unit: descriptor.unit.clone(),
                lower: column.fold(f64::INFINITY, |acc, &v| acc.min(v)),
                upper: column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
                step: descriptor.step,
                mean: column.mean().unwrap_or_default(),
                std: column.std(0.),
            })
            .collect();

        Ok(summaries)
    }

    fn value(&self, field: ParamField) -> Value {
        match field {
            ParamField::Name => self.name.as_str().into(),
            ParamField::Unit => self.unit.as_str().into(),
            ParamField::Lower => self.lower.into(),
            ParamField::Upper => self.upper.into(),
            ParamField::Step => self.step.into(),
            ParamField::Mean => self.mean.into(),
            ParamField::Std => self.std.into(),
        }
    }
}

/// Rewrites the metadata of every record of `container` to the patched format.
///
/// All normalization keywords and parameter descriptors are dropped and written again from
/// `summaries`, so patching twice gives the same headers.
///
/// # Returns
/// A `Format` error if the container has no records or a record has no normalization keyword
/// to replace.
pub fn patch_container(
    container: &mut Container,
    summaries: &[ParameterSummary],
    path: &Path,
) -> Result<()> {
    if container.is_empty() {
        return Err(InterpolatorErr::Format {
            path: path.to_path_buf(),
            record: 0,
            expected: "at least one record".into(),
            found: "an empty file".into(),
        });
    }

    for (i, record) in container.records_mut().iter_mut().enumerate() {
        let header = &mut record.header;

        let removed = header.remove_prefix(format::NORM_PREFIX);
        if removed == 0 {
            return Err(InterpolatorErr::Format {
                path: path.to_path_buf(),
                record: i,
                expected: format!("{}* keywords", format::NORM_PREFIX),
                found: "none".to_string(),
            });
        }

        let descriptors = header.remove_prefix(format::PARAM_PREFIX);
        debug!(record = i; "dropped {removed} normalization and {descriptors} descriptor keywords");

        for (j, summary) in summaries.iter().enumerate() {
            for field in ParamField::ALL {
                header.set_with_comment(
                    &field.key(j + 1),
                    summary.value(field),
                    field.comment(&summary.name),
                )?;
            }
        }

        header.set_with_comment(
            format::VERSION,
            format::VERSION_PATCHED,
            format::VERSION_COMMENT,
        )?;
    }

    Ok(())
}

/// Patches the model file at `input` with statistics of the authoritative parameter `table`.
///
/// The file is rewritten in place unless `output` names another destination. Both files are
/// guarded for the whole rewrite.
///
/// # Returns
/// The path of the patched file.
pub fn patch_model(
    input: &Path,
    table: ArrayView2<f64>,
    output: Option<&Path>,
    calibration: &Calibration,
) -> Result<PathBuf> {
    if !input.is_file() {
        return Err(InterpolatorErr::NotFound(input.to_path_buf()));
    }

    let summaries = ParameterSummary::from_table(table, &calibration.parameters)?;
    let output = output.unwrap_or(input);

    let _input_guard = FileGuard::acquire(input)?;
    let _output_guard = (output != input)
        .then(|| FileGuard::acquire(output))
        .transpose()?;

    let mut container = container::load(input)?;
    patch_container(&mut container, &summaries, input)?;
    container::store(output, &container)?;

    info!(
        records = container.len();
        "patched model to v{} at {}", format::VERSION_PATCHED, output.display()
    );
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn summaries_use_population_statistics() {
        let table = array![[1., 10., -1.], [3., 10., 0.], [5., 10., 1.], [7., 10., 2.]];
        let descriptors = Calibration::default().parameters;

        let summaries = ParameterSummary::from_table(table.view(), &descriptors).unwrap();

        assert_eq!(summaries[0].name, "Teff");
        assert_eq!((summaries[0].lower, summaries[0].upper), (1., 7.));
        assert_eq!(summaries[0].mean, 4.);
        assert!((summaries[0].std - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(summaries[1].std, 0.);
        assert_eq!(summaries[2].step, 0.01);
    }

    #[test]
    fn tables_need_one_column_per_descriptor() {
        let descriptors = Calibration::default().parameters;
        let table = array![[1., 2.]];
        assert!(ParameterSummary::from_table(table.view(), &descriptors).is_err());
    }
}
