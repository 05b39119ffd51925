use std::{
    fmt::Display,
    ops::Range,
    path::{Path, PathBuf},
};

use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
};
use rayon::prelude::*;

use super::{DecayFit, residual_stats};
use crate::{InterpolatorErr, Result};

/// Every how many samples a reconstruction figure is drawn.
pub const RECONSTRUCTION_STRIDE: usize = 250;

const SIZE: (u32, u32) = (1200, 600);
const FONT: &str = "sans-serif";

/// Height of the spectrum panel, the residual panel gets the rest in a 4 to 1.5 ratio.
const TOP_HEIGHT: u32 = SIZE.1 * 8 / 11;

/// Draws a spectrum against its reconstruction, with the residuals in a panel below.
///
/// The residual panel marks zero, the residuals' mean and plus and minus three standard
/// deviations around zero.
pub fn plot_reconstruction(
    path: impl AsRef<Path>,
    wave: &[f64],
    original: &[f64],
    predicted: &[f64],
    title: &str,
) -> Result<()> {
    let path = path.as_ref();
    if wave.len() != original.len() {
        return Err(InterpolatorErr::InvalidInput(format!(
            "{} wavelengths for a spectrum of {} bins",
            wave.len(),
            original.len()
        )));
    }

    let (mean, std) = residual_stats(original, predicted)?;
    let residuals: Vec<f64> = original.iter().zip(predicted).map(|(o, p)| o - p).collect();

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (top, bottom) = root.split_vertically(TOP_HEIGHT);

    let x_range = range(wave.iter().copied());
    let mut chart = ChartBuilder::on(&top)
        .caption(title, (FONT, 20))
        .margin(10)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(
            x_range.clone(),
            range(original.iter().chain(predicted).copied()),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .y_desc("Flux")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(line(wave, original), &BLACK))
        .map_err(plot_err)?
        .label("original")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));

    chart
        .draw_series(LineSeries::new(line(wave, predicted), &RED))
        .map_err(plot_err)?
        .label("predicted")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    let levels = residual_levels(mean, std);
    let mut chart = ChartBuilder::on(&bottom)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(
            x_range.clone(),
            range(residuals.iter().chain(&levels).copied()),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Wavelength")
        .y_desc("Residual")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(line(wave, &residuals), &BLACK))
        .map_err(plot_err)?;

    let horizontal = |y: f64| vec![(x_range.start, y), (x_range.end, y)];
    let [zero, mean, low, high] = levels;
    chart
        .draw_series(LineSeries::new(horizontal(zero), &BLUE))
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(horizontal(mean), &RED))
        .map_err(plot_err)?;
    for y in [low, high] {
        chart
            .draw_series(LineSeries::new(horizontal(y), RED.mix(0.5)))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    debug!("drew {}", path.display());
    Ok(())
}

/// Draws the reconstruction of every `stride`-th spectrum into `dir`.
///
/// # Returns
/// The paths of the figures, in sample order.
pub fn plot_reconstructions(
    dir: impl AsRef<Path>,
    wave: ArrayView1<f64>,
    originals: ArrayView2<f64>,
    predicted: ArrayView2<f64>,
    stride: usize,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if originals.dim() != predicted.dim() {
        return Err(InterpolatorErr::InvalidInput(format!(
            "{:?} original spectra for {:?} predicted spectra",
            originals.dim(),
            predicted.dim()
        )));
    }

    let wave = wave.to_vec();
    let samples: Vec<usize> = (0..originals.nrows()).step_by(stride.max(1)).collect();

    samples
        .into_par_iter()
        .map(|i| {
            let path = dir.join(format!("reconstruction_{i}.svg"));
            plot_reconstruction(
                &path,
                &wave,
                &originals.row(i).to_vec(),
                &predicted.row(i).to_vec(),
                &format!("Sample {i}"),
            )?;
            Ok(path)
        })
        .collect()
}

/// Draws the loss of every epoch against the epoch.
pub fn plot_loss(path: impl AsRef<Path>, losses: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let points: Vec<(f64, f64)> = losses
        .iter()
        .enumerate()
        .map(|(epoch, &loss)| (epoch as f64, loss))
        .collect();

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let axes = ("epoch", "loss");
    let mut chart = loss_chart(&root, "Training loss", axes, &points, &[])?;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("drew {}", path.display());
    Ok(())
}

/// Draws `log10(loss)` against `log10(epoch)` with a fitted decay extrapolated up to a million
/// epochs. Epoch zero is left out.
pub fn plot_loss_fit(path: impl AsRef<Path>, history: &[(usize, f64)], fit: &DecayFit) -> Result<()> {
    let path = path.as_ref();
    let points = log_points(history.iter().copied());
    let curve: Vec<(f64, f64)> = (10..1_000_000)
        .step_by(1000)
        .map(|epoch| {
            let x = (epoch as f64).log10();
            (x, fit.eval(x))
        })
        .collect();

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let axes = ("log10(epoch)", "log10(loss)");
    let mut chart = loss_chart(&root, "Loss curve fit", axes, &points, &curve)?;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_err)?
        .label("loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(curve, &RED))
        .map_err(plot_err)?
        .label(format!(
            "{:.3} exp(-{:.3} (x - {:.3})) + {:.3}",
            fit.a, fit.b, fit.c, fit.d
        ))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("drew {}", path.display());
    Ok(())
}

type LossChart<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn loss_chart<'a, 'b>(
    root: &'a DrawingArea<SVGBackend<'b>, Shift>,
    title: &str,
    (x_desc, y_desc): (&str, &str),
    points: &[(f64, f64)],
    extra: &[(f64, f64)],
) -> Result<LossChart<'a, 'b>> {
    if points.is_empty() {
        return Err(InterpolatorErr::InvalidInput("no loss to draw".into()));
    }

    let all = points.iter().chain(extra);
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(
            range(all.clone().map(|(x, _)| *x)),
            range(all.map(|(_, y)| *y)),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    Ok(chart)
}

/// Zero, the residual mean, and minus and plus three standard deviations.
fn residual_levels(mean: f64, std: f64) -> [f64; 4] {
    [0., mean, -3. * std, 3. * std]
}

fn log_points(history: impl Iterator<Item = (usize, f64)>) -> Vec<(f64, f64)> {
    history
        .filter(|&(epoch, loss)| epoch > 0 && loss > 0.)
        .map(|(epoch, loss)| ((epoch as f64).log10(), loss.log10()))
        .collect()
}

fn line<'a>(xs: &'a [f64], ys: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    xs.iter().copied().zip(ys.iter().copied())
}

/// The span of the finite values padded by 5%, a unit span around a single value.
fn range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if lo > hi {
        return 0.0..1.0;
    }

    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    lo - pad..hi + pad
}

fn plot_err(e: impl Display) -> InterpolatorErr {
    InterpolatorErr::Plot(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::Array2;

    use super::*;

    #[test]
    fn ranges_are_padded() {
        assert_eq!(range([0., 10.].into_iter()), -0.5..10.5);
        assert_eq!(range([2.].into_iter()), 1.5..2.5);
        assert_eq!(range([f64::NAN].into_iter()), 0.0..1.0);
    }

    #[test]
    fn residual_band_is_centered_on_zero() {
        assert_eq!(residual_levels(0.5, 2.), [0., 0.5, -6., 6.]);
    }

    #[test]
    fn loss_figures_draw_raw_losses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.svg");

        // A single epoch with a zero loss has nothing to show on log axes.
        plot_loss(&path, &[0.]).unwrap();
        assert!(path.exists());
        assert!(plot_loss(&path, &[]).is_err());
    }

    #[test]
    fn loss_figures_are_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.svg");
        let losses: Vec<f64> = (0..50).map(|e| 1. / (e + 1) as f64).collect();

        plot_loss(&path, &losses).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn one_reconstruction_per_stride() {
        let dir = tempfile::tempdir().unwrap();
        let wave: Vec<f64> = (0..8).map(|i| 4000. + i as f64).collect();
        let originals = Array2::from_shape_fn((5, 8), |(i, j)| (i + j) as f64);
        let predicted = originals.mapv(|v| v + 0.1);

        let paths = plot_reconstructions(
            dir.path(),
            ArrayView1::from(&wave),
            originals.view(),
            predicted.view(),
            2,
        )
        .unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["reconstruction_0.svg", "reconstruction_2.svg", "reconstruction_4.svg"]
        );
        assert!(paths.iter().all(|p| p.exists()));
    }
}
