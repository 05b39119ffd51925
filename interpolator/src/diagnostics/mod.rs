//! Training diagnostics: loss histories, loss curve fits and figures.

mod curve_fit;
mod history;
mod plots;

pub use curve_fit::{Bounds, DecayFit, fit_decay, fit_loss_curve};
pub use history::{read_loss_history, write_loss_history};
pub use plots::{
    RECONSTRUCTION_STRIDE, plot_loss, plot_loss_fit, plot_reconstruction, plot_reconstructions,
};

use crate::{InterpolatorErr, Result};

/// Returns the mean and the standard deviation of `original - predicted`.
pub fn residual_stats(original: &[f64], predicted: &[f64]) -> Result<(f64, f64)> {
    if original.len() != predicted.len() {
        return Err(InterpolatorErr::InvalidInput(format!(
            "{} original values for {} predicted values",
            original.len(),
            predicted.len()
        )));
    }

    if original.is_empty() {
        return Err(InterpolatorErr::InvalidInput("no values to compare".into()));
    }

    let n = original.len() as f64;
    let residuals = original.iter().zip(predicted).map(|(o, p)| o - p);
    let mean = residuals.clone().sum::<f64>() / n;
    let var = residuals.map(|r| (r - mean).powi(2)).sum::<f64>() / n;

    Ok((mean, var.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residuals_are_original_minus_predicted() {
        let (mean, std) = residual_stats(&[1., 2., 3., 4.], &[0., 2., 2., 4.]).unwrap();

        assert!((mean - 0.5).abs() < 1e-12);
        assert!((std - 0.5).abs() < 1e-12);
        assert!(residual_stats(&[1.], &[1., 2.]).is_err());
        assert!(residual_stats(&[], &[]).is_err());
    }
}
