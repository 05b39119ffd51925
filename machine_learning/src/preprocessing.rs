use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Per column standardization: `(x - mean) / std`.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Creates a scaler from known statistics, a zero std is used as a scale of 1.
    pub fn new(mean: Array1<f64>, std: Array1<f64>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(MlErr::SizeMismatch {
                what: "scaler std",
                got: std.len(),
                expected: mean.len(),
            });
        }

        let scale = std.mapv(|s| if s == 0. { 1. } else { s });
        Ok(Self { mean, scale })
    }

    /// Fits the mean and the population standard deviation of every column of `x`.
    pub fn fit(x: ArrayView2<f64>) -> Result<Self> {
        let mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
        let std = x.std_axis(Axis(0), 0.);
        Self::new(mean, std)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// The per column scale, the standard deviation unless it was zero.
    pub fn std(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check(x)?;
        Ok((&x - &self.mean) / &self.scale)
    }

    pub fn inverse_transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check(x)?;
        Ok(&x * &self.scale + &self.mean)
    }

    fn check(&self, x: ArrayView2<f64>) -> Result<()> {
        if x.ncols() != self.mean.len() {
            return Err(MlErr::SizeMismatch {
                what: "scaler input",
                got: x.ncols(),
                expected: self.mean.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn standardizes_columns() {
        let x = array![[1., 10., 5.], [3., 10., 5.], [5., 10., 5.], [7., 10., 5.]];
        let scaler = StandardScaler::fit(x.view()).unwrap();

        assert_eq!(scaler.mean(), &array![4., 10., 5.]);
        assert!((scaler.std()[0] - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(scaler.std()[1], 1.);

        let t = scaler.transform(x.view()).unwrap();
        assert!(t.column(0).mean().unwrap().abs() < 1e-12);
        assert!((t.column(0).std(0.) - 1.).abs() < 1e-12);
        assert!(t.column(1).iter().all(|&v| v == 0.));

        let back = scaler.inverse_transform(t.view()).unwrap();
        for (a, b) in back.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn width_is_checked() {
        let scaler = StandardScaler::fit(array![[1., 2.]].view()).unwrap();
        assert!(scaler.transform(array![[1., 2., 3.]].view()).is_err());
    }
}
