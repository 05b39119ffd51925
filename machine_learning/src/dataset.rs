use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// Paired samples and targets, one row each.
#[derive(Clone, Debug)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The samples, `N x features`.
    /// * `y` - The targets, `N x outputs`.
    ///
    /// # Returns
    /// An error if there are no samples or `x` and `y` have a different amount of rows.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Permutes the samples, keeping every target with its sample.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        self.x = self.x.select(Axis(0), &order);
        self.y = self.y.select(Axis(0), &order);
    }

    /// Yields consecutive batches of at most `batch_size` rows.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f64>, ArrayView2<'_, f64>)> {
        let size = batch_size.get();
        self.x
            .axis_chunks_iter(Axis(0), size)
            .zip(self.y.axis_chunks_iter(Axis(0), size))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let x = array![[0.], [1.], [2.], [3.], [4.]];
        let y = array![[0., 0.], [10., 1.], [20., 2.], [30., 3.], [40., 4.]];
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn batches_cover_every_row_once() {
        let dataset = dataset();
        let sizes: Vec<usize> = dataset
            .batches(NonZeroUsize::new(2).unwrap())
            .map(|(x, y)| {
                assert_eq!(x.nrows(), y.nrows());
                x.nrows()
            })
            .collect();

        assert_eq!(sizes, [2, 2, 1]);
    }

    #[test]
    fn shuffle_keeps_pairs_together() {
        let mut dataset = dataset();
        dataset.shuffle(&mut StdRng::seed_from_u64(3));

        for (x, y) in dataset.x.rows().into_iter().zip(dataset.y.rows()) {
            assert_eq!(y[0], x[0] * 10.);
            assert_eq!(y[1], x[0]);
        }

        let mut seen: Vec<f64> = dataset.x.iter().copied().collect();
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, [0., 1., 2., 3., 4.]);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = Dataset::new(Array2::zeros((3, 1)), Array2::zeros((2, 1))).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
        assert!(matches!(
            Dataset::new(Array2::zeros((0, 1)), Array2::zeros((0, 1))),
            Err(MlErr::EmptyDataset)
        ));
    }
}
