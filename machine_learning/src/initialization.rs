use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{MlErr, Result, arch::LayerParams};

/// The standard deviation of a unit normal truncated at two standard deviations.
const TRUNCATED_STD: f64 = 0.879_625_661_034_239_8;

/// A normal distribution where samples further than two standard deviations from the mean are
/// redrawn.
#[derive(Clone, Copy, Debug)]
pub struct TruncatedNormal {
    normal: Normal<f64>,
    mean: f64,
    cut: f64,
}

impl TruncatedNormal {
    /// Creates a new `TruncatedNormal`.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        let normal = Normal::new(mean, std_dev).map_err(|e| MlErr::InvalidSpec(e.to_string()))?;

        Ok(Self {
            normal,
            mean,
            cut: 2. * std_dev,
        })
    }
}

impl Distribution<f64> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        loop {
            let x = self.normal.sample(rng);
            if (x - self.mean).abs() <= self.cut {
                return x;
            }
        }
    }
}

/// Glorot normal initialization of a dense layer of dim `(fan_in, fan_out)`.
///
/// Weights come from a normal truncated at two standard deviations, scaled so that their actual
/// standard deviation is `sqrt(2 / (fan_in + fan_out))`. Biases start at zero.
pub fn glorot_normal<R: Rng + ?Sized>(dim: (usize, usize), rng: &mut R) -> Result<LayerParams> {
    let (fan_in, fan_out) = dim;
    if fan_in + fan_out == 0 {
        return Err(MlErr::InvalidSpec("a layer needs at least one unit".into()));
    }

    let std_dev = (2. / (fan_in + fan_out) as f64).sqrt() / TRUNCATED_STD;
    let dist = TruncatedNormal::new(0., std_dev)?;

    let weights = Array2::random_using(dim, dist, rng);
    LayerParams::new(weights, Array1::zeros(fan_out))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_stay_within_the_cut() {
        let mut rng = StdRng::seed_from_u64(20);
        let dist = TruncatedNormal::new(1., 0.5).unwrap();

        for _ in 0..10_000 {
            let x = dist.sample(&mut rng);
            assert!((x - 1.).abs() <= 1.);
        }
    }

    #[test]
    fn glorot_has_the_target_spread() {
        let mut rng = StdRng::seed_from_u64(20);
        let layer = glorot_normal((200, 300), &mut rng).unwrap();

        let target = (2. / 500f64).sqrt();
        let std = layer.weights.std(0.);
        assert!((std - target).abs() / target < 0.05, "{std} vs {target}");
        assert!(layer.biases.iter().all(|&b| b == 0.));
        assert_eq!(layer.dim(), (200, 300));
    }

    #[test]
    fn same_seed_same_weights() {
        let a = glorot_normal((3, 4), &mut StdRng::seed_from_u64(7)).unwrap();
        let b = glorot_normal((3, 4), &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }
}
