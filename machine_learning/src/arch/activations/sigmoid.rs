/// The logistic function scaled by an amplitude, `amp = 1` is the standard logistic.
#[derive(Clone, Debug, PartialEq)]
pub struct Sigmoid {
    amp: f64,
}

impl Sigmoid {
    pub fn new(amp: f64) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f64) -> f64 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f64) -> f64 {
        let s = 1. / (1. + (-z).exp());
        self.amp * s * (1. - s)
    }
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(1.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivative_matches_finite_differences() {
        let sigmoid = Sigmoid::new(2.5);
        let h = 1e-6;

        for z in [-30., -2., -0.3, 0., 0.7, 4., 30.] {
            let numeric = (sigmoid.f(z + h) - sigmoid.f(z - h)) / (2. * h);
            assert!((sigmoid.df(z) - numeric).abs() < 1e-8, "z = {z}");
        }
    }

    #[test]
    fn saturates_at_the_amplitude() {
        let sigmoid = Sigmoid::new(3.);
        assert_eq!(sigmoid.f(0.), 1.5);
        assert!((sigmoid.f(50.) - 3.).abs() < 1e-12);
        assert!(sigmoid.f(-50.) < 1e-12);
    }
}
