use crate::Result;

pub trait Optimizer {
    /// Takes a step over `params` given their gradient, both slices have the same layout.
    fn update_params(&mut self, params: &mut [f64], grad: &[f64]) -> Result<()>;
}
