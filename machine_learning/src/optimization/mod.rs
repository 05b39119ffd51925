mod adam;
mod gradient_descent;
mod optimizer;

pub use adam::{Adam, AdamParams};
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
