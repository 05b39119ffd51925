mod loss_fn;
mod mse;
mod objective;

pub use loss_fn::LossFn;
pub use mse::Mse;
pub use objective::Objective;
