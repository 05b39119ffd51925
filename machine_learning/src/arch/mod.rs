pub mod activations;
pub mod layers;
pub mod loss;
mod model;
mod params;
mod sequential;

pub use model::Model;
pub use params::{LayerParams, check_chain};
pub use sequential::Sequential;
