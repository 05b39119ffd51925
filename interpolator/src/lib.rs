//! Trains a feed-forward network mapping stellar parameters (`Teff`, `logg`, `[Fe/H]`) to
//! spectra, stores it as a multi-record model file and patches the file's metadata with the
//! statistics of the parameter grid it was trained on.

pub mod config;
pub mod diagnostics;
mod error;
pub mod format;
pub mod loader;
pub mod patcher;
pub mod reader;
pub mod serializer;

pub use error::{InterpolatorErr, Result};
