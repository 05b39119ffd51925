use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use container::ContainerErr;
use machine_learning::MlErr;

/// The result type used across the interpolator.
pub type Result<T> = std::result::Result<T, InterpolatorErr>;

/// Every failure of a run, none of them is recovered from.
#[derive(Debug)]
pub enum InterpolatorErr {
    /// A training objective other than mean squared error was requested.
    UnsupportedObjective(String),
    /// The layers of a model don't chain.
    IncompatibleModel {
        layer: usize,
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// The model file to patch does not exist.
    NotFound(PathBuf),
    /// A model file record does not hold what the format requires.
    Format {
        path: PathBuf,
        record: usize,
        expected: String,
        found: String,
    },
    /// A data table could not be parsed or has the wrong shape.
    Data {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidInput(String),
    Ml(MlErr),
    Container(ContainerErr),
    Plot(String),
}

impl Display for InterpolatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedObjective(name) => {
                write!(f, "the objective function {name:?} does not exist")
            }
            Self::IncompatibleModel {
                layer,
                what,
                got,
                expected,
            } => write!(
                f,
                "incompatible model: layer {layer} has {what} {got}, expected {expected}"
            ),
            Self::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            Self::NotFound(path) => write!(f, "no model file at {}", path.display()),
            Self::Format {
                path,
                record,
                expected,
                found,
            } => write!(
                f,
                "{} record {record}: expected {expected}, found {found}",
                path.display()
            ),
            Self::Data { path, line, reason } => {
                write!(f, "{}:{line}: {reason}", path.display())
            }
            Self::Config { path, source } => {
                write!(f, "invalid configuration {}: {source}", path.display())
            }
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Ml(e) => write!(f, "{e}"),
            Self::Container(e) => write!(f, "{e}"),
            Self::Plot(msg) => write!(f, "plotting failed: {msg}"),
        }
    }
}

impl Error for InterpolatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Config { source, .. } => Some(source),
            Self::Ml(e) => Some(e),
            Self::Container(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for InterpolatorErr {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::UnsupportedObjective(name) => Self::UnsupportedObjective(name),
            MlErr::BrokenChain {
                layer,
                what,
                got,
                expected,
            } => Self::IncompatibleModel {
                layer,
                what,
                got,
                expected,
            },
            other => Self::Ml(other),
        }
    }
}

impl From<ContainerErr> for InterpolatorErr {
    fn from(value: ContainerErr) -> Self {
        match value {
            ContainerErr::Io { path, source } => Self::Io { path, source },
            other => Self::Container(other),
        }
    }
}
