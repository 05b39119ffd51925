use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::{Path, PathBuf},
};

/// The container module's result type.
pub type Result<T> = std::result::Result<T, ContainerErr>;

/// Failures while encoding, decoding or storing a container.
#[derive(Debug)]
pub enum ContainerErr {
    /// An I/O failure on a known file.
    Io { path: PathBuf, source: io::Error },
    /// An I/O failure on a stream without an associated path.
    Stream(io::Error),
    /// The stream ended in the middle of a record.
    Truncated { record: usize },
    MissingKeyword {
        record: usize,
        key: &'static str,
    },
    InvalidCard {
        record: usize,
        card: String,
        reason: &'static str,
    },
    UnsupportedBitpix { record: usize, bitpix: i64 },
    UnsupportedShape { record: usize, naxis: i64 },
    InvalidKey(String),
    InvalidValue { key: String, reason: &'static str },
    ValueTooLong { key: String },
    /// Somebody else holds the exclusive guard for this file.
    Locked(PathBuf),
}

impl ContainerErr {
    /// Attaches `path` to a stream failure, other errors are returned untouched.
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            ContainerErr::Stream(source) => ContainerErr::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

impl Display for ContainerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerErr::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            ContainerErr::Stream(e) => write!(f, "io error: {e}"),
            ContainerErr::Truncated { record } => {
                write!(f, "the container ended in the middle of record {record}")
            }
            ContainerErr::MissingKeyword { record, key } => {
                write!(f, "record {record} is missing the mandatory keyword {key}")
            }
            ContainerErr::InvalidCard {
                record,
                card,
                reason,
            } => write!(f, "record {record} has an invalid card {card:?}: {reason}"),
            ContainerErr::UnsupportedBitpix { record, bitpix } => {
                write!(f, "record {record} uses BITPIX = {bitpix}, only -64 is supported")
            }
            ContainerErr::UnsupportedShape { record, naxis } => {
                write!(f, "record {record} has NAXIS = {naxis}, at most 2 axes are supported")
            }
            ContainerErr::InvalidKey(key) => write!(f, "invalid keyword {key:?}"),
            ContainerErr::InvalidValue { key, reason } => {
                write!(f, "invalid value for keyword {key}: {reason}")
            }
            ContainerErr::ValueTooLong { key } => {
                write!(f, "the value of keyword {key} does not fit in a card")
            }
            ContainerErr::Locked(path) => write!(f, "{} is locked by another process", path.display()),
        }
    }
}

impl Error for ContainerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContainerErr::Io { source, .. } => Some(source),
            ContainerErr::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ContainerErr {
    fn from(value: io::Error) -> Self {
        Self::Stream(value)
    }
}
