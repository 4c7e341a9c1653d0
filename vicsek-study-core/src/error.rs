//! Error types.

use std::io;
use std::num::{ParseFloatError, ParseIntError};

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(String),

    #[error("json deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("failed parsing int: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error("failed parsing float: {0}")]
    ParseFloatError(#[from] ParseFloatError),

    #[error("cannot parse config identity: {0}")]
    InvalidConfigIdentity(String),
    #[error("unknown parameter tag: {0}")]
    UnknownParameterTag(String),

    #[error("no raw series file found in: {0}")]
    NoSeriesFile(String),
    #[error("raw series is empty: {0}")]
    EmptySeries(String),

    #[error("cutoff step {step} (sample {index}) beyond series length {len}")]
    CutoffOutOfRange { step: u64, index: usize, len: usize },

    #[error("failed spawning external process `{0}`: {1}")]
    ProcessSpawnError(String, String),

    #[error("other error: {0}")]
    Other(String),
}
