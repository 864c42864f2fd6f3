use std::num::ParseIntError;
use std::path::PathBuf;

use crate::fsutil;

/// Errors raised while parsing a kernel statistics source.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("statistics data ended unexpectedly")]
    UnexpectedEof,

    #[error("truncated statistics line: expected {expected} fields, found {found}")]
    TruncatedLine { expected: usize, found: usize },

    #[error("invalid value `{value}` at line {line}: {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),

    #[error("failed to parse statistics source `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to query device statistics: {source}")]
    Syscall {
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
