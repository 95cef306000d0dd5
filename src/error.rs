
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GloveError>;

#[derive(Debug, Error)]
pub enum GloveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    // line numbers are 1-based
    #[error("malformed vocabulary line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("usage error: {0}")]
    Usage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GloveError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        GloveError::MalformedLine { line, reason: reason.into() }
    }
}

impl From<bincode::Error> for GloveError {
    fn from(e: bincode::Error) -> Self {
        // keep io failures in the io bucket, they are not codec problems
        match *e {
            bincode::ErrorKind::Io(io_err) => GloveError::Io(io_err),
            other => GloveError::Serialization(other.to_string()),
        }
    }
}

impl From<csv::Error> for GloveError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            if let csv::ErrorKind::Io(io_err) = e.into_kind() {
                return GloveError::Io(io_err);
            }
            return GloveError::Serialization("csv io error".to_string());
        }
        GloveError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for GloveError {
    fn from(e: serde_json::Error) -> Self {
        GloveError::Serialization(e.to_string())
    }
}

impl From<ndarray_npy::WriteNpyError> for GloveError {
    fn from(e: ndarray_npy::WriteNpyError) -> Self {
        match e {
            ndarray_npy::WriteNpyError::Io(io_err) => GloveError::Io(io_err),
            other => GloveError::Serialization(other.to_string()),
        }
    }
}

impl From<ndarray_npy::ReadNpyError> for GloveError {
    fn from(e: ndarray_npy::ReadNpyError) -> Self {
        match e {
            ndarray_npy::ReadNpyError::Io(io_err) => GloveError::Io(io_err),
            other => GloveError::Serialization(other.to_string()),
        }
    }
}
