use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse failure category carried across every I/O boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    Unavailable,
    InvalidInput,
    BackendError,
    UnsupportedFormat,
    InvalidConfig,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Backend(_) => ErrorKind::BackendError,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message without the category prefix, for user-facing responses.
    pub fn message(&self) -> &str {
        match self {
            Error::Validation(m)
            | Error::Unavailable(m)
            | Error::InvalidInput(m)
            | Error::Backend(m)
            | Error::UnsupportedFormat(m)
            | Error::InvalidConfig(m)
            | Error::Internal(m) => m,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Unavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
