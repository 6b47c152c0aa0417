#![forbid(unsafe_code)]

use std::path::PathBuf;

use showmirror_runtime::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Exit code for bad arguments or configuration.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for unreadable input or unwritable output.
pub const EXIT_IO: i32 = 3;
/// Exit code for input that does not decode.
pub const EXIT_MALFORMED: i32 = 4;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{path}: malformed composition: {source}")]
    Composition {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}:{line}: {message}")]
    Trace {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl ReplayError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::Config(_) => EXIT_USAGE,
            Self::Read { .. } | Self::Output(_) => EXIT_IO,
            Self::Composition { .. } | Self::Trace { .. } => EXIT_MALFORMED,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn trace(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Trace {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
