use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A request field that cannot be turned into a safe CLI call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn required(field: &str) -> Self {
        Self(format!("{field} is required"))
    }
}

/// Position of a JSON5 syntax error, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SyntaxLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid JSON5: {message}")]
    Invalid {
        message: String,
        location: Option<SyntaxLocation>,
    },
    #[error("Config was modified since you loaded it. Refresh and try again.")]
    Conflict { expected: String, actual: String },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn from_json5(err: json5::Error) -> Self {
        match err {
            json5::Error::Message { msg, location } => Self::Invalid {
                message: msg,
                location: location.map(|l| SyntaxLocation {
                    line: l.line,
                    column: l.column,
                }),
            },
        }
    }
}
