//! Error types for the ruxtab library

use std::io;

/// Library error type for ruxtab operations
#[derive(Debug, thiserror::Error)]
pub enum RuxError {
    /// The file does not start with a known Guitar Pro 5 version string
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// A read ran past the end of the buffer
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEndOfInput { offset: usize },

    /// Parsing error when reading Guitar Pro files
    #[error("parsing error: {0}")]
    ParsingError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<io::Error> for RuxError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}
