//! Error types for the directory index.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building or watching the directory index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Root directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Invalid file filter pattern.
    #[error("invalid filter pattern: {0:?}")]
    InvalidPattern(String),

    /// No Tokio runtime to drive the event task.
    #[error("no tokio runtime available to process file events")]
    NoRuntime,

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
