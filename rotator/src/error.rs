//! Error types for rotators and the rotator registry.

use thiserror::Error;

/// Result type alias for rotator operations.
pub type Result<T> = std::result::Result<T, RotatorError>;

/// Errors that can occur while creating rotators.
#[derive(Error, Debug)]
pub enum RotatorError {
    /// No Tokio runtime to drive the rotation timer.
    #[error("no tokio runtime available to drive the rotation timer")]
    NoRuntime,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
