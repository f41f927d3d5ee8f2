//! Error types for the co2stream service.

use std::result;
use thiserror::Error;

/// A specialized Result type for co2stream operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for co2stream operations.
///
/// These cover startup, training and persistence. Faults on the request
/// path are expressed as [`PredictError`] and never leave the orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset missing, unreadable or lacking required columns
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Fitting failed (degenerate data, singular system)
    #[error("Training error: {0}")]
    Training(String),

    /// Persisted model artifact could not be read or written
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote predictor transport errors
    #[error("Remote error: {0}")]
    Remote(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Dataset(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Artifact(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}

/// Outcome of a single prediction attempt that did not yield a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("Model produced a non-finite value")]
    NonFinite,

    #[error("Remote prediction failed: {0}")]
    Remote(String),

    #[error("Prediction timed out after {0}ms")]
    Timeout(u64),
}
