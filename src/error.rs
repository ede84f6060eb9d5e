use std::io;
use thiserror::Error;

/// Custom error type for InferGuard
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),
}

/// Result type alias for InferGuard
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        GuardError::Config(msg.into())
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        GuardError::Runtime(msg.into())
    }

    pub fn probe<S: Into<String>>(msg: S) -> Self {
        GuardError::Probe(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        GuardError::GpuNotAvailable(msg.into())
    }
}
