//! Error types for the berth service

use thiserror::Error;

/// Main error type for the berth service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    EngineError(#[from] bollard::errors::Error),

    #[error("Invalid upload: {0}")]
    UploadInvalid(String),

    #[error("Image build failed: {0}")]
    BuildFailed(String),

    #[error("No free port in the configured range")]
    NoPortAvailable,

    #[error("Container launch failed: {0}")]
    LaunchFailed(String),

    #[error("Cleanup partially failed: {0}")]
    CleanupPartialFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("State error: {0}")]
    StateError(String),
}
