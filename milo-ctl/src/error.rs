use thiserror::Error;

/// Errors from the controller facade.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background worker is gone and can no longer accept commands
    #[error("Background worker disconnected")]
    WorkerDisconnected,
}

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;
