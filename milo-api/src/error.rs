//! Error types for the milo-api crate.

/// Errors that can occur when talking to the device's HTTP API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(String),

    /// The request timed out
    #[error("Request timed out")]
    Timeout,

    /// The device answered with a non-200 status
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// The response body could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The base URL could not be constructed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::MalformedResponse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Convenience type alias for Results using ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;
