//! Error types for the milo-stream crate.

/// Errors from the socket layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The TCP connection could not be established in time
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The WebSocket handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A read or write on an established socket failed
    #[error("Socket error: {0}")]
    Socket(String),

    /// The endpoint URL could not be constructed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Convenience type alias for Results using SessionError.
pub type Result<T> = std::result::Result<T, SessionError>;
