//! Error types for the milo-discovery crate.

/// Errors that can occur during discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The mDNS daemon could not be created or shut down
    #[error("mDNS daemon error: {0}")]
    Daemon(String),

    /// Browsing the service type failed
    #[error("Browse error: {0}")]
    Browse(String),
}

/// Convenience type alias for Results using DiscoveryError.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
