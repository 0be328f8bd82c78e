//! Error types for host capabilities.

/// Errors raised by host capability implementations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Content or transient storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote request failed
    #[error("Network error: {0}")]
    Network(String),

    /// Capability is not provided by this host
    #[error("Capability unavailable: {0}")]
    Unavailable(&'static str),

    /// Stored value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
