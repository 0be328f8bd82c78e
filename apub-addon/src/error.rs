//! Error types for the add-on.

use apub_host::HostError;

/// Error types for add-on operations.
#[derive(Debug, thiserror::Error)]
pub enum AddonError {
    /// A host capability failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Stored or wire JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Configuration is inconsistent
    #[error("Invalid config: {0}")]
    Config(String),

    /// A pipeline stage could not complete
    #[error("Transform stage {stage} failed: {reason}")]
    Stage { stage: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, AddonError>;
