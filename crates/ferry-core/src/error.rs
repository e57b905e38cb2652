//! Error types for Ferry

use thiserror::Error;

/// Core error type for Ferry operations
#[derive(Error, Debug)]
pub enum FerryError {
    /// The schema source was unreachable or returned malformed metadata
    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl FerryError {
    /// Returns true if this error came from schema introspection
    pub fn is_introspection(&self) -> bool {
        matches!(self, FerryError::Introspection(_))
    }
}

/// Result type alias for Ferry operations
pub type Result<T> = std::result::Result<T, FerryError>;
