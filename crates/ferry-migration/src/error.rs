use thiserror::Error;

/// Errors that can occur while rendering migration SQL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// Change cannot be expressed for the target object
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// Invalid schema element
    #[error("invalid schema element: {0}")]
    InvalidElement(String),
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
