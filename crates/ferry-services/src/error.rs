use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Schema introspection failed: {0}")]
    Introspection(String),

    /// Applying a plan against a live store is outside this engine's contract
    #[error(
        "Only dry runs are supported; applying a plan requires transactional safety this engine does not provide"
    )]
    DryRunOnly,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
