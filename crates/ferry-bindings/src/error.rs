use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a single table cannot be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BindingError {
    /// Table has no columns to render
    #[error("table '{0}' has no columns")]
    EmptyTable(String),
    /// Name does not produce a usable identifier
    #[error("invalid name: {0}")]
    InvalidName(String),
}

/// Result type for binding generation
pub type BindingResult<T> = Result<T, BindingError>;
