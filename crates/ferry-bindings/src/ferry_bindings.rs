//! Ferry Bindings - TypeScript bindings that follow the schema
//!
//! This crate provides:
//! - Per-table TypeScript modules plus shared and index modules
//! - Positional snapshot diffs and incremental regeneration
//! - Compatibility checks of a plan against existing bindings

pub mod compatibility;
pub mod diff;
mod error;
pub mod generator;
pub mod typescript;

pub use compatibility::{CompatibilityIssue, CompatibilityReport, check_compatibility};
pub use diff::{ChangeKind, TableChange, diff_analyses, diff_tables};
pub use error::{BindingError, BindingResult};
pub use generator::{
    BindingFile, BindingGenerator, BindingSet, IncrementalBindings, NamingConflict, TableError,
};
