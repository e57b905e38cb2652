//! Ferry Core - Core abstractions and types for the import planning engine
//!
//! This crate provides the fundamental types that all other Ferry crates
//! depend on. It defines:
//!
//! - `SchemaSource` - Trait for anything that can produce a schema snapshot
//! - `TableDescriptor`, `ColumnInfo`, etc. - The structured schema model
//! - `Value` and `Record` - The tagged value model for incoming records
//! - `ImportConfig` - Passive configuration read once per process
//! - Naming helpers shared by the analyzer and the binding generator

mod config;
mod error;
pub mod naming;
mod schema;
mod types;

pub use config::*;
pub use error::*;
pub use schema::*;
pub use types::*;
