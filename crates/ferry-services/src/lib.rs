//! Ferry Services Layer
//!
//! This crate orchestrates a full import run on top of the domain crates and
//! returns a single serializable result that callers render however they like.
//!
//! # Architecture
//!
//! ```text
//! Binary (ferry-cli)
//!     ↓
//! Service Layer (ferry-services) ← This crate
//!     ↓
//! Domain Layer (ferry-schema, ferry-migration, ferry-bindings)
//!     ↓
//! Infrastructure Layer (ferry-core)
//! ```
//!
//! # Services
//!
//! - [`ImportService`] - Analyze, match, plan, check and generate bindings for a batch
//!
//! # Design Principles
//!
//! 1. **Never fail a run** - Every run returns a complete [`ImportResult`]
//! 2. **Return ViewModels** - Callers get DTOs, not pipeline internals
//! 3. **Injected components** - No globals; the schema source and every stage are supplied

mod error;
mod import_service;
mod view_models;

pub use error::{ServiceError, ServiceResult};
pub use import_service::{APPROVAL_CONFIDENCE, DEFAULT_TABLE_NAME, ImportService, table_name_for};
pub use view_models::{
    ExecutionReport, ImportPreferences, ImportResult, ImportStatus, OperationOutcome,
};
