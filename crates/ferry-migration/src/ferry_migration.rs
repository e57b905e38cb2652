//! Ferry Migration - plans the schema changes an import needs
//!
//! This crate provides:
//! - Structured, reversible migration operations
//! - Dependency-ordered migration plans with duration and backup estimates
//! - PostgreSQL rendering of operation intents
//! - Safety checks over a finished plan

mod error;
pub mod operation;
pub mod plan;
pub mod planner;
pub mod render;
pub mod safety;

pub use error::{MigrationError, MigrationResult};
pub use operation::{MigrationOperation, OperationKind, SchemaChange, default_priority};
pub use plan::{EstimatedDuration, MigrationPlan};
pub use planner::{MigrationPlanner, PlannerConfig};
pub use render::{MigrationConfig, SqlRenderer, quote};
pub use safety::{
    PERFORMANCE_IMPACT_LIMIT, SafetyCategory, SafetyCheckResult, SafetyChecker,
    performance_impact,
};
