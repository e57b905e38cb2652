//! Migration plans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ferry_core::{RiskLevel, TableDescriptor};

use crate::operation::{MigrationOperation, OperationKind};

/// Estimated plan duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedDuration {
    pub seconds: u64,
    /// Bucketed for display: seconds, minutes or hours
    pub display: String,
}

impl EstimatedDuration {
    pub fn from_seconds(seconds: u64) -> Self {
        let display = if seconds < 60 {
            format!("{} seconds", seconds)
        } else if seconds < 3600 {
            format!("{} minutes", seconds.div_ceil(60))
        } else {
            format!("{:.1} hours", seconds as f64 / 3600.0)
        };
        Self { seconds, display }
    }
}

/// An ordered, reversible set of operations
///
/// Built fresh per import request and not modified once safety-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Dependencies always precede their dependents
    pub operations: Vec<MigrationOperation>,
    pub estimated_duration: EstimatedDuration,
    pub backup_required: bool,
    /// Operation ids in rollback order
    pub rollback_sequence: Vec<String>,
    pub preflight_checks: Vec<String>,
    pub postflight_validations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MigrationPlan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operation(&self, id: &str) -> Option<&MigrationOperation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Position of an operation in the applied order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.operations.iter().position(|op| op.id == id)
    }

    pub fn has_kind(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind == kind)
    }

    pub fn operations_of(&self, kind: OperationKind) -> impl Iterator<Item = &MigrationOperation> {
        self.operations.iter().filter(move |op| op.kind == kind)
    }

    pub fn has_high_risk(&self) -> bool {
        self.operations.iter().any(|op| op.is_high_risk())
    }

    /// Highest risk of any operation, `Low` for an empty plan
    pub fn max_risk(&self) -> RiskLevel {
        self.operations
            .iter()
            .map(|op| op.risk)
            .max()
            .unwrap_or_default()
    }

    /// Operations in the order their rollbacks run
    pub fn rollback_operations(&self) -> impl Iterator<Item = &MigrationOperation> {
        self.rollback_sequence
            .iter()
            .filter_map(|id| self.operation(id))
    }

    /// The snapshot as it would look after applying every operation
    pub fn project(&self, tables: &[TableDescriptor]) -> Vec<TableDescriptor> {
        let mut projected = tables.to_vec();
        for op in &self.operations {
            op.forward.apply(&mut projected);
        }
        projected
    }
}
