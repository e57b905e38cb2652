use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ferry_bindings::BindingSet;
use ferry_migration::{MigrationPlan, SafetyCheckResult};
use ferry_schema::{ImportDataPattern, SchemaAnalysis};

/// Overall outcome of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Plan can be applied
    Success,
    /// Plan can be applied once non-blocking findings are reviewed
    Warning,
    /// A person has to review the plan or the mappings first
    RequiresApproval,
    /// A blocking safety failure or introspection failure
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::RequiresApproval => "requires_approval",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller preferences for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPreferences {
    /// Always stop for manual review
    pub require_approval: bool,
    /// Caller is willing to apply plans within the configured risk ceiling
    /// without review
    pub auto_apply: bool,
    pub skip_safety_checks: bool,
    /// Overrides the configured binding toggle
    pub generate_bindings: Option<bool>,
    /// Name for a new table; derived from the source label when unset
    pub target_table: Option<String>,
}

impl ImportPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_approval(mut self) -> Self {
        self.require_approval = true;
        self
    }

    pub fn with_auto_apply(mut self) -> Self {
        self.auto_apply = true;
        self
    }

    pub fn without_safety_checks(mut self) -> Self {
        self.skip_safety_checks = true;
        self
    }

    pub fn with_bindings(mut self, generate: bool) -> Self {
        self.generate_bindings = Some(generate);
        self
    }

    pub fn with_target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }
}

/// Everything a run produced; always fully populated, even on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub session_id: Uuid,
    pub source_label: String,
    pub analysis: SchemaAnalysis,
    /// Patterns that met the confidence threshold
    pub patterns: Vec<ImportDataPattern>,
    pub plan: Option<MigrationPlan>,
    pub safety_checks: Vec<SafetyCheckResult>,
    pub bindings: Option<BindingSet>,
    pub recommendations: Vec<String>,
    pub status: ImportStatus,
    pub next_steps: Vec<String>,
    /// Diagnostic for a failed run
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ImportResult {
    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Success
    }

    pub fn blocking_failures(&self) -> impl Iterator<Item = &SafetyCheckResult> {
        self.safety_checks
            .iter()
            .filter(|c| c.is_blocking_failure())
    }
}

/// Result of rendering one operation during a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub operation_id: String,
    pub forward_sql: Option<String>,
    pub rollback_sql: Option<String>,
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Dry-run report for a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub plan_id: Uuid,
    pub dry_run: bool,
    /// One per operation, in plan order
    pub outcomes: Vec<OperationOutcome>,
    /// Operation ids in the order their rollbacks run
    pub rollback_sequence: Vec<String>,
    /// Rollback SQL in rollback order, for operations that rendered
    pub rollback_script: Vec<String>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}
