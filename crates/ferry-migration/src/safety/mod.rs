//! Plan safety checks
//!
//! Four stateless checks run against every plan. A failed check carrying the
//! blocking flag prevents automatic execution.


use serde::{Deserialize, Serialize};

use ferry_schema::SchemaAnalysis;

use crate::operation::OperationKind;
use crate::plan::MigrationPlan;

/// Plans touching at least this percentage of existing tables fail the
/// performance check
pub const PERFORMANCE_IMPACT_LIMIT: f64 = 50.0;

/// What a safety check looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    Dependency,
    DataIntegrity,
    Performance,
    Security,
}

impl SafetyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::DataIntegrity => "data_integrity",
            Self::Performance => "performance",
            Self::Security => "security",
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one safety check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    pub category: SafetyCategory,
    pub passed: bool,
    pub description: String,
    /// Set when the check failed
    pub warning: Option<String>,
    pub blocking: bool,
}

impl SafetyCheckResult {
    fn pass(category: SafetyCategory, description: impl Into<String>, blocking: bool) -> Self {
        Self {
            category,
            passed: true,
            description: description.into(),
            warning: None,
            blocking,
        }
    }

    fn fail(
        category: SafetyCategory,
        description: impl Into<String>,
        warning: impl Into<String>,
        blocking: bool,
    ) -> Self {
        Self {
            category,
            passed: false,
            description: description.into(),
            warning: Some(warning.into()),
            blocking,
        }
    }

    /// Failed and blocks automatic execution
    pub fn is_blocking_failure(&self) -> bool {
        !self.passed && self.blocking
    }

    /// Failed without blocking
    pub fn is_warning(&self) -> bool {
        !self.passed && !self.blocking
    }
}

/// Runs the safety checks
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyChecker;

impl SafetyChecker {
    pub fn new() -> Self {
        Self
    }

    /// Run every check; results are in dependency, data-integrity,
    /// performance, security order
    pub fn check(&self, plan: &MigrationPlan, analysis: &SchemaAnalysis) -> Vec<SafetyCheckResult> {
        let results = vec![
            check_dependencies(analysis),
            check_data_integrity(plan),
            check_performance(plan, analysis),
            check_security(plan, analysis),
        ];

        let failed = results.iter().filter(|r| !r.passed).count();
        if failed > 0 {
            tracing::warn!(plan = %plan.id, failed, "Safety checks failed");
        } else {
            tracing::debug!(plan = %plan.id, "All safety checks passed");
        }

        results
    }
}

fn check_dependencies(analysis: &SchemaAnalysis) -> SafetyCheckResult {
    let description = "No circular foreign-key dependencies";
    let circular = analysis.dependency_graph.circular_tables();
    if circular.is_empty() {
        SafetyCheckResult::pass(SafetyCategory::Dependency, description, false)
    } else {
        SafetyCheckResult::fail(
            SafetyCategory::Dependency,
            description,
            format!(
                "Circular dependencies involve {}; apply order for these tables is not guaranteed",
                circular.join(", ")
            ),
            false,
        )
    }
}

fn check_data_integrity(plan: &MigrationPlan) -> SafetyCheckResult {
    let description = "No high-risk operations";
    let risky: Vec<&str> = plan
        .operations
        .iter()
        .filter(|op| op.is_high_risk())
        .map(|op| op.id.as_str())
        .collect();
    if risky.is_empty() {
        SafetyCheckResult::pass(SafetyCategory::DataIntegrity, description, true)
    } else {
        SafetyCheckResult::fail(
            SafetyCategory::DataIntegrity,
            description,
            format!("High-risk operations may lose data: {}", risky.join(", ")),
            true,
        )
    }
}

/// Operations per existing table, as a percentage; 0 with no tables
pub fn performance_impact(plan: &MigrationPlan, analysis: &SchemaAnalysis) -> f64 {
    let tables = analysis.table_count();
    if tables == 0 {
        return 0.0;
    }
    plan.len() as f64 / tables as f64 * 100.0
}

fn check_performance(plan: &MigrationPlan, analysis: &SchemaAnalysis) -> SafetyCheckResult {
    let impact = performance_impact(plan, analysis);
    let description = format!("Estimated impact {:.0}% of existing tables", impact);
    if impact < PERFORMANCE_IMPACT_LIMIT {
        SafetyCheckResult::pass(SafetyCategory::Performance, description, false)
    } else {
        SafetyCheckResult::fail(
            SafetyCategory::Performance,
            description,
            format!(
                "{} operation(s) over {} table(s); apply during a maintenance window",
                plan.len(),
                analysis.table_count()
            ),
            false,
        )
    }
}

fn check_security(plan: &MigrationPlan, analysis: &SchemaAnalysis) -> SafetyCheckResult {
    let description = "Row-level security covers every table";
    let unprotected: Vec<&str> = analysis
        .tables_without_rls()
        .into_iter()
        .map(|t| t.name.as_str())
        .collect();
    if plan.has_kind(OperationKind::AddAccessPolicy) || unprotected.is_empty() {
        SafetyCheckResult::pass(SafetyCategory::Security, description, false)
    } else {
        SafetyCheckResult::fail(
            SafetyCategory::Security,
            description,
            format!("Row-level security is disabled on {}", unprotected.join(", ")),
            false,
        )
    }
}
