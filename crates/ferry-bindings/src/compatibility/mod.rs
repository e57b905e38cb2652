//! Whether a plan keeps existing bindings valid


use serde::{Deserialize, Serialize};

use ferry_core::naming::{to_field_name, to_type_name};
use ferry_migration::{MigrationPlan, OperationKind, SchemaChange};
use ferry_schema::SchemaAnalysis;

/// A compatibility finding with a suggested fix; nothing is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityIssue {
    pub operation_id: String,
    pub table: String,
    pub description: String,
    pub suggested_fix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    /// Changes that break code compiled against the old bindings
    pub breaking_changes: Vec<CompatibilityIssue>,
    /// Type names that differ from an existing one only by case
    pub naming_warnings: Vec<CompatibilityIssue>,
}

impl CompatibilityReport {
    pub fn is_compatible(&self) -> bool {
        self.breaking_changes.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.breaking_changes.len() + self.naming_warnings.len()
    }
}

/// Check `plan` against bindings generated from `old`
pub fn check_compatibility(plan: &MigrationPlan, old: &SchemaAnalysis) -> CompatibilityReport {
    let mut report = CompatibilityReport::default();

    let existing: Vec<(String, &str)> = old
        .tables
        .iter()
        .map(|t| (to_type_name(&t.name), t.name.as_str()))
        .collect();

    for op in &plan.operations {
        match op.kind {
            OperationKind::AlterTable => {
                for removed in op.forward.removed_columns() {
                    let field = removed
                        .rsplit('.')
                        .next()
                        .map(to_field_name)
                        .unwrap_or_default();
                    report.breaking_changes.push(CompatibilityIssue {
                        operation_id: op.id.clone(),
                        table: op.table.clone(),
                        description: format!("Column {} is removed", removed),
                        suggested_fix: format!(
                            "Stop reading '{}' in consumers before applying, or keep the column and deprecate it",
                            field
                        ),
                    });
                }
            }
            OperationKind::CreateTable => {
                let SchemaChange::CreateTable { table } = &op.forward else {
                    continue;
                };
                let type_name = to_type_name(&table.name);
                for (existing_type, existing_table) in &existing {
                    if *existing_table == table.name
                        || !existing_type.eq_ignore_ascii_case(&type_name)
                    {
                        continue;
                    }
                    report.naming_warnings.push(CompatibilityIssue {
                        operation_id: op.id.clone(),
                        table: table.name.clone(),
                        description: format!(
                            "Type '{}' for new table '{}' collides with '{}' from table '{}'",
                            type_name, table.name, existing_type, existing_table
                        ),
                        suggested_fix: format!(
                            "Rename table '{}' so its type name is distinct",
                            table.name
                        ),
                    });
                }
            }
            _ => {}
        }
    }

    if !report.is_compatible() {
        tracing::warn!(
            plan = %plan.id,
            breaking = report.breaking_changes.len(),
            "Plan breaks existing bindings"
        );
    }

    report
}
