//! Schema issue detection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ferry_core::TableDescriptor;

use super::relationships::TableRelationships;
use crate::dependencies::DependencyGraph;

/// Severity level for schema issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Foreign keys form a circular chain
    CircularDependency,
    /// Public table with row-level security disabled
    RlsDisabled,
    /// Table with no foreign keys and no referencing tables
    Orphaned,
}

/// A problem found in the analyzed schema
///
/// Issues are reported, never fixed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Tables involved, in cycle order for circular dependencies
    pub tables: Vec<String>,
    pub description: String,
    pub suggestion: String,
    /// Whether the planner can produce an operation that resolves it
    pub auto_fixable: bool,
}

pub(crate) fn identify_issues(
    tables: &[TableDescriptor],
    relationships: &BTreeMap<String, TableRelationships>,
    graph: &DependencyGraph,
    public_schema: &str,
) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    for cycle in graph.cycles() {
        let chain = if cycle.len() == 1 {
            format!("'{}' references itself", cycle[0])
        } else {
            let mut names = cycle.clone();
            names.push(cycle[0].clone());
            names.join(" -> ")
        };
        issues.push(SchemaIssue {
            kind: IssueKind::CircularDependency,
            severity: Severity::High,
            tables: cycle.clone(),
            description: format!("Circular foreign key chain: {}", chain),
            suggestion: "Make one reference in the chain nullable or deferrable, or move it to a link table"
                .to_string(),
            auto_fixable: false,
        });
    }

    for table in tables {
        if table.is_in_schema(public_schema) && !table.rls_enabled {
            issues.push(SchemaIssue {
                kind: IssueKind::RlsDisabled,
                severity: Severity::Critical,
                tables: vec![table.name.clone()],
                description: format!(
                    "Table '{}' is exposed in the '{}' schema without row-level security",
                    table.name, public_schema
                ),
                suggestion: format!(
                    "Enable row-level security on '{}' and add access policies",
                    table.name
                ),
                auto_fixable: true,
            });
        }
    }

    for (name, rel) in relationships {
        if rel.is_isolated() {
            issues.push(SchemaIssue {
                kind: IssueKind::Orphaned,
                severity: Severity::Medium,
                tables: vec![name.clone()],
                description: format!("Table '{}' has no relationships to other tables", name),
                suggestion: format!(
                    "Check whether '{}' should reference or be referenced by another table",
                    name
                ),
                auto_fixable: false,
            });
        }
    }

    issues
}
