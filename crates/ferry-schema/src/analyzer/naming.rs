//! Naming-convention audit

use serde::{Deserialize, Serialize};

use ferry_core::TableDescriptor;
use ferry_core::naming::{is_reserved_word, is_snake_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingIssueKind {
    /// Name is not lowercase snake_case
    NotSnakeCase,
    /// Name is a keyword in generated bindings or SQL
    ReservedWord,
}

/// One naming finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingIssue {
    pub kind: NamingIssueKind,
    pub table: String,
    /// Set when the finding concerns a column
    pub column: Option<String>,
    pub message: String,
}

impl NamingIssue {
    /// `table` or `table.column`
    pub fn location(&self) -> String {
        match &self.column {
            Some(column) => format!("{}.{}", self.table, column),
            None => self.table.clone(),
        }
    }
}

/// Result of the naming audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingReport {
    /// Every table name is snake_case
    pub tables_snake_case: bool,
    /// Every column name is snake_case
    pub columns_snake_case: bool,
    pub issues: Vec<NamingIssue>,
}

impl Default for NamingReport {
    fn default() -> Self {
        Self {
            tables_snake_case: true,
            columns_snake_case: true,
            issues: Vec::new(),
        }
    }
}

impl NamingReport {
    pub fn is_compliant(&self) -> bool {
        self.issues.is_empty()
    }
}

pub(crate) fn audit_naming(tables: &[TableDescriptor]) -> NamingReport {
    let mut report = NamingReport::default();

    for table in tables {
        if !is_snake_case(&table.name) {
            report.tables_snake_case = false;
            report.issues.push(NamingIssue {
                kind: NamingIssueKind::NotSnakeCase,
                table: table.name.clone(),
                column: None,
                message: format!("Table '{}' is not snake_case", table.name),
            });
        }
        if is_reserved_word(&table.name) {
            report.issues.push(NamingIssue {
                kind: NamingIssueKind::ReservedWord,
                table: table.name.clone(),
                column: None,
                message: format!(
                    "Table '{}' is a reserved word and will need renaming in bindings",
                    table.name
                ),
            });
        }

        for column in &table.columns {
            if !is_snake_case(&column.name) {
                report.columns_snake_case = false;
                report.issues.push(NamingIssue {
                    kind: NamingIssueKind::NotSnakeCase,
                    table: table.name.clone(),
                    column: Some(column.name.clone()),
                    message: format!(
                        "Column '{}.{}' is not snake_case",
                        table.name, column.name
                    ),
                });
            }
            if is_reserved_word(&column.name) {
                report.issues.push(NamingIssue {
                    kind: NamingIssueKind::ReservedWord,
                    table: table.name.clone(),
                    column: Some(column.name.clone()),
                    message: format!(
                        "Column '{}.{}' is a reserved word and will need renaming in bindings",
                        table.name, column.name
                    ),
                });
            }
        }
    }

    report
}
