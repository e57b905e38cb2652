//! Table-level differences between two schema snapshots
//!
//! Columns are compared by position, so a pure reorder reports the table as
//! modified.


use serde::{Deserialize, Serialize};

use ferry_core::{ColumnInfo, TableDescriptor};
use ferry_schema::SchemaAnalysis;

/// How a table changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

/// A changed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChange {
    pub table: String,
    pub schema: String,
    pub kind: ChangeKind,
    /// What differs, for modified tables
    pub details: Vec<String>,
}

impl TableChange {
    fn new(table: &TableDescriptor, kind: ChangeKind, details: Vec<String>) -> Self {
        Self {
            table: table.name.clone(),
            schema: table.schema.clone(),
            kind,
            details,
        }
    }
}

pub fn diff_analyses(old: &SchemaAnalysis, new: &SchemaAnalysis) -> Vec<TableChange> {
    diff_tables(&old.tables, &new.tables)
}

/// Added and modified tables in `new` order, then removed tables in `old`
/// order
pub fn diff_tables(old: &[TableDescriptor], new: &[TableDescriptor]) -> Vec<TableChange> {
    fn find(tables: &[TableDescriptor], t: &TableDescriptor) -> Option<usize> {
        tables
            .iter()
            .position(|o| o.name == t.name && o.schema == t.schema)
    }

    let mut changes = Vec::new();
    for table in new {
        match find(old, table) {
            None => changes.push(TableChange::new(table, ChangeKind::Added, Vec::new())),
            Some(i) => {
                let details = column_differences(&old[i].columns, &table.columns);
                if !details.is_empty() {
                    changes.push(TableChange::new(table, ChangeKind::Modified, details));
                }
            }
        }
    }
    for table in old {
        if find(new, table).is_none() {
            changes.push(TableChange::new(table, ChangeKind::Removed, Vec::new()));
        }
    }
    changes
}

fn column_differences(old: &[ColumnInfo], new: &[ColumnInfo]) -> Vec<String> {
    let mut details = Vec::new();
    if old.len() != new.len() {
        details.push(format!("column count {} -> {}", old.len(), new.len()));
    }
    for (position, (before, after)) in old.iter().zip(new).enumerate() {
        if before.name != after.name {
            details.push(format!(
                "column {}: name {} -> {}",
                position, before.name, after.name
            ));
        }
        if before.data_type != after.data_type {
            details.push(format!(
                "column {}: type {} -> {}",
                position, before.data_type, after.data_type
            ));
        }
        if before.nullable != after.nullable {
            details.push(format!(
                "column {}: nullable {} -> {}",
                position, before.nullable, after.nullable
            ));
        }
    }
    details
}
