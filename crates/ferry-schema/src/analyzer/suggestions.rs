//! Enhancement suggestions

use serde::{Deserialize, Serialize};

use ferry_core::TableDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Index a foreign key that no index serves
    AddIndex,
    /// Turn on row-level security
    EnableRls,
}

/// A proposed schema improvement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementSuggestion {
    pub kind: SuggestionKind,
    pub table: String,
    pub schema: String,
    /// Columns to index; empty for access-control suggestions
    pub columns: Vec<String>,
    pub priority: Priority,
    pub rationale: String,
    pub sql_preview: String,
}

impl EnhancementSuggestion {
    /// Name used for a generated index: `idx_<table>_<columns>`
    pub fn index_name(&self) -> String {
        format!("idx_{}_{}", self.table, self.columns.join("_"))
    }
}

/// Foreign-key column sets of a table, from declared constraints and
/// column-level references, deduplicated
fn foreign_key_column_sets(table: &TableDescriptor) -> Vec<Vec<String>> {
    let mut sets: Vec<Vec<String>> = Vec::new();
    for fk in &table.foreign_keys {
        if !sets.contains(&fk.columns) {
            sets.push(fk.columns.clone());
        }
    }
    for column in table.columns.iter().filter(|c| c.is_foreign_key()) {
        let set = vec![column.name.clone()];
        if !sets.contains(&set) {
            sets.push(set);
        }
    }
    sets
}

fn is_indexed(table: &TableDescriptor, columns: &[String]) -> bool {
    if table.indexes.iter().any(|idx| idx.covers(columns)) {
        return true;
    }
    let pk: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| c.name.as_str())
        .collect();
    pk.len() == 1 && columns.len() == 1 && pk[0] == columns[0]
}

pub(crate) fn suggest_enhancements(
    tables: &[TableDescriptor],
    public_schema: &str,
) -> Vec<EnhancementSuggestion> {
    let mut suggestions = Vec::new();

    for table in tables {
        for columns in foreign_key_column_sets(table) {
            if is_indexed(table, &columns) {
                continue;
            }
            let suggestion = EnhancementSuggestion {
                kind: SuggestionKind::AddIndex,
                table: table.name.clone(),
                schema: table.schema.clone(),
                columns: columns.clone(),
                priority: Priority::Medium,
                rationale: format!(
                    "Foreign key ({}) on '{}' has no index; joins and cascading deletes will scan the table",
                    columns.join(", "),
                    table.name
                ),
                sql_preview: String::new(),
            };
            let sql_preview = format!(
                "CREATE INDEX {} ON {} ({});",
                suggestion.index_name(),
                table.qualified_name(),
                columns.join(", ")
            );
            suggestions.push(EnhancementSuggestion {
                sql_preview,
                ..suggestion
            });
        }
    }

    for table in tables {
        if table.is_in_schema(public_schema) && !table.rls_enabled {
            suggestions.push(EnhancementSuggestion {
                kind: SuggestionKind::EnableRls,
                table: table.name.clone(),
                schema: table.schema.clone(),
                columns: Vec::new(),
                priority: Priority::High,
                rationale: format!(
                    "'{}' is readable through the public API without row-level security",
                    table.name
                ),
                sql_preview: format!(
                    "ALTER TABLE {} ENABLE ROW LEVEL SECURITY;",
                    table.qualified_name()
                ),
            });
        }
    }

    suggestions
}
