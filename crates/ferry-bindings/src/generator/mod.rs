//! Binding generation over a schema snapshot

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferry_core::TableDescriptor;
use ferry_core::naming::{pluralize, to_field_name, to_type_name};
use ferry_migration::MigrationPlan;
use ferry_schema::SchemaAnalysis;

use crate::diff::{ChangeKind, TableChange, diff_analyses};
use crate::error::BindingError;
use crate::typescript::{
    INDEX_MODULE, Relation, SHARED_MODULE, TableModule, file_name, index_module, module_name,
    shared_module,
};

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingFile {
    /// Path relative to the output directory
    pub path: String,
    /// Table the file was rendered from; `None` for the shared and index modules
    pub table: Option<String>,
    pub contents: String,
}

/// Tables whose names map to the same type name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConflict {
    pub type_name: String,
    /// Qualified names, in snapshot order; only the first is rendered
    pub tables: Vec<String>,
}

/// A table that could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableError {
    pub table: String,
    pub error: BindingError,
}

/// Everything generated for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSet {
    /// Shared module first, index module last
    pub files: Vec<BindingFile>,
    pub conflicts: Vec<NamingConflict>,
    pub errors: Vec<TableError>,
    pub generated_at: DateTime<Utc>,
}

impl BindingSet {
    pub fn file(&self, path: &str) -> Option<&BindingFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn table_file(&self, table: &str) -> Option<&BindingFile> {
        self.files
            .iter()
            .find(|f| f.table.as_deref() == Some(table))
    }

    /// Number of rendered table modules
    pub fn table_count(&self) -> usize {
        self.files.iter().filter(|f| f.table.is_some()).count()
    }

    /// No per-table errors and no conflicts
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.conflicts.is_empty()
    }
}

/// Result of regenerating only what changed between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalBindings {
    pub changes: Vec<TableChange>,
    /// Modules for added and modified tables, plus the index
    pub files: Vec<BindingFile>,
    /// Paths of modules for removed tables
    pub removed_files: Vec<String>,
    pub conflicts: Vec<NamingConflict>,
    pub errors: Vec<TableError>,
}

impl IncrementalBindings {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Generates TypeScript bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingGenerator;

impl BindingGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Bindings for the analyzed tables as they will look once `plan` is applied
    pub fn generate(&self, analysis: &SchemaAnalysis, plan: Option<&MigrationPlan>) -> BindingSet {
        let tables = match plan {
            Some(plan) => plan.project(&analysis.tables),
            None => analysis.tables.clone(),
        };
        self.generate_tables(&tables)
    }

    pub fn generate_tables(&self, tables: &[TableDescriptor]) -> BindingSet {
        let mut groups: BTreeMap<String, Vec<&TableDescriptor>> = BTreeMap::new();
        let mut order: Vec<(&TableDescriptor, String)> = Vec::new();
        for table in tables {
            let type_name = to_type_name(&table.name);
            let group = groups.entry(type_name.clone()).or_default();
            if group.is_empty() {
                order.push((table, type_name));
            }
            group.push(table);
        }

        let conflicts: Vec<NamingConflict> = groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(type_name, members)| NamingConflict {
                type_name,
                tables: members.iter().map(|t| t.qualified_name()).collect(),
            })
            .collect();
        for conflict in &conflicts {
            tracing::warn!(
                type_name = %conflict.type_name,
                tables = ?conflict.tables,
                "Tables map to the same type name"
            );
        }

        // Only tables that render can be imported by their neighbours
        let known: HashMap<&str, &str> = order
            .iter()
            .filter(|(table, type_name)| {
                TableModule {
                    table,
                    type_name,
                    relations: Vec::new(),
                }
                .validate()
                .is_ok()
            })
            .map(|(table, type_name)| (table.name.as_str(), type_name.as_str()))
            .collect();

        let mut files = vec![BindingFile {
            path: file_name(SHARED_MODULE),
            table: None,
            contents: shared_module(),
        }];
        let mut errors = Vec::new();
        let mut modules = Vec::new();

        for (table, type_name) in &order {
            let module = TableModule {
                table,
                type_name,
                relations: relations(table, tables, &known),
            };
            match module.render() {
                Ok(contents) => {
                    let name = module_name(&table.name);
                    files.push(BindingFile {
                        path: file_name(&name),
                        table: Some(table.name.clone()),
                        contents,
                    });
                    modules.push(name);
                }
                Err(error) => {
                    tracing::warn!(table = %table.name, %error, "Skipping table binding");
                    errors.push(TableError {
                        table: table.name.clone(),
                        error,
                    });
                }
            }
        }

        files.push(BindingFile {
            path: file_name(INDEX_MODULE),
            table: None,
            contents: index_module(modules.iter().map(String::as_str)),
        });

        tracing::debug!(
            tables = modules.len(),
            errors = errors.len(),
            conflicts = conflicts.len(),
            "Generated bindings"
        );

        BindingSet {
            files,
            conflicts,
            errors,
            generated_at: Utc::now(),
        }
    }

    /// Regenerate only the modules of tables added or modified between
    /// `old` and `new`
    pub fn generate_incremental(
        &self,
        old: &SchemaAnalysis,
        new: &SchemaAnalysis,
    ) -> IncrementalBindings {
        let changes = diff_analyses(old, new);
        let touched: HashSet<&str> = changes
            .iter()
            .filter(|c| c.kind != ChangeKind::Removed)
            .map(|c| c.table.as_str())
            .collect();
        let removed_files = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Removed)
            .map(|c| file_name(&module_name(&c.table)))
            .collect();

        let full = self.generate_tables(&new.tables);
        let index_path = file_name(INDEX_MODULE);
        let files = full
            .files
            .into_iter()
            .filter(|f| match &f.table {
                Some(table) => touched.contains(table.as_str()),
                None => f.path == index_path,
            })
            .collect();

        IncrementalBindings {
            changes,
            files,
            removed_files,
            conflicts: full.conflicts,
            errors: full.errors,
        }
    }
}

/// Parent and child relations of `table` among the rendered tables
fn relations(
    table: &TableDescriptor,
    tables: &[TableDescriptor],
    known: &HashMap<&str, &str>,
) -> Vec<Relation> {
    let mut relations = Vec::new();
    // Relation fields share the view with the row's own fields
    let mut seen: HashSet<String> = table
        .columns
        .iter()
        .map(|c| to_field_name(&c.name))
        .collect();

    let mut references: Vec<(&str, &str)> = table
        .foreign_keys
        .iter()
        .filter_map(|fk| {
            fk.columns
                .first()
                .map(|c| (c.as_str(), fk.referenced_table.as_str()))
        })
        .collect();
    references.extend(table.columns.iter().filter_map(|c| {
        c.foreign_key
            .as_ref()
            .map(|fk| (c.name.as_str(), fk.table.as_str()))
    }));

    for (column, target) in references {
        let Some(type_name) = known.get(target) else {
            continue;
        };
        let stem = column
            .strip_suffix("_id")
            .filter(|s| !s.is_empty())
            .unwrap_or(target);
        let field = to_field_name(stem);
        if field.is_empty() || !seen.insert(field.clone()) {
            tracing::debug!(table = %table.name, %column, "Skipping colliding parent relation");
            continue;
        }
        relations.push(Relation {
            field,
            type_name: type_name.to_string(),
            module: module_name(target),
            many: false,
        });
    }

    for child in tables {
        let Some(type_name) = known.get(child.name.as_str()) else {
            continue;
        };
        if !child.referenced_tables().contains(&table.name.as_str()) {
            continue;
        }
        let field = to_field_name(&pluralize(&child.name));
        if field.is_empty() || !seen.insert(field.clone()) {
            tracing::debug!(table = %table.name, child = %child.name, "Skipping colliding child relation");
            continue;
        }
        relations.push(Relation {
            field,
            type_name: type_name.to_string(),
            module: module_name(&child.name),
            many: true,
        });
    }

    relations
}
