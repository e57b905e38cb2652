//! Analysis result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ferry_core::TableDescriptor;

use crate::analyzer::{EnhancementSuggestion, NamingReport, SchemaIssue, TableRelationships};
use crate::dependencies::DependencyGraph;

/// Everything the analyzer derived from one schema snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAnalysis {
    pub tables: Vec<TableDescriptor>,
    /// Keyed by table name
    pub relationships: BTreeMap<String, TableRelationships>,
    pub dependency_graph: DependencyGraph,
    pub naming: NamingReport,
    pub issues: Vec<SchemaIssue>,
    pub suggestions: Vec<EnhancementSuggestion>,
    pub analyzed_at: DateTime<Utc>,
}

impl SchemaAnalysis {
    /// Well-formed placeholder used when introspection fails
    pub fn empty() -> Self {
        Self {
            tables: Vec::new(),
            relationships: BTreeMap::new(),
            dependency_graph: DependencyGraph::new(),
            naming: NamingReport::default(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Tables with row-level security disabled
    pub fn tables_without_rls(&self) -> Vec<&TableDescriptor> {
        self.tables.iter().filter(|t| !t.rls_enabled).collect()
    }

    pub fn relationships_of(&self, table: &str) -> Option<&TableRelationships> {
        self.relationships.get(table)
    }
}
