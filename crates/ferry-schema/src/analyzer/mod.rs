//! Schema analyzer
//!
//! Turns a schema snapshot into a [`SchemaAnalysis`]: relationship map,
//! dependency graph, naming audit, issue list and enhancement suggestions.

mod issues;
mod naming;
mod relationships;
mod suggestions;

#[cfg(test)]
mod tests;

pub use issues::{IssueKind, SchemaIssue, Severity};
pub use naming::{NamingIssue, NamingIssueKind, NamingReport};
pub use relationships::{ManyToManyHint, TableRelationships};
pub use suggestions::{EnhancementSuggestion, Priority, SuggestionKind};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use ferry_core::{FerryError, Result, SchemaSource, TableDescriptor, validate_references};

use crate::analysis::SchemaAnalysis;
use crate::dependencies::DependencyGraph;

/// Configuration for the schema analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Namespace exposed to clients; tables here must have row-level security
    pub public_schema: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            public_schema: "public".to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_schema(mut self, schema: impl Into<String>) -> Self {
        self.public_schema = schema.into();
        self
    }
}

/// Analyzes schema snapshots
#[derive(Debug, Clone, Default)]
pub struct SchemaAnalyzer {
    config: AnalyzerConfig,
}

impl SchemaAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Load the snapshot from `source` and analyze it
    ///
    /// Source failures and malformed metadata are reported as
    /// `FerryError::Introspection`.
    pub async fn analyze(&self, source: &dyn SchemaSource) -> Result<SchemaAnalysis> {
        let tables = source.load_tables().await.map_err(|e| {
            if e.is_introspection() {
                e
            } else {
                FerryError::Introspection(format!(
                    "schema source '{}' failed: {}",
                    source.name(),
                    e
                ))
            }
        })?;
        tracing::debug!(source = source.name(), tables = tables.len(), "Loaded schema snapshot");
        self.analyze_tables(tables)
    }

    /// Analyze a snapshot already in memory
    pub fn analyze_tables(&self, tables: Vec<TableDescriptor>) -> Result<SchemaAnalysis> {
        for table in &tables {
            table.validate()?;
        }
        validate_references(&tables)?;

        let dependency_graph = DependencyGraph::from_tables(&tables);
        let relationships = relationships::map_relationships(&tables, &dependency_graph);
        let naming = naming::audit_naming(&tables);
        let issues = issues::identify_issues(
            &tables,
            &relationships,
            &dependency_graph,
            &self.config.public_schema,
        );
        let suggestions = suggestions::suggest_enhancements(&tables, &self.config.public_schema);

        if dependency_graph.has_cycles() {
            tracing::warn!(
                cycles = dependency_graph.cycles().len(),
                "Circular foreign key chains detected"
            );
        }
        tracing::debug!(
            tables = tables.len(),
            issues = issues.len(),
            suggestions = suggestions.len(),
            "Schema analysis complete"
        );

        Ok(SchemaAnalysis {
            tables,
            relationships,
            dependency_graph,
            naming,
            issues,
            suggestions,
            analyzed_at: Utc::now(),
        })
    }
}
