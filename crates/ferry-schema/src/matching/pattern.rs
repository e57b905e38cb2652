//! Import data patterns

use serde::{Deserialize, Serialize};

use super::guesser::ForeignKeyGuess;
use super::inference::{ConstraintHint, InferredType};

/// How a field was matched to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Case-insensitive equality
    Exact,
    /// Substring containment in either direction
    Partial,
    /// No column corresponds; the field becomes a new column
    Unmatched,
}

/// One incoming field and where it lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    /// Matched column, `None` when unmatched
    pub column: Option<String>,
    pub match_kind: MatchKind,
    pub inferred_type: InferredType,
    pub constraints: Vec<ConstraintHint>,
    pub foreign_key: Option<ForeignKeyGuess>,
}

impl FieldMapping {
    pub fn is_matched(&self) -> bool {
        self.column.is_some()
    }

    /// Column the field is written to: the matched column, or the field
    /// name itself as a new column
    pub fn target_column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.source_field)
    }

    pub fn has_constraint(&self, hint: ConstraintHint) -> bool {
        self.constraints.contains(&hint)
    }
}

/// A scored hypothesis that a batch belongs to a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDataPattern {
    pub table_name: String,
    /// In [0, 1]
    pub confidence: f64,
    /// The table does not exist yet
    pub is_new_table: bool,
    pub mappings: Vec<FieldMapping>,
    pub relationship_hints: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ImportDataPattern {
    pub fn unmatched_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(|m| !m.is_matched())
    }

    pub fn mapping(&self, field: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.source_field == field)
    }
}
