//! Foreign-key guessing strategies

use serde::{Deserialize, Serialize};

use crate::analysis::SchemaAnalysis;

/// Confidence of a guess whose target table exists
pub const KNOWN_TARGET_CONFIDENCE: f64 = 0.8;
/// Confidence of a guess whose target table is missing
pub const UNKNOWN_TARGET_CONFIDENCE: f64 = 0.4;

/// Field-name fragments that mark a field as a reference
const REFERENCE_MARKERS: &[&str] = &["_id", "id", "_ref", "_key"];

/// A guessed reference target for an incoming field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyGuess {
    pub table: String,
    pub column: String,
    /// In [0, 1]
    pub confidence: f64,
}

/// Whether a field name looks like a reference to another table
pub fn looks_like_reference(field: &str) -> bool {
    let lower = field.to_ascii_lowercase();
    REFERENCE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Strategy for guessing which table a reference-like field points to
pub trait ForeignKeyGuesser: Send + Sync {
    /// Called only for fields that [`looks_like_reference`]
    fn guess(&self, field: &str, analysis: &SchemaAnalysis) -> Option<ForeignKeyGuess>;
}

/// Fixed name-fragment to table rules
#[derive(Debug, Clone)]
pub struct HeuristicForeignKeyGuesser {
    rules: Vec<(String, String)>,
}

impl Default for HeuristicForeignKeyGuesser {
    fn default() -> Self {
        Self {
            rules: vec![
                ("user".to_string(), "profiles".to_string()),
                ("facility".to_string(), "facilities".to_string()),
                ("organization".to_string(), "organizations".to_string()),
            ],
        }
    }
}

impl HeuristicForeignKeyGuesser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule mapping a field-name fragment to a table
    pub fn with_rule(mut self, fragment: impl Into<String>, table: impl Into<String>) -> Self {
        self.rules.push((fragment.into(), table.into()));
        self
    }
}

impl ForeignKeyGuesser for HeuristicForeignKeyGuesser {
    fn guess(&self, field: &str, analysis: &SchemaAnalysis) -> Option<ForeignKeyGuess> {
        let lower = field.to_ascii_lowercase();
        let (_, table) = self
            .rules
            .iter()
            .find(|(fragment, _)| lower.contains(fragment.as_str()))?;

        let confidence = if analysis.has_table(table) {
            KNOWN_TARGET_CONFIDENCE
        } else {
            UNKNOWN_TARGET_CONFIDENCE
        };

        Some(ForeignKeyGuess {
            table: table.clone(),
            column: "id".to_string(),
            confidence,
        })
    }
}
