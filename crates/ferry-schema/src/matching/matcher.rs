//! Scores incoming record batches against known tables

use std::cmp::Ordering;
use std::sync::Arc;

use ferry_core::naming::is_snake_case;
use ferry_core::{Record, TableDescriptor};

use super::guesser::{ForeignKeyGuesser, HeuristicForeignKeyGuesser, looks_like_reference};
use super::inference::{constraint_hints, infer_type};
use super::pattern::{FieldMapping, ImportDataPattern, MatchKind};
use crate::analysis::SchemaAnalysis;

/// Tables must score above this to become candidates
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Table name proposed when no existing table matches and no name is given
pub const DEFAULT_NEW_TABLE: &str = "imported_data";

/// Matches record batches to tables
#[derive(Clone)]
pub struct ImportMatcher {
    max_sample_records: usize,
    guesser: Arc<dyn ForeignKeyGuesser>,
}

impl std::fmt::Debug for ImportMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportMatcher")
            .field("max_sample_records", &self.max_sample_records)
            .finish_non_exhaustive()
    }
}

impl Default for ImportMatcher {
    fn default() -> Self {
        Self {
            max_sample_records: 100,
            guesser: Arc::new(HeuristicForeignKeyGuesser::default()),
        }
    }
}

impl ImportMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sample_records(mut self, max: usize) -> Self {
        self.max_sample_records = max;
        self
    }

    /// Replace the foreign-key guessing strategy
    pub fn with_guesser(mut self, guesser: Arc<dyn ForeignKeyGuesser>) -> Self {
        self.guesser = guesser;
        self
    }

    pub fn max_sample_records(&self) -> usize {
        self.max_sample_records
    }

    /// Rank known tables by how well the batch fits them
    pub fn match_import_data(
        &self,
        records: &[Record],
        analysis: &SchemaAnalysis,
    ) -> Vec<ImportDataPattern> {
        self.match_import_data_as(records, analysis, DEFAULT_NEW_TABLE)
    }

    /// Like [`Self::match_import_data`], proposing `new_table` when nothing matches
    pub fn match_import_data_as(
        &self,
        records: &[Record],
        analysis: &SchemaAnalysis,
        new_table: &str,
    ) -> Vec<ImportDataPattern> {
        let sample = &records[..records.len().min(self.max_sample_records)];
        let Some(first) = sample.first() else {
            return Vec::new();
        };
        let fields: Vec<&str> = first.keys().map(String::as_str).collect();

        let mut scored: Vec<(&TableDescriptor, f64)> = analysis
            .tables
            .iter()
            .map(|table| (table, score_table(&fields, table)))
            .filter(|(_, score)| *score > MATCH_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
        });

        tracing::debug!(
            fields = fields.len(),
            sampled = sample.len(),
            candidates = scored.len(),
            "Scored import batch against schema"
        );

        if scored.is_empty() {
            return vec![self.new_table_pattern(new_table, &fields, sample, analysis)];
        }

        scored
            .into_iter()
            .map(|(table, score)| {
                let mappings: Vec<FieldMapping> = fields
                    .iter()
                    .map(|field| self.map_field(field, Some(table), sample, analysis))
                    .collect();
                self.build_pattern(&table.name, score, false, mappings)
            })
            .collect()
    }

    fn new_table_pattern(
        &self,
        table_name: &str,
        fields: &[&str],
        sample: &[Record],
        analysis: &SchemaAnalysis,
    ) -> ImportDataPattern {
        let mappings = fields
            .iter()
            .map(|field| self.map_field(field, None, sample, analysis))
            .collect();
        let mut pattern = self.build_pattern(table_name, 1.0, true, mappings);
        pattern.suggestions.insert(
            0,
            format!("No existing table fits this data; create '{}'", table_name),
        );
        pattern
    }

    fn map_field(
        &self,
        field: &str,
        table: Option<&TableDescriptor>,
        sample: &[Record],
        analysis: &SchemaAnalysis,
    ) -> FieldMapping {
        let (column, match_kind) = match table.and_then(|t| find_column(field, t)) {
            Some((column, kind)) => (Some(column), kind),
            None => (None, MatchKind::Unmatched),
        };

        let foreign_key = if looks_like_reference(field) {
            self.guesser.guess(field, analysis)
        } else {
            None
        };

        FieldMapping {
            source_field: field.to_string(),
            column,
            match_kind,
            inferred_type: infer_type(field, sample),
            constraints: constraint_hints(field, sample),
            foreign_key,
        }
    }

    fn build_pattern(
        &self,
        table_name: &str,
        confidence: f64,
        is_new_table: bool,
        mappings: Vec<FieldMapping>,
    ) -> ImportDataPattern {
        let mut relationship_hints = Vec::new();
        let mut suggestions = Vec::new();

        for mapping in &mappings {
            if let Some(fk) = &mapping.foreign_key {
                relationship_hints.push(format!(
                    "'{}' may reference {}.{} (confidence {:.1})",
                    mapping.source_field, fk.table, fk.column, fk.confidence
                ));
            }
            if !is_new_table && !mapping.is_matched() {
                suggestions.push(format!(
                    "Add column '{}' ({}) to '{}'",
                    mapping.source_field,
                    mapping.inferred_type.sql_type(),
                    table_name
                ));
            }
            if !is_snake_case(&mapping.source_field) {
                suggestions.push(format!(
                    "Field '{}' is not snake_case",
                    mapping.source_field
                ));
            }
        }

        ImportDataPattern {
            table_name: table_name.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            is_new_table,
            mappings,
            relationship_hints,
            suggestions,
        }
    }
}

/// Case-insensitive equality or substring containment either way
fn corresponds(field: &str, column: &str) -> bool {
    let field = field.to_lowercase();
    let column = column.to_lowercase();
    field == column || field.contains(&column) || column.contains(&field)
}

/// Fraction of fields with a corresponding column, over the larger of the
/// field and column counts
fn score_table(fields: &[&str], table: &TableDescriptor) -> f64 {
    let denominator = fields.len().max(table.columns.len());
    if denominator == 0 {
        return 0.0;
    }
    let matched = fields
        .iter()
        .filter(|field| table.columns.iter().any(|c| corresponds(field, &c.name)))
        .count();
    matched as f64 / denominator as f64
}

/// Exact match first, then the longest column with substring containment
fn find_column(field: &str, table: &TableDescriptor) -> Option<(String, MatchKind)> {
    if let Some(column) = table
        .columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(field))
    {
        return Some((column.name.clone(), MatchKind::Exact));
    }

    let mut best: Option<&str> = None;
    for column in table.columns.iter().filter(|c| corresponds(field, &c.name)) {
        if best.is_none_or(|b| column.name.len() > b.len()) {
            best = Some(&column.name);
        }
    }
    best.map(|name| (name.to_string(), MatchKind::Partial))
}
