//! Ferry Schema - schema analysis and import matching
//!
//! This crate provides:
//! - Relationship mapping, dependency graph, naming audit, issues and
//!   enhancement suggestions for a schema snapshot
//! - Scoring of incoming record batches against the analyzed tables

mod analysis;
pub mod analyzer;
pub mod dependencies;
pub mod matching;

pub use analysis::SchemaAnalysis;
pub use analyzer::{
    AnalyzerConfig, EnhancementSuggestion, IssueKind, ManyToManyHint, NamingIssue,
    NamingIssueKind, NamingReport, Priority, SchemaAnalyzer, SchemaIssue, Severity,
    SuggestionKind, TableRelationships,
};
pub use dependencies::{DependencyGraph, DependencyNode};
pub use matching::{
    ConstraintHint, FieldMapping, ForeignKeyGuess, ForeignKeyGuesser,
    HeuristicForeignKeyGuesser, ImportDataPattern, ImportMatcher, InferredType, MatchKind,
};
