//! Import data matching
//!
//! Scores a sample of incoming records against the analyzed tables and
//! produces ranked [`ImportDataPattern`]s with per-field mappings, inferred
//! types, constraint hints and foreign-key guesses.

mod guesser;
mod inference;
mod matcher;
mod pattern;


pub use guesser::{
    ForeignKeyGuess, ForeignKeyGuesser, HeuristicForeignKeyGuesser, KNOWN_TARGET_CONFIDENCE,
    UNKNOWN_TARGET_CONFIDENCE, looks_like_reference,
};
pub use inference::{ConstraintHint, InferredType, LONG_STRING_THRESHOLD, constraint_hints, infer_type};
pub use matcher::{DEFAULT_NEW_TABLE, ImportMatcher, MATCH_THRESHOLD};
pub use pattern::{FieldMapping, ImportDataPattern, MatchKind};
