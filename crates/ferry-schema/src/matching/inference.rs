//! Semantic type and constraint inference over sampled values

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use ferry_core::{Record, Value};

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").expect("timestamp pattern is valid")
});

/// Strings longer than this are long text
pub const LONG_STRING_THRESHOLD: usize = 255;

/// Semantic type inferred for an incoming field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    /// Every sampled value was null
    Text,
    Boolean,
    Integer,
    Decimal,
    Date,
    Timestamp,
    String,
    LongString,
    Json,
}

impl InferredType {
    /// Column type used when the field becomes a new column
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text | Self::String | Self::LongString => "text",
            Self::Boolean => "boolean",
            Self::Integer => "bigint",
            Self::Decimal => "numeric",
            Self::Date => "date",
            Self::Timestamp => "timestamptz",
            Self::Json => "jsonb",
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Text,
            Value::Bool(_) => Self::Boolean,
            Value::Integer(_) => Self::Integer,
            Value::Decimal(_) => Self::Decimal,
            Value::Json(_) => Self::Json,
            Value::Text(s) => {
                if ISO_DATE.is_match(s) {
                    Self::Date
                } else if ISO_TIMESTAMP.is_match(s) {
                    Self::Timestamp
                } else if s.chars().count() > LONG_STRING_THRESHOLD {
                    Self::LongString
                } else {
                    Self::String
                }
            }
        }
    }
}

/// Constraint suggested by the sampled values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ConstraintHint {
    /// Every sampled record carried a non-null value
    NotNull,
    /// At least two sampled values, all distinct
    Unique,
    /// Longest sampled string, in characters
    MaxLength(usize),
}

/// Type of the first non-null sampled value
pub fn infer_type(field: &str, sample: &[Record]) -> InferredType {
    sample
        .iter()
        .filter_map(|record| record.get(field))
        .find(|value| !value.is_null())
        .map(InferredType::of)
        .unwrap_or(InferredType::Text)
}

pub fn constraint_hints(field: &str, sample: &[Record]) -> Vec<ConstraintHint> {
    let values: Vec<&Value> = sample
        .iter()
        .filter_map(|record| record.get(field))
        .filter(|value| !value.is_null())
        .collect();

    let mut hints = Vec::new();
    if values.is_empty() {
        return hints;
    }

    if values.len() == sample.len() {
        hints.push(ConstraintHint::NotNull);
    }

    if values.len() >= 2 {
        let distinct: HashSet<String> = values.iter().map(|v| v.to_string()).collect();
        if distinct.len() == values.len() {
            hints.push(ConstraintHint::Unique);
        }
    }

    if let Some(max) = values
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.chars().count())
        .max()
    {
        hints.push(ConstraintHint::MaxLength(max));
    }

    hints
}
