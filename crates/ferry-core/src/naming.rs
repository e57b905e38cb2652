//! Naming helpers shared by the schema analyzer and the binding generator
//!
//! Type and field names are always derived through [`to_type_name`] and
//! [`to_field_name`], which share one word-splitting routine, so a table
//! name maps to the same identifier everywhere.

use std::sync::LazyLock;

use convert_case::{Case, Casing};
use regex::Regex;

static SNAKE_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").expect("snake case pattern is valid")
});

/// Names that collide with keywords in generated bindings or need quoting in SQL
pub const RESERVED_WORDS: &[&str] = &[
    "case", "class", "const", "default", "delete", "enum", "export", "extends", "function",
    "group", "import", "in", "interface", "new", "null", "order", "package", "private",
    "public", "return", "select", "table", "this", "type", "user", "void", "where",
];

/// Whether the name is lowercase snake_case
pub fn is_snake_case(name: &str) -> bool {
    SNAKE_CASE.is_match(name)
}

/// Whether the name is on the reserved-word list (case-insensitive)
pub fn is_reserved_word(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// `user_profiles` -> `UserProfiles`
pub fn to_type_name(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// `created_at` -> `createdAt`
pub fn to_field_name(name: &str) -> String {
    name.to_case(Case::Camel)
}

/// `facility name` / `FacilityName` -> `facility_name`
pub fn to_snake_name(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Suffix pluralization used for child relation names
///
/// Trailing `y` becomes `ies`; trailing `s`, `sh` or `ch` gets `es`;
/// everything else gets `s`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        format!("{}ies", stem)
    } else if word.ends_with('s') || word.ends_with("sh") || word.ends_with("ch") {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
