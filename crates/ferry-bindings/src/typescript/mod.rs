//! TypeScript rendering of table descriptors
//!
//! Each table becomes one module holding four interfaces: the record, its
//! `Insert` and `Update` variants, and a `WithRelations` view. Shared scalar
//! aliases live in their own module and an index module re-exports
//! everything.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use ferry_core::TableDescriptor;
use ferry_core::naming::{to_field_name, to_snake_name};

use crate::error::{BindingError, BindingResult};

pub const SHARED_MODULE: &str = "shared";
pub const INDEX_MODULE: &str = "index";
pub const FILE_EXTENSION: &str = "ts";

const HEADER: &str = "// Generated by ferry. Do not edit.";

/// Columns the database fills in on insert
const INSERT_OMITTED: &[&str] = &["id", "created_at", "updated_at"];

/// Aliases defined in the shared module that column types can refer to
const SHARED_SCALARS: &[&str] = &["Id", "Json", "Timestamp"];

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

/// TypeScript type for a column's semantic data type
pub fn ts_type(data_type: &str) -> String {
    let normalized = data_type.trim().to_ascii_lowercase();
    if let Some(element) = normalized.strip_suffix("[]") {
        return format!("{}[]", ts_type(element));
    }
    let base = normalized
        .split('(')
        .next()
        .unwrap_or_default()
        .trim();

    match base {
        "uuid" => "Id",
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
        | "citext" | "name" => "string",
        "smallint" | "integer" | "int" | "int2" | "int4" | "int8" | "bigint" | "serial"
        | "bigserial" | "numeric" | "decimal" | "real" | "float4" | "float8"
        | "double precision" => "number",
        "boolean" | "bool" => "boolean",
        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" | "date" | "time" | "timetz" => "Timestamp",
        "json" | "jsonb" => "Json",
        _ => "unknown",
    }
    .to_string()
}

/// Module path for a table, relative to the output directory
pub fn module_name(table_name: &str) -> String {
    to_snake_name(table_name)
}

pub fn file_name(module: &str) -> String {
    format!("{}.{}", module, FILE_EXTENSION)
}

/// Property key, quoted when it is not a bare identifier
fn property(name: &str) -> String {
    if IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "\\'"))
    }
}

/// A relation rendered into the `WithRelations` view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Property name on the view
    pub field: String,
    /// Type name of the related table
    pub type_name: String,
    /// Module the related type is imported from
    pub module: String,
    /// Array of children rather than a single parent
    pub many: bool,
}

/// Renders one table module
#[derive(Debug)]
pub struct TableModule<'a> {
    pub table: &'a TableDescriptor,
    pub type_name: &'a str,
    /// Parents first, then children
    pub relations: Vec<Relation>,
}

struct Field {
    key: String,
    ty: String,
    nullable: bool,
    optional_on_insert: bool,
    column: String,
    doc: Option<String>,
}

impl TableModule<'_> {
    /// Fails exactly when `render` would
    pub fn validate(&self) -> BindingResult<()> {
        self.fields().map(|_| ())
    }

    pub fn render(&self) -> BindingResult<String> {
        let table = self.table;
        let fields = self.fields()?;
        let name = self.type_name;

        let mut out = vec![HEADER.to_string()];

        let scalars: BTreeSet<&str> = fields
            .iter()
            .map(|f| f.ty.trim_end_matches("[]"))
            .filter(|ty| SHARED_SCALARS.contains(ty))
            .collect();
        if !scalars.is_empty() {
            out.push(format!(
                "import type {{ {} }} from './{}';",
                scalars.into_iter().collect::<Vec<_>>().join(", "),
                SHARED_MODULE
            ));
        }
        let related: BTreeSet<(&str, &str)> = self
            .relations
            .iter()
            .filter(|r| r.type_name != name)
            .map(|r| (r.module.as_str(), r.type_name.as_str()))
            .collect();
        for (module, type_name) in related {
            out.push(format!("import type {{ {} }} from './{}';", type_name, module));
        }
        out.push(String::new());

        out.push(format!("/** Row of {} */", table.qualified_name()));
        out.push(format!("export interface {} {{", name));
        for field in &fields {
            if let Some(doc) = &field.doc {
                out.push(format!("  /** {} */", doc));
            }
            out.push(format!("  {}: {};", field.key, field.full_type()));
        }
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!("export interface {}Insert {{", name));
        for field in fields
            .iter()
            .filter(|f| !INSERT_OMITTED.contains(&f.column.as_str()))
        {
            let marker = if field.optional_on_insert { "?" } else { "" };
            out.push(format!("  {}{}: {};", field.key, marker, field.full_type()));
        }
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!("export interface {}Update {{", name));
        for field in &fields {
            let marker = if field.column == "id" { "" } else { "?" };
            out.push(format!("  {}{}: {};", field.key, marker, field.full_type()));
        }
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!(
            "export interface {}WithRelations extends {} {{",
            name, name
        ));
        for relation in &self.relations {
            let array = if relation.many { "[]" } else { "" };
            out.push(format!(
                "  {}?: {}{};",
                property(&relation.field),
                relation.type_name,
                array
            ));
        }
        out.push("}".to_string());

        let mut contents = out.join("\n");
        contents.push('\n');
        Ok(contents)
    }

    fn fields(&self) -> BindingResult<Vec<Field>> {
        let table = self.table;
        if table.columns.is_empty() {
            return Err(BindingError::EmptyTable(table.name.clone()));
        }
        if self.type_name.is_empty() || !IDENTIFIER.is_match(self.type_name) {
            return Err(BindingError::InvalidName(format!(
                "table '{}' has no usable type name",
                table.name
            )));
        }
        table
            .columns
            .iter()
            .map(|column| {
                let key = to_field_name(&column.name);
                if key.is_empty() {
                    return Err(BindingError::InvalidName(format!(
                        "column '{}.{}' has no usable field name",
                        table.name, column.name
                    )));
                }

                let doc = column
                    .foreign_key
                    .as_ref()
                    .map(|fk| format!("References {}.{}", fk.table, fk.column))
                    .or_else(|| {
                        table
                            .foreign_keys
                            .iter()
                            .find(|fk| fk.columns.first() == Some(&column.name))
                            .map(|fk| {
                                format!(
                                    "References {}.{}",
                                    fk.referenced_table,
                                    fk.referenced_columns.join(", ")
                                )
                            })
                    });

                Ok(Field {
                    key: property(&key),
                    ty: ts_type(&column.data_type),
                    nullable: column.nullable,
                    optional_on_insert: column.nullable || column.has_default(),
                    column: column.name.clone(),
                    doc,
                })
            })
            .collect()
    }
}

impl Field {
    fn full_type(&self) -> String {
        if self.nullable {
            format!("{} | null", self.ty)
        } else {
            self.ty.clone()
        }
    }
}

/// Shared aliases and helper types
pub fn shared_module() -> String {
    [
        HEADER,
        "",
        "export type Id = string;",
        "export type Timestamp = string;",
        "export type Json = string | number | boolean | null | Json[] | { [key: string]: Json };",
        "",
        "export interface BaseFields {",
        "  id: Id;",
        "  createdAt: Timestamp;",
        "  updatedAt: Timestamp;",
        "}",
        "",
        "export interface OrderBy<T> {",
        "  column: keyof T;",
        "  ascending?: boolean;",
        "}",
        "",
        "export type FilterClause<T> = {",
        "  [K in keyof T]?: T[K] | { eq?: T[K]; neq?: T[K]; in?: T[K][]; isNull?: boolean };",
        "};",
        "",
    ]
    .join("\n")
}

/// Re-exports the shared module and every table module
pub fn index_module<'a>(modules: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = vec![
        HEADER.to_string(),
        format!("export * from './{}';", SHARED_MODULE),
    ];
    out.extend(
        modules
            .into_iter()
            .map(|module| format!("export * from './{}';", module)),
    );
    let mut contents = out.join("\n");
    contents.push('\n');
    contents
}
