//! Schema introspection traits and types

use crate::{FerryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Anything that can produce the full table metadata of a schema
///
/// Implementations may query a live catalog, read a static file, or return
/// canned data in tests. Errors are reported as `FerryError::Introspection`.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Human readable name of the source, used in logs
    fn name(&self) -> &str {
        "schema"
    }

    /// Load every table with columns, keys, indexes, constraints and policies
    async fn load_tables(&self) -> Result<Vec<TableDescriptor>>;
}

/// A schema snapshot held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    name: String,
    tables: Vec<TableDescriptor>,
}

impl StaticSchemaSource {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self {
            name: "static".to_string(),
            tables,
        }
    }

    /// Parse a snapshot from a JSON array of table descriptors
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tables: Vec<TableDescriptor> = serde_json::from_str(json)
            .map_err(|e| FerryError::Introspection(format!("malformed snapshot: {}", e)))?;
        Ok(Self::new(tables))
    }

    /// Read a snapshot file written as a JSON array of table descriptors
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FerryError::Introspection(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut source = Self::from_json_str(&content)?;
        source.name = path.display().to_string();
        Ok(source)
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_tables(&self) -> Result<Vec<TableDescriptor>> {
        Ok(self.tables.clone())
    }
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    #[default]
    Table,
    View,
    MaterializedView,
    ForeignTable,
}

/// Full metadata for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub table_type: TableType,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    #[serde(default)]
    pub constraints: Vec<ConstraintInfo>,
    /// Whether row-level access control is enabled
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub policies: Vec<PolicyInfo>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl TableDescriptor {
    /// Create an empty table in the `public` schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: default_schema(),
            table_type: TableType::Table,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            rls_enabled: false,
            policies: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKeyInfo) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_constraint(mut self, constraint: ConstraintInfo) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_rls(mut self, enabled: bool) -> Self {
        self.rls_enabled = enabled;
        self
    }

    pub fn with_policy(mut self, policy: PolicyInfo) -> Self {
        self.policies.push(policy);
        self
    }

    /// Get the fully qualified name (schema.name)
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Whether the table lives in the given namespace
    pub fn is_in_schema(&self, schema: &str) -> bool {
        self.schema == schema
    }

    /// Names of the tables this table references, in declaration order
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let fk_targets = self
            .foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .chain(
                self.columns
                    .iter()
                    .filter_map(|c| c.foreign_key.as_ref().map(|r| r.table.as_str())),
            );
        for target in fk_targets {
            if seen.insert(target) {
                names.push(target);
            }
        }
        names
    }

    /// Check the descriptor's structural invariants
    ///
    /// Column names must be unique and every foreign key must name local
    /// columns that exist.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FerryError::Introspection(
                "table with an empty name".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(FerryError::Introspection(format!(
                    "duplicate column '{}' in table '{}'",
                    column.name, self.name
                )));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(FerryError::Introspection(format!(
                    "foreign key '{}' on '{}' has no columns",
                    fk.name, self.name
                )));
            }
            for col in &fk.columns {
                if !seen.contains(col.as_str()) {
                    return Err(FerryError::Introspection(format!(
                        "foreign key '{}' on '{}' uses unknown column '{}'",
                        fk.name, self.name, col
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Validate foreign key targets across a whole snapshot
///
/// References to tables outside the snapshot are allowed (they may live in
/// another namespace); references to known tables must name existing columns.
pub fn validate_references(tables: &[TableDescriptor]) -> Result<()> {
    let by_name: HashMap<&str, &TableDescriptor> =
        tables.iter().map(|t| (t.name.as_str(), t)).collect();

    for table in tables {
        for fk in &table.foreign_keys {
            let Some(target) = by_name.get(fk.referenced_table.as_str()) else {
                tracing::debug!(
                    table = %table.name,
                    target = %fk.referenced_table,
                    "foreign key targets a table outside the snapshot"
                );
                continue;
            };
            for col in &fk.referenced_columns {
                if !target.has_column(col) {
                    return Err(FerryError::Introspection(format!(
                        "foreign key '{}' on '{}' references missing column '{}.{}'",
                        fk.name, table.name, target.name, col
                    )));
                }
            }
        }

        for column in &table.columns {
            let Some(reference) = &column.foreign_key else {
                continue;
            };
            let Some(target) = by_name.get(reference.table.as_str()) else {
                continue;
            };
            if !target.has_column(&reference.column) {
                return Err(FerryError::Introspection(format!(
                    "column '{}.{}' references missing column '{}.{}'",
                    table.name, column.name, target.name, reference.column
                )));
            }
        }
    }
    Ok(())
}

/// Column information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Semantic data type, e.g. "text", "integer", "timestamp"
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyRef>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    /// Create a nullable column with no default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            max_length: None,
            is_primary_key: false,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    pub fn with_max_length(mut self, len: i64) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

/// Foreign key reference (for column info)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Index information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_index_type")]
    pub index_type: String,
}

fn default_index_type() -> String {
    "btree".to_string()
}

impl IndexInfo {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
            index_type: default_index_type(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_unique = true;
        self
    }

    /// Whether this index can serve lookups on `columns` (leading prefix match)
    pub fn covers(&self, columns: &[String]) -> bool {
        !columns.is_empty()
            && self.columns.len() >= columns.len()
            && self.columns[..columns.len()] == *columns
    }
}

/// Foreign key information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    #[serde(default)]
    pub referenced_schema: Option<String>,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

impl ForeignKeyInfo {
    /// Single-column foreign key with default actions
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
            referenced_table: referenced_table.into(),
            referenced_schema: None,
            referenced_columns: vec![referenced_column.into()],
            on_update: ForeignKeyAction::NoAction,
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Foreign key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Constraint information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub constraint_type: ConstraintType,
    pub columns: Vec<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Constraint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

/// Row-level access policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub name: String,
    #[serde(default)]
    pub command: PolicyCommand,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub using: Option<String>,
    #[serde(default)]
    pub with_check: Option<String>,
}

impl PolicyInfo {
    pub fn new(name: impl Into<String>, command: PolicyCommand) -> Self {
        Self {
            name: name.into(),
            command,
            roles: Vec::new(),
            using: None,
            with_check: None,
        }
    }

    pub fn using(mut self, expr: impl Into<String>) -> Self {
        self.using = Some(expr.into());
        self
    }

    pub fn with_check(mut self, expr: impl Into<String>) -> Self {
        self.with_check = Some(expr.into());
        self
    }

    pub fn for_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Statement kind a policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCommand {
    #[default]
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyCommand {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}
