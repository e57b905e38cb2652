//! Migration operations and their structured intents

use serde::{Deserialize, Serialize};

use ferry_core::{
    ColumnInfo, ForeignKeyInfo, ForeignKeyRef, IndexInfo, PolicyInfo, RiskLevel, TableDescriptor,
};

/// Kind of migration operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateTable,
    AlterTable,
    AddColumn,
    AddConstraint,
    AddIndex,
    AddAccessPolicy,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::AlterTable => "alter_table",
            Self::AddColumn => "add_column",
            Self::AddConstraint => "add_constraint",
            Self::AddIndex => "add_index",
            Self::AddAccessPolicy => "add_access_policy",
        }
    }

    /// Whether operations of this kind change the shape of an existing table
    pub fn alters_table(&self) -> bool {
        matches!(self, Self::AlterTable | Self::AddColumn | Self::AddConstraint)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured schema change
///
/// Forward and rollback intents of an operation are both expressed as
/// `SchemaChange` values and rendered to SQL by the `SqlRenderer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", content = "args", rename_all = "snake_case")]
pub enum SchemaChange {
    /// Create a table with its columns, keys, indexes, row-level security
    /// flag and policies
    CreateTable { table: TableDescriptor },
    DropTable { schema: String, table: String },
    AddColumn {
        schema: String,
        table: String,
        column: ColumnInfo,
    },
    DropColumn {
        schema: String,
        table: String,
        column: String,
    },
    AddForeignKey {
        schema: String,
        table: String,
        foreign_key: ForeignKeyInfo,
    },
    DropConstraint {
        schema: String,
        table: String,
        name: String,
    },
    CreateIndex {
        schema: String,
        table: String,
        index: IndexInfo,
    },
    DropIndex { schema: String, name: String },
    EnableRls { schema: String, table: String },
    DisableRls { schema: String, table: String },
    CreatePolicy {
        schema: String,
        table: String,
        policy: PolicyInfo,
    },
    DropPolicy {
        schema: String,
        table: String,
        name: String,
    },
    /// Several changes applied in order
    Sequence(Vec<SchemaChange>),
}

impl SchemaChange {
    /// Names of the objects this change touches
    ///
    /// A change and its inverse report the same names: `schema.table` for
    /// tables and row-level security, `schema.table.column` for columns,
    /// `schema.table.name` for constraints and policies, `schema.name` for
    /// indexes.
    pub fn object_names(&self) -> Vec<String> {
        match self {
            Self::CreateTable { table } => vec![format!("{}.{}", table.schema, table.name)],
            Self::DropTable { schema, table }
            | Self::EnableRls { schema, table }
            | Self::DisableRls { schema, table } => vec![format!("{}.{}", schema, table)],
            Self::AddColumn {
                schema,
                table,
                column,
            } => vec![format!("{}.{}.{}", schema, table, column.name)],
            Self::DropColumn {
                schema,
                table,
                column,
            } => vec![format!("{}.{}.{}", schema, table, column)],
            Self::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => vec![format!("{}.{}.{}", schema, table, foreign_key.name)],
            Self::DropConstraint {
                schema,
                table,
                name,
            }
            | Self::DropPolicy {
                schema,
                table,
                name,
            } => vec![format!("{}.{}.{}", schema, table, name)],
            Self::CreatePolicy {
                schema,
                table,
                policy,
            } => vec![format!("{}.{}.{}", schema, table, policy.name)],
            Self::CreateIndex { schema, index, .. } => {
                vec![format!("{}.{}", schema, index.name)]
            }
            Self::DropIndex { schema, name } => vec![format!("{}.{}", schema, name)],
            Self::Sequence(changes) => changes.iter().flat_map(|c| c.object_names()).collect(),
        }
    }

    /// Columns dropped by this change, as `table.column`
    pub fn removed_columns(&self) -> Vec<String> {
        match self {
            Self::DropColumn { table, column, .. } => vec![format!("{}.{}", table, column)],
            Self::Sequence(changes) => changes.iter().flat_map(|c| c.removed_columns()).collect(),
            _ => Vec::new(),
        }
    }

    /// Apply the change to an in-memory snapshot
    ///
    /// Changes against tables missing from the snapshot are ignored.
    pub fn apply(&self, tables: &mut Vec<TableDescriptor>) {
        fn find<'a>(
            tables: &'a mut [TableDescriptor],
            schema: &str,
            table: &str,
        ) -> Option<&'a mut TableDescriptor> {
            tables
                .iter_mut()
                .find(|t| t.name == table && t.schema == schema)
        }

        match self {
            Self::CreateTable { table } => {
                if find(tables, &table.schema, &table.name).is_none() {
                    tables.push(table.clone());
                }
            }
            Self::DropTable { schema, table } => {
                tables.retain(|t| !(t.name == *table && t.schema == *schema));
            }
            Self::AddColumn {
                schema,
                table,
                column,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    if !t.has_column(&column.name) {
                        t.columns.push(column.clone());
                    }
                }
            }
            Self::DropColumn {
                schema,
                table,
                column,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    t.columns.retain(|c| c.name != *column);
                }
            }
            Self::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    if let ([col], [ref_col]) = (
                        foreign_key.columns.as_slice(),
                        foreign_key.referenced_columns.as_slice(),
                    ) {
                        if let Some(c) = t.columns.iter_mut().find(|c| c.name == *col) {
                            c.foreign_key = Some(ForeignKeyRef {
                                table: foreign_key.referenced_table.clone(),
                                column: ref_col.clone(),
                            });
                        }
                    }
                    t.foreign_keys.push(foreign_key.clone());
                }
            }
            Self::DropConstraint {
                schema,
                table,
                name,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    if let Some(pos) = t.foreign_keys.iter().position(|fk| fk.name == *name) {
                        let fk = t.foreign_keys.remove(pos);
                        for c in t.columns.iter_mut() {
                            if fk.columns.contains(&c.name) {
                                c.foreign_key = None;
                            }
                        }
                    }
                    t.constraints.retain(|c| c.name != *name);
                }
            }
            Self::CreateIndex {
                schema,
                table,
                index,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    if !t.indexes.iter().any(|i| i.name == index.name) {
                        t.indexes.push(index.clone());
                    }
                }
            }
            Self::DropIndex { schema, name } => {
                for t in tables.iter_mut().filter(|t| t.schema == *schema) {
                    t.indexes.retain(|i| i.name != *name);
                }
            }
            Self::EnableRls { schema, table } => {
                if let Some(t) = find(tables, schema, table) {
                    t.rls_enabled = true;
                }
            }
            Self::DisableRls { schema, table } => {
                if let Some(t) = find(tables, schema, table) {
                    t.rls_enabled = false;
                }
            }
            Self::CreatePolicy {
                schema,
                table,
                policy,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    t.policies.push(policy.clone());
                }
            }
            Self::DropPolicy {
                schema,
                table,
                name,
            } => {
                if let Some(t) = find(tables, schema, table) {
                    t.policies.retain(|p| p.name != *name);
                }
            }
            Self::Sequence(changes) => {
                for change in changes {
                    change.apply(tables);
                }
            }
        }
    }
}

/// One atomic, reversible schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOperation {
    /// Unique within a plan
    pub id: String,
    pub kind: OperationKind,
    /// Lower runs first
    pub priority: u32,
    /// Table the operation targets
    pub table: String,
    pub forward: SchemaChange,
    pub rollback: SchemaChange,
    pub description: String,
    pub risk: RiskLevel,
    /// Ids of operations that must run first
    pub dependencies: Vec<String>,
    /// Checks to run after applying
    pub validations: Vec<String>,
}

impl MigrationOperation {
    pub fn new(
        id: impl Into<String>,
        kind: OperationKind,
        table: impl Into<String>,
        forward: SchemaChange,
        rollback: SchemaChange,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            priority: default_priority(kind),
            table: table.into(),
            forward,
            rollback,
            description: String::new(),
            risk: RiskLevel::Low,
            dependencies: Vec::new(),
            validations: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.dependencies.contains(&id) {
            self.dependencies.push(id);
        }
        self
    }

    pub fn with_validation(mut self, check: impl Into<String>) -> Self {
        self.validations.push(check.into());
        self
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk == RiskLevel::High
    }
}

/// Priority the planner assigns to each kind
pub fn default_priority(kind: OperationKind) -> u32 {
    match kind {
        OperationKind::CreateTable => 1,
        OperationKind::AlterTable | OperationKind::AddColumn => 2,
        OperationKind::AddConstraint | OperationKind::AddIndex => 3,
        OperationKind::AddAccessPolicy => 4,
    }
}
