//! PostgreSQL rendering of schema changes


use ferry_core::{ColumnInfo, ForeignKeyInfo, IndexInfo, PolicyInfo, TableDescriptor, TableType};

use crate::error::{MigrationError, MigrationResult};
use crate::operation::SchemaChange;

/// Configuration for SQL rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Whether to include IF EXISTS clauses on drops
    pub use_if_exists: bool,
    /// Whether to include CASCADE on table drops
    pub use_cascade: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            use_if_exists: true,
            use_cascade: false,
        }
    }
}

impl MigrationConfig {
    /// Creates a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables IF EXISTS clauses
    pub fn with_if_exists(mut self, use_if_exists: bool) -> Self {
        self.use_if_exists = use_if_exists;
        self
    }

    /// Enables or disables CASCADE clauses
    pub fn with_cascade(mut self, use_cascade: bool) -> Self {
        self.use_cascade = use_cascade;
        self
    }
}

/// Renders [`SchemaChange`]s to PostgreSQL statements
#[derive(Debug, Clone, Default)]
pub struct SqlRenderer {
    config: MigrationConfig,
}

impl SqlRenderer {
    /// Creates a new renderer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Render a change as one or more `;`-terminated statements
    pub fn render(&self, change: &SchemaChange) -> MigrationResult<String> {
        let statements = self.statements(change)?;
        Ok(statements
            .iter()
            .map(|s| format!("{};", s))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Render a change into individual statements without terminators
    pub fn statements(&self, change: &SchemaChange) -> MigrationResult<Vec<String>> {
        match change {
            SchemaChange::CreateTable { table } => self.create_table(table),
            SchemaChange::DropTable { schema, table } => {
                let cascade = if self.config.use_cascade {
                    " CASCADE"
                } else {
                    ""
                };
                Ok(vec![format!(
                    "DROP TABLE {}{}{}",
                    self.if_exists(),
                    self.qualified(schema, table)?,
                    cascade
                )])
            }
            SchemaChange::AddColumn {
                schema,
                table,
                column,
            } => Ok(vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.qualified(schema, table)?,
                self.column_definition(column)?
            )]),
            SchemaChange::DropColumn {
                schema,
                table,
                column,
            } => Ok(vec![format!(
                "ALTER TABLE {} DROP COLUMN {}{}",
                self.qualified(schema, table)?,
                self.if_exists(),
                quote(column)?
            )]),
            SchemaChange::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => Ok(vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified(schema, table)?,
                self.foreign_key_clause(schema, foreign_key)?
            )]),
            SchemaChange::DropConstraint {
                schema,
                table,
                name,
            } => Ok(vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}{}",
                self.qualified(schema, table)?,
                self.if_exists(),
                quote(name)?
            )]),
            SchemaChange::CreateIndex {
                schema,
                table,
                index,
            } => Ok(vec![self.create_index(schema, table, index)?]),
            SchemaChange::DropIndex { schema, name } => Ok(vec![format!(
                "DROP INDEX {}{}",
                self.if_exists(),
                self.qualified(schema, name)?
            )]),
            SchemaChange::EnableRls { schema, table } => Ok(vec![format!(
                "ALTER TABLE {} ENABLE ROW LEVEL SECURITY",
                self.qualified(schema, table)?
            )]),
            SchemaChange::DisableRls { schema, table } => Ok(vec![format!(
                "ALTER TABLE {} DISABLE ROW LEVEL SECURITY",
                self.qualified(schema, table)?
            )]),
            SchemaChange::CreatePolicy {
                schema,
                table,
                policy,
            } => Ok(vec![self.create_policy(schema, table, policy)?]),
            SchemaChange::DropPolicy {
                schema,
                table,
                name,
            } => Ok(vec![format!(
                "DROP POLICY {}{} ON {}",
                self.if_exists(),
                quote(name)?,
                self.qualified(schema, table)?
            )]),
            SchemaChange::Sequence(changes) => {
                if changes.is_empty() {
                    return Err(MigrationError::InvalidElement(
                        "empty change sequence".to_string(),
                    ));
                }
                let mut statements = Vec::new();
                for change in changes {
                    statements.extend(self.statements(change)?);
                }
                Ok(statements)
            }
        }
    }

    fn if_exists(&self) -> &'static str {
        if self.config.use_if_exists {
            "IF EXISTS "
        } else {
            ""
        }
    }

    fn qualified(&self, schema: &str, name: &str) -> MigrationResult<String> {
        Ok(format!("{}.{}", quote(schema)?, quote(name)?))
    }

    fn create_table(&self, table: &TableDescriptor) -> MigrationResult<Vec<String>> {
        if table.table_type != TableType::Table {
            return Err(MigrationError::UnsupportedOperation(format!(
                "cannot create {:?} '{}' as a table",
                table.table_type, table.name
            )));
        }
        if table.columns.is_empty() {
            return Err(MigrationError::InvalidElement(format!(
                "table '{}' has no columns",
                table.name
            )));
        }

        let table_name = self.qualified(&table.schema, &table.name)?;
        let mut lines = Vec::new();
        for column in &table.columns {
            lines.push(self.column_definition(column)?);
        }

        let pk: Vec<&ColumnInfo> = table.columns.iter().filter(|c| c.is_primary_key).collect();
        if !pk.is_empty() {
            let cols = pk
                .iter()
                .map(|c| quote(&c.name))
                .collect::<MigrationResult<Vec<_>>>()?;
            lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }
        for fk in &table.foreign_keys {
            lines.push(self.foreign_key_clause(&table.schema, fk)?);
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            table_name,
            lines.join(",\n    ")
        )];

        for index in table.indexes.iter().filter(|i| !i.is_primary) {
            statements.push(self.create_index(&table.schema, &table.name, index)?);
        }
        if table.rls_enabled {
            statements.push(format!(
                "ALTER TABLE {} ENABLE ROW LEVEL SECURITY",
                table_name
            ));
        }
        for policy in &table.policies {
            statements.push(self.create_policy(&table.schema, &table.name, policy)?);
        }

        Ok(statements)
    }

    fn column_definition(&self, col: &ColumnInfo) -> MigrationResult<String> {
        if col.data_type.trim().is_empty() {
            return Err(MigrationError::InvalidElement(format!(
                "column '{}' has no data type",
                col.name
            )));
        }
        let mut def = format!("{} {}", quote(&col.name)?, col.data_type);

        if let Some(len) = col.max_length {
            if takes_length(&col.data_type) {
                def.push_str(&format!("({})", len));
            }
        }

        if !col.nullable {
            def.push_str(" NOT NULL");
        }

        if let Some(default) = &col.default_value {
            def.push_str(&format!(" DEFAULT {}", default));
        }

        Ok(def)
    }

    fn foreign_key_clause(&self, schema: &str, fk: &ForeignKeyInfo) -> MigrationResult<String> {
        if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
            return Err(MigrationError::InvalidElement(format!(
                "foreign key '{}' has mismatched column lists",
                fk.name
            )));
        }
        let cols = fk
            .columns
            .iter()
            .map(|c| quote(c))
            .collect::<MigrationResult<Vec<_>>>()?;
        let ref_cols = fk
            .referenced_columns
            .iter()
            .map(|c| quote(c))
            .collect::<MigrationResult<Vec<_>>>()?;
        let ref_schema = fk.referenced_schema.as_deref().unwrap_or(schema);

        Ok(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            quote(&fk.name)?,
            cols.join(", "),
            self.qualified(ref_schema, &fk.referenced_table)?,
            ref_cols.join(", "),
            fk.on_update.as_sql(),
            fk.on_delete.as_sql()
        ))
    }

    fn create_index(&self, schema: &str, table: &str, idx: &IndexInfo) -> MigrationResult<String> {
        if idx.columns.is_empty() {
            return Err(MigrationError::InvalidElement(format!(
                "index '{}' has no columns",
                idx.name
            )));
        }
        let unique = if idx.is_unique { "UNIQUE " } else { "" };
        let method = if idx.index_type.eq_ignore_ascii_case("btree") {
            String::new()
        } else {
            format!(" USING {}", idx.index_type)
        };
        let cols = idx
            .columns
            .iter()
            .map(|c| quote(c))
            .collect::<MigrationResult<Vec<_>>>()?;
        Ok(format!(
            "CREATE {}INDEX {} ON {}{} ({})",
            unique,
            quote(&idx.name)?,
            self.qualified(schema, table)?,
            method,
            cols.join(", ")
        ))
    }

    fn create_policy(
        &self,
        schema: &str,
        table: &str,
        policy: &PolicyInfo,
    ) -> MigrationResult<String> {
        let mut sql = format!(
            "CREATE POLICY {} ON {} FOR {}",
            quote(&policy.name)?,
            self.qualified(schema, table)?,
            policy.command.as_sql()
        );
        if !policy.roles.is_empty() {
            sql.push_str(&format!(" TO {}", policy.roles.join(", ")));
        }
        if let Some(using) = &policy.using {
            sql.push_str(&format!(" USING ({})", using));
        }
        if let Some(check) = &policy.with_check {
            sql.push_str(&format!(" WITH CHECK ({})", check));
        }
        Ok(sql)
    }
}

/// Quote an identifier, rejecting names that cannot be quoted safely
pub fn quote(name: &str) -> MigrationResult<String> {
    if name.is_empty() {
        return Err(MigrationError::InvalidElement("empty identifier".to_string()));
    }
    if name.contains('"') || name.contains('\0') {
        return Err(MigrationError::InvalidElement(format!(
            "identifier {:?} contains a quote or NUL",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

fn takes_length(data_type: &str) -> bool {
    let lower = data_type.to_ascii_lowercase();
    !lower.contains('(')
        && (lower.starts_with("varchar")
            || lower.starts_with("character varying")
            || lower == "char"
            || lower == "character")
}
