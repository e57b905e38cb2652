//! Migration planner
//!
//! Converts matched import patterns and the analyzer's enhancement
//! suggestions into an ordered [`MigrationPlan`].

mod ordering;


use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ferry_core::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, PolicyCommand, PolicyInfo, Record, RiskLevel,
    TableDescriptor,
};
use ferry_schema::{
    EnhancementSuggestion, ImportDataPattern, MatchKind, SchemaAnalysis, SuggestionKind,
};

use crate::operation::{MigrationOperation, OperationKind, SchemaChange};
use crate::plan::{EstimatedDuration, MigrationPlan};

/// Columns every created table gets; incoming fields with these names are
/// not added again
const MANAGED_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// Configuration for the migration planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Namespace for created tables
    pub schema: String,
    /// Per-record owner column added to created tables
    pub owner_column: String,
    /// Default expression for the owner column
    pub owner_default: String,
    /// Role the owner policies apply to
    pub policy_role: String,
    /// Foreign-key guesses at or above this confidence become constraints
    pub foreign_key_confidence: f64,
    pub base_seconds: u64,
    pub per_operation_seconds: u64,
    /// Plans with more operations than this require a backup
    pub backup_operation_threshold: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            owner_column: "user_id".to_string(),
            owner_default: "auth.uid()".to_string(),
            policy_role: "authenticated".to_string(),
            foreign_key_confidence: 0.8,
            base_seconds: 30,
            per_operation_seconds: 15,
            backup_operation_threshold: 5,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_owner_column(mut self, column: impl Into<String>) -> Self {
        self.owner_column = column.into();
        self
    }

    pub fn with_foreign_key_confidence(mut self, confidence: f64) -> Self {
        self.foreign_key_confidence = confidence;
        self
    }
}

/// Operations collected while planning, before ordering
#[derive(Default)]
struct Draft {
    operations: Vec<MigrationOperation>,
    /// Working copies of tables created or altered so far
    tables: HashMap<String, TableDescriptor>,
    /// Table name -> id of the operation creating it
    created: HashMap<String, String>,
    /// (table, column) -> id of the operation introducing it
    columns: HashMap<(String, String), String>,
}

impl Draft {
    fn next_id(&self) -> String {
        format!("op_{:03}", self.operations.len() + 1)
    }

    fn table<'a>(&'a self, name: &str, analysis: &'a SchemaAnalysis) -> Option<&'a TableDescriptor> {
        self.tables.get(name).or_else(|| analysis.table(name))
    }

    fn table_mut(&mut self, name: &str, analysis: &SchemaAnalysis) -> Option<&mut TableDescriptor> {
        if !self.tables.contains_key(name) {
            let existing = analysis.table(name)?.clone();
            self.tables.insert(name.to_string(), existing);
        }
        self.tables.get_mut(name)
    }
}

/// Builds migration plans
#[derive(Debug, Clone, Default)]
pub struct MigrationPlanner {
    config: PlannerConfig,
}

impl MigrationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the changes needed to import `sample` as described by `patterns`
    pub fn plan(
        &self,
        patterns: &[ImportDataPattern],
        analysis: &SchemaAnalysis,
        sample: &[Record],
    ) -> MigrationPlan {
        let mut draft = Draft::default();

        for pattern in patterns {
            self.plan_pattern(pattern, analysis, &mut draft);
        }
        for suggestion in &analysis.suggestions {
            self.plan_suggestion(suggestion, &mut draft);
        }

        let operations = ordering::order_operations(draft.operations);
        let rollback_sequence: Vec<String> = operations.iter().rev().map(|op| op.id.clone()).collect();

        let backup_required = operations.iter().any(|op| op.is_high_risk())
            || operations
                .iter()
                .any(|op| op.kind.alters_table() && analysis.has_table(&op.table))
            || operations.len() > self.config.backup_operation_threshold;

        let estimated_duration = EstimatedDuration::from_seconds(
            self.config.base_seconds + self.config.per_operation_seconds * operations.len() as u64,
        );

        let targets: Vec<&str> = patterns.iter().map(|p| p.table_name.as_str()).collect();
        let title = if targets.is_empty() {
            "Schema enhancements".to_string()
        } else {
            format!("Import into {}", targets.join(", "))
        };
        let description = format!(
            "{} operation(s) to accommodate {} sampled record(s)",
            operations.len(),
            sample.len()
        );

        let mut preflight_checks = vec![
            "Confirm the live schema still matches the analyzed snapshot".to_string(),
            "Confirm no other migration is in progress".to_string(),
        ];
        if backup_required {
            preflight_checks.push("Take a full backup before applying".to_string());
        }

        let mut postflight_validations: Vec<String> = Vec::new();
        for op in &operations {
            for check in &op.validations {
                if !postflight_validations.contains(check) {
                    postflight_validations.push(check.clone());
                }
            }
        }
        for table in &targets {
            postflight_validations.push(format!(
                "Insert the {} sampled record(s) into '{}' and read them back",
                sample.len(),
                table
            ));
        }

        tracing::debug!(
            operations = operations.len(),
            backup_required,
            seconds = estimated_duration.seconds,
            "Migration plan built"
        );

        MigrationPlan {
            id: Uuid::new_v4(),
            title,
            description,
            operations,
            estimated_duration,
            backup_required,
            rollback_sequence,
            preflight_checks,
            postflight_validations,
            created_at: Utc::now(),
        }
    }

    fn plan_pattern(&self, pattern: &ImportDataPattern, analysis: &SchemaAnalysis, draft: &mut Draft) {
        let name = pattern.table_name.as_str();

        if draft.table(name, analysis).is_none() {
            let table = self.new_table(pattern);
            let id = draft.next_id();
            let qualified = table.qualified_name();
            let op = MigrationOperation::new(
                &id,
                OperationKind::CreateTable,
                name,
                SchemaChange::CreateTable {
                    table: table.clone(),
                },
                SchemaChange::DropTable {
                    schema: table.schema.clone(),
                    table: name.to_string(),
                },
            )
            .with_description(format!(
                "Create table '{}' with {} column(s), row-level security and owner policies",
                name,
                table.columns.len()
            ))
            .with_validation(format!("Table {} exists", qualified))
            .with_validation(format!("Row-level security is enabled on {}", qualified));

            for column in &table.columns {
                draft
                    .columns
                    .insert((name.to_string(), column.name.clone()), id.clone());
            }
            draft.created.insert(name.to_string(), id);
            draft.tables.insert(name.to_string(), table);
            draft.operations.push(op);
        } else {
            for mapping in pattern.unmatched_fields() {
                let column_name = mapping.target_column().to_string();
                let Some(table) = draft.table(name, analysis) else {
                    continue;
                };
                if table.has_column(&column_name) {
                    continue;
                }
                let schema = table.schema.clone();
                let column = ColumnInfo::new(&column_name, mapping.inferred_type.sql_type());

                let id = draft.next_id();
                let mut op = MigrationOperation::new(
                    &id,
                    OperationKind::AddColumn,
                    name,
                    SchemaChange::AddColumn {
                        schema: schema.clone(),
                        table: name.to_string(),
                        column: column.clone(),
                    },
                    SchemaChange::DropColumn {
                        schema,
                        table: name.to_string(),
                        column: column_name.clone(),
                    },
                )
                .with_description(format!(
                    "Add nullable column '{}' ({}) to '{}'",
                    column_name, column.data_type, name
                ))
                .with_validation(format!("Column {}.{} exists", name, column_name));
                if let Some(create) = draft.created.get(name) {
                    op = op.depends_on(create);
                }

                if let Some(t) = draft.table_mut(name, analysis) {
                    t.columns.push(column);
                }
                draft.columns.insert((name.to_string(), column_name), id);
                draft.operations.push(op);
            }
        }

        self.plan_foreign_keys(pattern, analysis, draft);
    }

    fn plan_foreign_keys(&self, pattern: &ImportDataPattern, analysis: &SchemaAnalysis, draft: &mut Draft) {
        let name = pattern.table_name.as_str();

        for mapping in &pattern.mappings {
            let Some(guess) = &mapping.foreign_key else {
                continue;
            };
            if guess.confidence < self.config.foreign_key_confidence || guess.table == name {
                continue;
            }
            let column_name = mapping.target_column();
            let introduced = draft
                .columns
                .contains_key(&(name.to_string(), column_name.to_string()));
            if mapping.match_kind != MatchKind::Exact && !introduced {
                tracing::debug!(
                    field = %mapping.source_field,
                    column = %column_name,
                    "Skipping reference guess on a partially matched column"
                );
                continue;
            }

            let Some(target) = draft.table(&guess.table, analysis) else {
                continue;
            };
            if !target.has_column(&guess.column) {
                tracing::debug!(
                    field = %mapping.source_field,
                    target = %guess.table,
                    "Guessed reference target has no such column"
                );
                continue;
            }
            let target_schema = target.schema.clone();

            let Some(table) = draft.table(name, analysis) else {
                continue;
            };
            let Some(column) = table.column(column_name) else {
                continue;
            };
            // Primary keys never reference another table; column-level
            // references already are foreign keys
            let columns = vec![column_name.to_string()];
            if column.is_primary_key
                || column.is_foreign_key()
                || table.foreign_keys.iter().any(|fk| fk.columns == columns)
            {
                continue;
            }
            let schema = table.schema.clone();

            let mut foreign_key = ForeignKeyInfo::new(
                format!("{}_{}_fkey", name, column_name),
                column_name,
                &guess.table,
                &guess.column,
            );
            if target_schema != schema {
                foreign_key.referenced_schema = Some(target_schema);
            }

            let id = draft.next_id();
            let mut op = MigrationOperation::new(
                &id,
                OperationKind::AddConstraint,
                name,
                SchemaChange::AddForeignKey {
                    schema: schema.clone(),
                    table: name.to_string(),
                    foreign_key: foreign_key.clone(),
                },
                SchemaChange::DropConstraint {
                    schema,
                    table: name.to_string(),
                    name: foreign_key.name.clone(),
                },
            )
            .with_risk(RiskLevel::Medium)
            .with_description(format!(
                "Reference {}.{} from {}.{} (guessed with confidence {:.1})",
                guess.table, guess.column, name, column_name, guess.confidence
            ))
            .with_validation(format!("Constraint {} exists", foreign_key.name));

            if let Some(introducing) = draft.columns.get(&(name.to_string(), column_name.to_string())) {
                op = op.depends_on(introducing);
            }
            if let Some(create) = draft.created.get(&guess.table) {
                op = op.depends_on(create);
            }

            if let Some(t) = draft.table_mut(name, analysis) {
                t.foreign_keys.push(foreign_key);
            }
            draft.operations.push(op);
        }
    }

    fn plan_suggestion(&self, suggestion: &EnhancementSuggestion, draft: &mut Draft) {
        let id = draft.next_id();
        let op = match suggestion.kind {
            SuggestionKind::AddIndex => {
                let index = IndexInfo::new(suggestion.index_name(), suggestion.columns.clone());
                MigrationOperation::new(
                    &id,
                    OperationKind::AddIndex,
                    &suggestion.table,
                    SchemaChange::CreateIndex {
                        schema: suggestion.schema.clone(),
                        table: suggestion.table.clone(),
                        index: index.clone(),
                    },
                    SchemaChange::DropIndex {
                        schema: suggestion.schema.clone(),
                        name: index.name.clone(),
                    },
                )
                .with_description(format!(
                    "Index '{}' ({})",
                    suggestion.table,
                    suggestion.columns.join(", ")
                ))
                .with_validation(format!("Index {} exists", index.name))
            }
            SuggestionKind::EnableRls => MigrationOperation::new(
                &id,
                OperationKind::AddAccessPolicy,
                &suggestion.table,
                SchemaChange::EnableRls {
                    schema: suggestion.schema.clone(),
                    table: suggestion.table.clone(),
                },
                SchemaChange::DisableRls {
                    schema: suggestion.schema.clone(),
                    table: suggestion.table.clone(),
                },
            )
            .with_risk(RiskLevel::Medium)
            .with_description(format!(
                "Enable row-level security on '{}'",
                suggestion.table
            ))
            .with_validation(format!(
                "Row-level security is enabled on {}.{}",
                suggestion.schema, suggestion.table
            )),
        };
        draft.operations.push(op);
    }

    /// Table created for a pattern with no existing match
    fn new_table(&self, pattern: &ImportDataPattern) -> TableDescriptor {
        let owner = self.config.owner_column.as_str();
        let name = pattern.table_name.as_str();

        let mut table = TableDescriptor::new(name)
            .with_schema(&self.config.schema)
            .with_column(
                ColumnInfo::new("id", "uuid")
                    .primary_key()
                    .with_default("gen_random_uuid()"),
            );

        for mapping in &pattern.mappings {
            let column = mapping.target_column();
            if column == owner || MANAGED_COLUMNS.contains(&column) || table.has_column(column) {
                continue;
            }
            table = table.with_column(ColumnInfo::new(column, mapping.inferred_type.sql_type()));
        }

        table = table
            .with_column(
                ColumnInfo::new(owner, "uuid")
                    .not_null()
                    .with_default(&self.config.owner_default),
            )
            .with_column(
                ColumnInfo::new("created_at", "timestamptz")
                    .not_null()
                    .with_default("now()"),
            )
            .with_column(
                ColumnInfo::new("updated_at", "timestamptz")
                    .not_null()
                    .with_default("now()"),
            )
            .with_rls(true);

        let owner_check = format!("{} = {}", self.config.owner_default, owner);
        for (suffix, command) in [
            ("select", PolicyCommand::Select),
            ("insert", PolicyCommand::Insert),
            ("update", PolicyCommand::Update),
            ("delete", PolicyCommand::Delete),
        ] {
            let policy = PolicyInfo::new(format!("{}_{}_own", name, suffix), command)
                .for_role(&self.config.policy_role);
            let policy = match command {
                PolicyCommand::Insert => policy.with_check(&owner_check),
                PolicyCommand::Update => policy.using(&owner_check).with_check(&owner_check),
                _ => policy.using(&owner_check),
            };
            table = table.with_policy(policy);
        }

        table
    }
}
