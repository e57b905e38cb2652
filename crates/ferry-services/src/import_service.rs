//! Import orchestration
//!
//! Runs analysis, pattern matching, planning, safety checks and binding
//! generation in sequence for one batch of records and classifies the
//! outcome. A run never fails outright: introspection failures come back as
//! a result with status `error`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use ferry_bindings::BindingGenerator;
use ferry_core::naming::to_snake_name;
use ferry_core::{ImportConfig, Record, SchemaSource};
use ferry_migration::{MigrationPlan, MigrationPlanner, SafetyCheckResult, SafetyChecker, SqlRenderer};
use ferry_schema::{ImportDataPattern, ImportMatcher, SchemaAnalysis, SchemaAnalyzer};

use crate::error::{ServiceError, ServiceResult};
use crate::view_models::{
    ExecutionReport, ImportPreferences, ImportResult, ImportStatus, OperationOutcome,
};

/// Patterns below this confidence always need a person to confirm them
pub const APPROVAL_CONFIDENCE: f64 = 0.7;

/// Table name used for new tables when the source label yields none
pub const DEFAULT_TABLE_NAME: &str = "imported_data";

/// Service that turns a record batch into a reviewed migration plan
///
/// Components are constructed once and reused across runs; runs share no
/// mutable state.
pub struct ImportService {
    source: Arc<dyn SchemaSource>,
    config: ImportConfig,
    analyzer: SchemaAnalyzer,
    matcher: ImportMatcher,
    planner: MigrationPlanner,
    checker: SafetyChecker,
    generator: BindingGenerator,
    renderer: SqlRenderer,
}

impl ImportService {
    /// Create a service with default components
    pub fn new(source: Arc<dyn SchemaSource>, config: ImportConfig) -> ServiceResult<Self> {
        config
            .validate()
            .map_err(|e| ServiceError::InvalidConfiguration(e.to_string()))?;

        let matcher = ImportMatcher::new().with_max_sample_records(config.max_sample_records);
        Ok(Self {
            source,
            config,
            analyzer: SchemaAnalyzer::new(),
            matcher,
            planner: MigrationPlanner::new(),
            checker: SafetyChecker::new(),
            generator: BindingGenerator::new(),
            renderer: SqlRenderer::new(),
        })
    }

    pub fn with_analyzer(mut self, analyzer: SchemaAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// The sample cap from the configuration still applies
    pub fn with_matcher(mut self, matcher: ImportMatcher) -> Self {
        self.matcher = matcher.with_max_sample_records(self.config.max_sample_records);
        self
    }

    pub fn with_planner(mut self, planner: MigrationPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_renderer(mut self, renderer: SqlRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Introspect and analyze the live schema
    pub async fn analyze(&self) -> ServiceResult<SchemaAnalysis> {
        self.analyzer
            .analyze(self.source.as_ref())
            .await
            .map_err(|e| ServiceError::Introspection(e.to_string()))
    }

    /// Run the full pipeline for one batch
    #[tracing::instrument(
        skip(self, records, preferences),
        fields(source = %source_label, records = records.len())
    )]
    pub async fn run(
        &self,
        records: &[Record],
        source_label: &str,
        preferences: &ImportPreferences,
    ) -> ImportResult {
        let session_id = Uuid::new_v4();
        tracing::info!(%session_id, "Starting import run");

        let analysis = match self.analyze().await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(%session_id, "Import run aborted: {}", e);
                return ImportResult {
                    session_id,
                    source_label: source_label.to_string(),
                    analysis: SchemaAnalysis::empty(),
                    patterns: Vec::new(),
                    plan: None,
                    safety_checks: Vec::new(),
                    bindings: None,
                    recommendations: Vec::new(),
                    status: ImportStatus::Error,
                    next_steps: vec![
                        "Check that the schema source is reachable and returns valid metadata"
                            .to_string(),
                    ],
                    error: Some(e.to_string()),
                    completed_at: Utc::now(),
                };
            }
        };

        let sample = &records[..records.len().min(self.config.max_sample_records)];
        let table_name = preferences
            .target_table
            .clone()
            .unwrap_or_else(|| table_name_for(source_label));
        let matched = self.matcher.match_import_data_as(sample, &analysis, &table_name);
        let matched_count = matched.len();
        let patterns: Vec<ImportDataPattern> = matched
            .into_iter()
            .filter(|p| p.confidence >= self.config.confidence_threshold)
            .collect();
        tracing::debug!(
            matched = matched_count,
            kept = patterns.len(),
            threshold = self.config.confidence_threshold,
            "Filtered import patterns"
        );

        let plan = if patterns.is_empty() {
            None
        } else {
            Some(self.planner.plan(&patterns, &analysis, sample))
        };

        let run_checks = self.config.run_safety_checks && !preferences.skip_safety_checks;
        let safety_checks = match &plan {
            Some(plan) if run_checks => self.checker.check(plan, &analysis),
            _ => Vec::new(),
        };

        let generate = preferences
            .generate_bindings
            .unwrap_or(self.config.generate_bindings);
        let bindings = generate.then(|| self.generator.generate(&analysis, plan.as_ref()));

        let mut recommendations =
            self.recommendations(&analysis, &patterns, matched_count, &safety_checks);
        if let Some(bindings) = &bindings {
            for conflict in &bindings.conflicts {
                recommendations.push(format!(
                    "Tables {} share the type name '{}'",
                    conflict.tables.join(", "),
                    conflict.type_name
                ));
            }
        }

        let (status, next_steps) =
            self.decide_status(plan.as_ref(), &patterns, &safety_checks, preferences);
        tracing::info!(%session_id, %status, "Import run finished");

        ImportResult {
            session_id,
            source_label: source_label.to_string(),
            analysis,
            patterns,
            plan,
            safety_checks,
            bindings,
            recommendations,
            status,
            next_steps,
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// Render a plan without applying it
    ///
    /// Rendering failures are recorded per operation and do not stop the
    /// remaining operations. Real execution is refused with
    /// [`ServiceError::DryRunOnly`].
    pub fn execute(&self, plan: &MigrationPlan, dry_run: bool) -> ServiceResult<ExecutionReport> {
        if !dry_run {
            tracing::warn!(plan = %plan.id, "Refusing to apply plan against a live store");
            return Err(ServiceError::DryRunOnly);
        }

        let outcomes: Vec<OperationOutcome> = plan
            .operations
            .iter()
            .map(|op| {
                let forward = self.renderer.render(&op.forward);
                let rollback = self.renderer.render(&op.rollback);
                let error = match (&forward, &rollback) {
                    (Err(e), _) => Some(format!("forward: {}", e)),
                    (_, Err(e)) => Some(format!("rollback: {}", e)),
                    _ => None,
                };
                if let Some(error) = &error {
                    tracing::warn!(operation = %op.id, "Dry run rendering failed: {}", error);
                }
                OperationOutcome {
                    operation_id: op.id.clone(),
                    forward_sql: forward.ok(),
                    rollback_sql: rollback.ok(),
                    error,
                }
            })
            .collect();

        let rollback_script = plan
            .rollback_sequence
            .iter()
            .filter_map(|id| outcomes.iter().find(|o| &o.operation_id == id))
            .filter_map(|o| o.rollback_sql.clone())
            .collect();

        let report = ExecutionReport {
            plan_id: plan.id,
            dry_run: true,
            outcomes,
            rollback_sequence: plan.rollback_sequence.clone(),
            rollback_script,
        };
        tracing::debug!(
            plan = %plan.id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Dry run complete"
        );
        Ok(report)
    }

    fn recommendations(
        &self,
        analysis: &SchemaAnalysis,
        patterns: &[ImportDataPattern],
        matched_count: usize,
        safety_checks: &[SafetyCheckResult],
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        for pattern in patterns {
            let target = if pattern.is_new_table {
                format!("new table '{}'", pattern.table_name)
            } else {
                format!("table '{}'", pattern.table_name)
            };
            recommendations.push(format!(
                "Data matches {} with {:.0}% confidence",
                target,
                pattern.confidence * 100.0
            ));
        }

        let discarded = matched_count - patterns.len();
        if discarded > 0 {
            recommendations.push(format!(
                "{} candidate table(s) fell below the {:.0}% confidence threshold",
                discarded,
                self.config.confidence_threshold * 100.0
            ));
        }

        let failed = safety_checks.iter().filter(|c| !c.passed).count();
        if failed > 0 {
            recommendations.push(format!("{} safety check(s) failed", failed));
        }

        if !analysis.suggestions.is_empty() {
            recommendations.push(format!(
                "{} schema enhancement(s) suggested",
                analysis.suggestions.len()
            ));
        }

        if self.config.enforce_naming {
            recommendations.extend(analysis.naming.issues.iter().map(|i| i.message.clone()));
            for pattern in patterns {
                recommendations.extend(
                    pattern
                        .suggestions
                        .iter()
                        .filter(|s| s.contains("snake_case"))
                        .cloned(),
                );
            }
        }

        recommendations
    }

    /// Status in strict order: blocking failure, approval, warning, success
    fn decide_status(
        &self,
        plan: Option<&MigrationPlan>,
        patterns: &[ImportDataPattern],
        safety_checks: &[SafetyCheckResult],
        preferences: &ImportPreferences,
    ) -> (ImportStatus, Vec<String>) {
        let blocking: Vec<&SafetyCheckResult> = safety_checks
            .iter()
            .filter(|c| c.is_blocking_failure())
            .collect();
        if !blocking.is_empty() {
            let steps = blocking
                .iter()
                .map(|c| {
                    format!(
                        "Fix blocking {} issue: {}",
                        c.category,
                        c.warning.as_deref().unwrap_or(&c.description)
                    )
                })
                .collect();
            return (ImportStatus::Error, steps);
        }

        let high_risk: Vec<&str> = plan
            .map(|p| {
                p.operations
                    .iter()
                    .filter(|op| op.is_high_risk())
                    .map(|op| op.id.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let unsure: Vec<&ImportDataPattern> = patterns
            .iter()
            .filter(|p| p.confidence < APPROVAL_CONFIDENCE)
            .collect();

        let approval_reasons = {
            let mut steps = Vec::new();
            if preferences.require_approval {
                steps.push("Review the plan: manual approval was requested".to_string());
            }
            if !high_risk.is_empty() {
                steps.push(format!(
                    "Review high-risk operations: {}",
                    high_risk.join(", ")
                ));
            }
            for pattern in &unsure {
                steps.push(format!(
                    "Confirm the mapping to '{}' ({:.0}% confidence)",
                    pattern.table_name,
                    pattern.confidence * 100.0
                ));
            }
            if plan.is_none() {
                steps.push(
                    "No table matched confidently; map the fields manually or lower the confidence threshold"
                        .to_string(),
                );
            }
            steps
        };
        if !approval_reasons.is_empty() {
            return (ImportStatus::RequiresApproval, approval_reasons);
        }

        let warnings: Vec<&SafetyCheckResult> = safety_checks
            .iter()
            .filter(|c| c.is_warning())
            .collect();
        if !warnings.is_empty() {
            let mut steps: Vec<String> = warnings
                .iter()
                .map(|c| {
                    format!(
                        "Review {} warning: {}",
                        c.category,
                        c.warning.as_deref().unwrap_or(&c.description)
                    )
                })
                .collect();
            steps.push("Apply the plan once the warnings are understood".to_string());
            return (ImportStatus::Warning, steps);
        }

        let mut steps = Vec::new();
        match plan {
            Some(plan) if plan.is_empty() => {
                steps.push("The schema already fits this data; import the records".to_string());
            }
            Some(plan) if preferences.auto_apply && plan.max_risk() <= self.config.auto_migration_risk => {
                steps.push(format!(
                    "Apply the plan automatically: every operation is within the '{}' risk ceiling",
                    self.config.auto_migration_risk
                ));
            }
            _ => {
                steps.push("Review the plan and apply it when ready".to_string());
            }
        }
        steps.push("Import the records after the plan is applied".to_string());
        (ImportStatus::Success, steps)
    }
}

/// Snake-case table name derived from a source label
pub fn table_name_for(source_label: &str) -> String {
    let stem = source_label
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_label);
    let stem = stem.split('.').next().unwrap_or(stem);
    let name = to_snake_name(stem);
    if name.is_empty() {
        DEFAULT_TABLE_NAME.to_string()
    } else {
        name
    }
}
