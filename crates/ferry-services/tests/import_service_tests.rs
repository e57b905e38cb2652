//! Integration tests for ImportService
//!
//! Drives full import runs against a mock schema source and checks the
//! status classification, recommendations and dry-run rendering.

mod common;

use std::sync::Arc;

use ferry_core::{ImportConfig, Record, SchemaSource, Value};
use ferry_migration::{MigrationOperation, OperationKind, SafetyCategory, SchemaChange};
use ferry_schema::SuggestionKind;
use ferry_services::{ImportPreferences, ImportResult, ImportService, ImportStatus, ServiceError};
use pretty_assertions::assert_eq;

use common::{
    MockSchemaSource, contact_records, note_records, orders_and_customers,
    profiles_and_facilities, record, secured_tables,
};

fn service(source: MockSchemaSource) -> ImportService {
    ImportService::new(Arc::new(source) as Arc<dyn SchemaSource>, ImportConfig::default())
        .expect("default config is valid")
}

async fn run(service: &ImportService, records: &[Record], label: &str) -> ImportResult {
    service.run(records, label, &ImportPreferences::new()).await
}

// ============ Pattern Matching Scenarios ============

#[tokio::test]
async fn unmatched_batch_falls_back_to_new_table() {
    let service = service(MockSchemaSource::new(profiles_and_facilities()));

    let result = run(&service, &contact_records(), "contacts.csv").await;

    assert_eq!(result.patterns.len(), 1);
    let pattern = &result.patterns[0];
    assert_eq!(pattern.table_name, "contacts");
    assert!(pattern.is_new_table);
    assert_eq!(pattern.confidence, 1.0);

    let plan = result.plan.as_ref().expect("plan for the new table");
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.operations[0].kind, OperationKind::CreateTable);
}

#[tokio::test]
async fn one_new_table_over_two_tables_is_a_performance_warning() {
    let service = service(MockSchemaSource::new(profiles_and_facilities()));

    let result = run(&service, &contact_records(), "contacts.csv").await;

    assert_eq!(result.status, ImportStatus::Warning);
    let failed: Vec<SafetyCategory> = result
        .safety_checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.category)
        .collect();
    assert_eq!(failed, vec![SafetyCategory::Performance]);
    assert!(result.next_steps[0].starts_with("Review performance warning"));
    assert!(result.recommendations.contains(&"1 safety check(s) failed".to_string()));
}

#[tokio::test]
async fn unindexed_foreign_key_is_suggested_once() {
    let service = service(MockSchemaSource::new(orders_and_customers()));

    let analysis = service.analyze().await.expect("mock source loads");

    let index_suggestions: Vec<_> = analysis
        .suggestions
        .iter()
        .filter(|s| s.kind == SuggestionKind::AddIndex)
        .collect();
    assert_eq!(index_suggestions.len(), 1);
    assert_eq!(index_suggestions[0].table, "orders");
    assert_eq!(index_suggestions[0].columns, vec!["customer_id".to_string()]);
    assert!(
        !analysis
            .suggestions
            .iter()
            .any(|s| s.kind == SuggestionKind::EnableRls)
    );
}

#[tokio::test]
async fn single_create_table_plan_succeeds() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = run(&service, &note_records(), "notes.csv").await;

    let plan = result.plan.as_ref().expect("plan for the new table");
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.operations[0].kind, OperationKind::CreateTable);
    assert_eq!(result.safety_checks.len(), 4);
    assert!(result.safety_checks.iter().all(|c| c.passed));
    assert_eq!(result.status, ImportStatus::Success);
    assert!(result.is_success());
    assert_eq!(result.error, None);
}

// ============ Status Classification ============

#[tokio::test]
async fn introspection_failure_yields_error_result() {
    let service = service(MockSchemaSource::empty().with_failure());

    let result = run(&service, &note_records(), "notes.csv").await;

    assert_eq!(result.status, ImportStatus::Error);
    assert_eq!(result.analysis.table_count(), 0);
    assert!(result.patterns.is_empty());
    assert_eq!(result.plan, None);
    assert_eq!(result.bindings, None);
    let error = result.error.expect("diagnostic is recorded");
    assert!(error.contains("catalog unreachable"));
}

#[tokio::test]
async fn low_confidence_candidates_are_discarded() {
    let service = service(MockSchemaSource::new(orders_and_customers()));
    let records = vec![record(&[
        ("id", Value::from("a1")),
        ("customer_id", Value::from("c1")),
        ("total", Value::Integer(12)),
    ])];

    let result = run(&service, &records, "orders.json").await;

    assert!(result.patterns.is_empty());
    assert_eq!(result.plan, None);
    assert!(result.safety_checks.is_empty());
    assert_eq!(result.status, ImportStatus::RequiresApproval);
    assert!(
        result
            .recommendations
            .contains(&"2 candidate table(s) fell below the 70% confidence threshold".to_string())
    );
}

#[tokio::test]
async fn surviving_pattern_below_approval_confidence_needs_review() {
    let config = ImportConfig::default().with_confidence_threshold(0.6);
    let service = ImportService::new(
        Arc::new(MockSchemaSource::new(orders_and_customers())),
        config,
    )
    .expect("config is valid");
    let records = vec![record(&[
        ("id", Value::from("a1")),
        ("customer_id", Value::from("c1")),
        ("total", Value::Integer(12)),
    ])];

    let result = run(&service, &records, "orders.json").await;

    assert_eq!(result.status, ImportStatus::RequiresApproval);
    assert!(
        result
            .next_steps
            .iter()
            .any(|s| s.starts_with("Confirm the mapping to 'orders'"))
    );
    let plan = result.plan.expect("surviving patterns are planned");
    assert!(plan.has_kind(OperationKind::AddIndex));
    assert!(plan.has_kind(OperationKind::AddColumn));
}

#[tokio::test]
async fn requested_approval_wins_over_success() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = service
        .run(&note_records(), "notes.csv", &ImportPreferences::new().with_approval())
        .await;

    assert_eq!(result.status, ImportStatus::RequiresApproval);
    assert_eq!(
        result.next_steps,
        vec!["Review the plan: manual approval was requested".to_string()]
    );
}

#[tokio::test]
async fn auto_apply_within_risk_ceiling() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = service
        .run(&note_records(), "notes.csv", &ImportPreferences::new().with_auto_apply())
        .await;

    assert_eq!(result.status, ImportStatus::Success);
    assert!(result.next_steps[0].starts_with("Apply the plan automatically"));
}

#[tokio::test]
async fn skipped_safety_checks_are_not_reported() {
    let service = service(MockSchemaSource::new(profiles_and_facilities()));

    let result = service
        .run(
            &contact_records(),
            "contacts.csv",
            &ImportPreferences::new().without_safety_checks(),
        )
        .await;

    assert!(result.safety_checks.is_empty());
    assert_eq!(result.status, ImportStatus::Success);
}

// ============ Bindings ============

#[tokio::test]
async fn bindings_include_the_planned_table() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = run(&service, &note_records(), "notes.csv").await;

    let bindings = result.bindings.expect("bindings are generated by default");
    let notes = bindings.table_file("notes").expect("module for the new table");
    assert!(notes.contents.contains("export interface Notes {"));
    assert_eq!(bindings.table_count(), 4);
}

#[tokio::test]
async fn preference_overrides_binding_toggle() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = service
        .run(
            &note_records(),
            "notes.csv",
            &ImportPreferences::new().with_bindings(false),
        )
        .await;

    assert_eq!(result.bindings, None);
}

#[tokio::test]
async fn target_table_preference_names_the_new_table() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = service
        .run(
            &note_records(),
            "export-2024.csv",
            &ImportPreferences::new().with_target_table("meeting_notes"),
        )
        .await;

    assert_eq!(result.patterns[0].table_name, "meeting_notes");
}

// ============ Dry Run ============

#[tokio::test]
async fn dry_run_renders_every_operation() {
    let service = service(MockSchemaSource::new(secured_tables()));
    let result = run(&service, &note_records(), "notes.csv").await;
    let plan = result.plan.expect("plan for the new table");

    let report = service.execute(&plan, true).expect("dry run is supported");

    assert!(report.dry_run);
    assert!(report.is_clean());
    assert_eq!(report.outcomes.len(), 1);
    let forward = report.outcomes[0].forward_sql.as_deref().unwrap_or_default();
    assert!(forward.contains("CREATE TABLE"));
    assert_eq!(report.rollback_sequence, plan.rollback_sequence);
    assert_eq!(report.rollback_script.len(), 1);
    assert!(report.rollback_script[0].contains("DROP TABLE"));
}

#[tokio::test]
async fn dry_run_records_failures_and_continues() {
    let service = service(MockSchemaSource::new(secured_tables()));
    let result = run(&service, &note_records(), "notes.csv").await;
    let mut plan = result.plan.expect("plan for the new table");
    plan.operations.push(MigrationOperation::new(
        "op_999",
        OperationKind::AddIndex,
        "",
        SchemaChange::DropIndex {
            schema: "public".to_string(),
            name: String::new(),
        },
        SchemaChange::DropIndex {
            schema: "public".to_string(),
            name: String::new(),
        },
    ));

    let report = service.execute(&plan, true).expect("dry run is supported");

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.outcomes[1].error.is_some());
}

#[tokio::test]
async fn real_execution_is_refused() {
    let service = service(MockSchemaSource::new(secured_tables()));
    let result = run(&service, &note_records(), "notes.csv").await;
    let plan = result.plan.expect("plan for the new table");

    let err = service.execute(&plan, false).unwrap_err();

    assert!(matches!(err, ServiceError::DryRunOnly));
}

// ============ Service Behavior ============

#[tokio::test]
async fn schema_is_introspected_once_per_run() {
    let source = Arc::new(MockSchemaSource::new(secured_tables()));
    let service = ImportService::new(source.clone(), ImportConfig::default())
        .expect("default config is valid");

    run(&service, &note_records(), "notes.csv").await;
    assert_eq!(source.load_count(), 1);

    run(&service, &note_records(), "notes.csv").await;
    assert_eq!(source.load_count(), 2);
}

#[tokio::test]
async fn invalid_configuration_is_rejected() {
    let config = ImportConfig::default().with_confidence_threshold(1.5);

    let err = ImportService::new(Arc::new(MockSchemaSource::empty()), config)
        .err()
        .expect("threshold above one is invalid");

    assert!(matches!(err, ServiceError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn result_serializes_with_snake_case_status() {
    let service = service(MockSchemaSource::new(secured_tables()));

    let result = service
        .run(&note_records(), "notes.csv", &ImportPreferences::new().with_approval())
        .await;

    let json = serde_json::to_value(&result).expect("result serializes");
    assert_eq!(json["status"], "requires_approval");
    assert_eq!(json["source_label"], "notes.csv");

    let restored: ImportResult = serde_json::from_value(json).expect("result deserializes");
    assert_eq!(restored.status, result.status);
    assert_eq!(restored.plan, result.plan);
}
