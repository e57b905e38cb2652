//! Tests for the schema analyzer

use super::*;
use async_trait::async_trait;
use ferry_core::{ColumnInfo, ForeignKeyInfo, IndexInfo, StaticSchemaSource};

fn table(name: &str) -> TableDescriptor {
    TableDescriptor::new(name)
        .with_column(ColumnInfo::new("id", "uuid").primary_key())
        .with_rls(true)
}

fn with_fk(table: TableDescriptor, column: &str, target: &str) -> TableDescriptor {
    let fk_name = format!("{}_{}_fkey", table.name, column);
    table
        .with_column(ColumnInfo::new(column, "uuid").references(target, "id"))
        .with_foreign_key(ForeignKeyInfo::new(fk_name, column, target, "id"))
}

fn analyze(tables: Vec<TableDescriptor>) -> SchemaAnalysis {
    SchemaAnalyzer::new().analyze_tables(tables).unwrap()
}

mod relationship_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_are_table_names() {
        let analysis = analyze(vec![
            table("customers"),
            with_fk(table("orders"), "customer_id", "customers"),
        ]);
        let keys: Vec<&str> = analysis.relationships.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["customers", "orders"]);
    }

    #[test]
    fn test_parent_child_edges_mirror() {
        let analysis = analyze(vec![
            table("customers"),
            table("products"),
            with_fk(
                with_fk(table("orders"), "customer_id", "customers"),
                "product_id",
                "products",
            ),
        ]);

        for (name, rel) in &analysis.relationships {
            for parent in &rel.parents {
                assert!(analysis.relationships[parent].children.contains(name));
            }
            for child in &rel.children {
                assert!(analysis.relationships[child].parents.contains(name));
            }
        }
        assert_eq!(
            analysis.relationships["orders"].parents,
            vec!["customers".to_string(), "products".to_string()]
        );
    }

    #[test]
    fn test_many_to_many_through_junction() {
        let analysis = analyze(vec![
            table("students"),
            table("courses"),
            with_fk(
                with_fk(table("enrollments"), "student_id", "students"),
                "course_id",
                "courses",
            ),
        ]);

        assert_eq!(
            analysis.relationships["students"].many_to_many,
            vec![ManyToManyHint {
                through: "enrollments".to_string(),
                target: "courses".to_string(),
            }]
        );
        assert_eq!(
            analysis.relationships["courses"].many_to_many[0].target,
            "students"
        );
        assert!(analysis.relationships["enrollments"].many_to_many.is_empty());
    }

    #[test]
    fn test_reference_outside_snapshot_not_mapped() {
        let analysis = analyze(vec![with_fk(table("profiles"), "user_id", "users")]);
        assert!(analysis.relationships["profiles"].parents.is_empty());
        assert_eq!(analysis.relationships.len(), 1);
    }
}

mod issue_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cycle_issue_is_high_and_manual() {
        let analysis = analyze(vec![
            with_fk(table("employees"), "manager_id", "employees"),
            with_fk(table("badges"), "employee_id", "employees"),
        ]);

        let cycles: Vec<&SchemaIssue> = analysis
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::CircularDependency)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, Severity::High);
        assert_eq!(cycles[0].tables, vec!["employees"]);
        assert!(!cycles[0].auto_fixable);
        assert_eq!(
            analysis.relationships["employees"].circular,
            vec!["employees"]
        );
        assert!(analysis.relationships["badges"].circular.is_empty());
    }

    #[test]
    fn test_public_table_without_rls_is_critical() {
        let analysis = analyze(vec![
            table("notes").with_rls(false),
            table("audit").with_schema("internal").with_rls(false),
        ]);

        let rls: Vec<&SchemaIssue> = analysis
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::RlsDisabled)
            .collect();
        assert_eq!(rls.len(), 1);
        assert_eq!(rls[0].tables, vec!["notes"]);
        assert_eq!(rls[0].severity, Severity::Critical);
        assert!(rls[0].auto_fixable);
    }

    #[test]
    fn test_orphaned_table_reported() {
        let analysis = analyze(vec![
            table("customers"),
            with_fk(table("orders"), "customer_id", "customers"),
            table("settings"),
        ]);

        let orphans: Vec<&str> = analysis
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::Orphaned)
            .map(|i| i.tables[0].as_str())
            .collect();
        assert_eq!(orphans, vec!["settings"]);
    }

    #[test]
    fn test_custom_public_schema() {
        let analyzer =
            SchemaAnalyzer::with_config(AnalyzerConfig::new().with_public_schema("api"));
        let analysis = analyzer
            .analyze_tables(vec![table("notes").with_schema("api").with_rls(false)])
            .unwrap();
        assert!(analysis.issues.iter().any(|i| i.kind == IssueKind::RlsDisabled));
    }
}

mod suggestion_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unindexed_foreign_key_gets_one_index_suggestion() {
        let analysis = analyze(vec![
            table("customers"),
            with_fk(table("orders"), "customer_id", "customers"),
        ]);

        let index: Vec<&EnhancementSuggestion> = analysis
            .suggestions
            .iter()
            .filter(|s| s.kind == SuggestionKind::AddIndex)
            .collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].table, "orders");
        assert_eq!(index[0].columns, vec!["customer_id"]);
        assert_eq!(
            index[0].sql_preview,
            "CREATE INDEX idx_orders_customer_id ON public.orders (customer_id);"
        );
        assert!(
            !analysis
                .suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::EnableRls)
        );
    }

    #[test]
    fn test_leading_index_suppresses_suggestion() {
        let orders = with_fk(table("orders"), "customer_id", "customers")
            .with_column(ColumnInfo::new("placed_at", "timestamptz"))
            .with_index(IndexInfo::new(
                "orders_customer_placed_idx",
                vec!["customer_id".to_string(), "placed_at".to_string()],
            ));
        let analysis = analyze(vec![table("customers"), orders]);
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_trailing_index_column_does_not_count() {
        let orders = with_fk(table("orders"), "customer_id", "customers")
            .with_column(ColumnInfo::new("placed_at", "timestamptz"))
            .with_index(IndexInfo::new(
                "orders_placed_customer_idx",
                vec!["placed_at".to_string(), "customer_id".to_string()],
            ));
        let analysis = analyze(vec![table("customers"), orders]);
        assert_eq!(analysis.suggestions.len(), 1);
    }

    #[test]
    fn test_primary_key_reference_is_indexed() {
        // one-to-one extension table keyed by the parent id
        let profiles = TableDescriptor::new("profile_settings")
            .with_column(
                ColumnInfo::new("id", "uuid")
                    .primary_key()
                    .references("profiles", "id"),
            )
            .with_foreign_key(ForeignKeyInfo::new(
                "profile_settings_id_fkey",
                "id",
                "profiles",
                "id",
            ))
            .with_rls(true);
        let analysis = analyze(vec![table("profiles"), profiles]);
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_enable_rls_suggestion() {
        let analysis = analyze(vec![table("notes").with_rls(false)]);
        assert_eq!(analysis.suggestions.len(), 1);
        let suggestion = &analysis.suggestions[0];
        assert_eq!(suggestion.kind, SuggestionKind::EnableRls);
        assert_eq!(suggestion.priority, Priority::High);
        assert_eq!(
            suggestion.sql_preview,
            "ALTER TABLE public.notes ENABLE ROW LEVEL SECURITY;"
        );
    }
}

mod naming_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compliant_schema() {
        let analysis = analyze(vec![table("customers")]);
        assert!(analysis.naming.tables_snake_case);
        assert!(analysis.naming.columns_snake_case);
        assert!(analysis.naming.is_compliant());
    }

    #[test]
    fn test_camel_case_and_reserved_names_flagged() {
        let analysis = analyze(vec![
            table("OrderItems").with_column(ColumnInfo::new("unitPrice", "numeric")),
            table("order"),
        ]);

        assert!(!analysis.naming.tables_snake_case);
        assert!(!analysis.naming.columns_snake_case);
        let locations: Vec<(NamingIssueKind, String)> = analysis
            .naming
            .issues
            .iter()
            .map(|i| (i.kind, i.location()))
            .collect();
        assert_eq!(
            locations,
            vec![
                (NamingIssueKind::NotSnakeCase, "OrderItems".to_string()),
                (
                    NamingIssueKind::NotSnakeCase,
                    "OrderItems.unitPrice".to_string()
                ),
                (NamingIssueKind::ReservedWord, "order".to_string()),
            ]
        );
    }
}

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_column_is_introspection_error() {
        let broken = table("customers").with_column(ColumnInfo::new("id", "text"));
        let err = SchemaAnalyzer::new().analyze_tables(vec![broken]).unwrap_err();
        assert!(err.is_introspection());
    }

    #[test]
    fn test_foreign_key_to_missing_column_is_rejected() {
        let orders = table("orders")
            .with_column(ColumnInfo::new("customer_id", "uuid"))
            .with_foreign_key(ForeignKeyInfo::new(
                "orders_customer_id_fkey",
                "customer_id",
                "customers",
                "uuid",
            ));
        let err = SchemaAnalyzer::new()
            .analyze_tables(vec![table("customers"), orders])
            .unwrap_err();
        assert!(err.is_introspection());
    }

    #[test]
    fn test_column_reference_to_missing_column_is_rejected() {
        let orders = table("orders")
            .with_column(ColumnInfo::new("customer_id", "uuid").references("customers", "uuid"));
        let err = SchemaAnalyzer::new()
            .analyze_tables(vec![table("customers"), orders])
            .unwrap_err();
        assert!(err.is_introspection());
        assert!(err.to_string().contains("orders.customer_id"));
    }

    #[test]
    fn test_column_reference_outside_snapshot_is_allowed() {
        let orders = table("orders")
            .with_column(ColumnInfo::new("region_id", "uuid").references("regions", "id"));
        let analysis = analyze(vec![orders]);
        assert_eq!(analysis.table_count(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let analysis = analyze(Vec::new());
        assert!(analysis.tables.is_empty());
        assert!(analysis.issues.is_empty());
        assert!(analysis.dependency_graph.is_empty());
    }
}

mod source_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FailingSource;

    #[async_trait]
    impl SchemaSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn load_tables(&self) -> Result<Vec<TableDescriptor>> {
            Err(FerryError::Other("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_analyze_static_source() {
        let source = StaticSchemaSource::new(vec![
            table("customers"),
            with_fk(table("orders"), "customer_id", "customers"),
        ]);
        let analysis = SchemaAnalyzer::new().analyze(&source).await.unwrap();
        assert_eq!(analysis.table_count(), 2);
        assert_eq!(analysis.dependency_graph.get("orders").unwrap().level, 1);
    }

    #[tokio::test]
    async fn test_source_failure_becomes_introspection_error() {
        let err = SchemaAnalyzer::new()
            .analyze(&FailingSource)
            .await
            .unwrap_err();
        assert!(err.is_introspection());
        assert!(err.to_string().contains("connection refused"));
    }
}
