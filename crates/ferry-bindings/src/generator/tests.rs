//! Tests for binding generation

use super::*;
use ferry_core::{ColumnInfo, Record, Value};
use ferry_migration::MigrationPlanner;
use ferry_schema::{ImportMatcher, SchemaAnalyzer};

fn customers() -> TableDescriptor {
    TableDescriptor::new("customers")
        .with_rls(true)
        .with_column(ColumnInfo::new("id", "uuid").primary_key())
        .with_column(ColumnInfo::new("name", "text").not_null())
}

fn invoice() -> TableDescriptor {
    TableDescriptor::new("invoice")
        .with_rls(true)
        .with_column(ColumnInfo::new("id", "uuid").primary_key())
        .with_column(ColumnInfo::new("customer_id", "uuid").references("customers", "id"))
        .with_column(ColumnInfo::new("total", "numeric"))
}

fn analyze(tables: Vec<TableDescriptor>) -> SchemaAnalysis {
    SchemaAnalyzer::new().analyze_tables(tables).unwrap()
}

fn paths(set: &BindingSet) -> Vec<&str> {
    set.files.iter().map(|f| f.path.as_str()).collect()
}

mod generate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_module_per_table_plus_shared_and_index() {
        let analysis = analyze(vec![customers(), invoice()]);
        let set = BindingGenerator::new().generate(&analysis, None);

        assert_eq!(
            paths(&set),
            vec!["shared.ts", "customers.ts", "invoice.ts", "index.ts"]
        );
        assert_eq!(set.table_count(), 2);
        assert!(set.is_complete());

        let index = &set.file("index.ts").unwrap().contents;
        assert!(index.contains("export * from './customers';"));
        assert!(index.contains("export * from './invoice';"));
    }

    #[test]
    fn test_relations_in_both_directions() {
        let analysis = analyze(vec![customers(), invoice()]);
        let set = BindingGenerator::new().generate(&analysis, None);

        let parent = &set.table_file("customers").unwrap().contents;
        assert!(parent.contains("  invoices?: Invoice[];"));
        assert!(parent.contains("import type { Invoice } from './invoice';"));

        let child = &set.table_file("invoice").unwrap().contents;
        assert!(child.contains("  customer?: Customers;"));
        assert!(child.contains("/** References customers.id */"));
    }

    #[test]
    fn test_plan_is_projected_before_rendering() {
        let analysis = analyze(vec![customers()]);
        let records: Vec<Record> = vec![
            [("note".to_string(), Value::from("call back"))]
                .into_iter()
                .collect(),
        ];
        let patterns = ImportMatcher::new().match_import_data_as(&records, &analysis, "call_logs");
        let plan = MigrationPlanner::new().plan(&patterns, &analysis, &records);

        let set = BindingGenerator::new().generate(&analysis, Some(&plan));

        let created = &set.table_file("call_logs").unwrap().contents;
        assert!(created.contains("export interface CallLogs {"));
        assert!(created.contains("  userId: Id;"));
        assert!(created.contains("  note?: string | null;"));
        assert!(set.file("call_logs.ts").is_some());
    }

    #[test]
    fn test_conflicting_type_names_render_once() {
        let first = TableDescriptor::new("user_profiles")
            .with_column(ColumnInfo::new("id", "uuid").primary_key());
        let second = TableDescriptor::new("UserProfiles")
            .with_schema("legacy")
            .with_column(ColumnInfo::new("id", "uuid").primary_key());

        let set = BindingGenerator::new().generate_tables(&[first, second]);

        assert_eq!(
            set.conflicts,
            vec![NamingConflict {
                type_name: "UserProfiles".to_string(),
                tables: vec![
                    "public.user_profiles".to_string(),
                    "legacy.UserProfiles".to_string()
                ],
            }]
        );
        assert_eq!(set.table_count(), 1);
        assert!(!set.is_complete());
    }

    #[test]
    fn test_failing_table_does_not_stop_siblings() {
        let set = BindingGenerator::new().generate_tables(&[TableDescriptor::new("empty"), customers()]);

        assert_eq!(
            set.errors,
            vec![TableError {
                table: "empty".to_string(),
                error: BindingError::EmptyTable("empty".to_string()),
            }]
        );
        assert_eq!(paths(&set), vec!["shared.ts", "customers.ts", "index.ts"]);
        assert!(!set.file("index.ts").unwrap().contents.contains("empty"));
    }

    #[test]
    fn test_relation_colliding_with_column_is_skipped() {
        let orders = TableDescriptor::new("orders")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("customer", "text").not_null())
            .with_column(ColumnInfo::new("customer_id", "uuid").references("customers", "id"));
        let set = BindingGenerator::new().generate_tables(&[customers(), orders]);
        assert!(set.is_complete());

        let child = &set.table_file("orders").unwrap().contents;
        assert!(child.contains("  customer: string;"));
        assert!(!child.contains("customer?: Customers"));
        assert!(!child.contains("import type { Customers }"));

        let parent = &set.table_file("customers").unwrap().contents;
        assert!(parent.contains("  orders?: Orders[];"));
    }

    #[test]
    fn test_child_relation_colliding_with_column_is_skipped() {
        let customers = customers().with_column(ColumnInfo::new("invoices", "jsonb"));
        let set = BindingGenerator::new().generate_tables(&[customers, invoice()]);

        let parent = &set.table_file("customers").unwrap().contents;
        assert!(parent.contains("  invoices?: Json | null;"));
        assert!(!parent.contains("Invoice[]"));
        assert!(!parent.contains("import type { Invoice }"));
    }

    #[test]
    fn test_unrenderable_table_is_not_imported_by_siblings() {
        let sales = TableDescriptor::new("2024_sales")
            .with_column(ColumnInfo::new("id", "uuid").primary_key());
        let lines = TableDescriptor::new("sale_lines")
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("sale_id", "uuid").references("2024_sales", "id"));

        let set = BindingGenerator::new().generate_tables(&[sales, lines]);

        assert_eq!(set.errors.len(), 1);
        assert_eq!(set.errors[0].table, "2024_sales");
        assert!(matches!(set.errors[0].error, BindingError::InvalidName(_)));

        let lines = &set.table_file("sale_lines").unwrap().contents;
        assert!(!lines.contains("sale?:"));
        assert!(!lines.contains("from './2024"));
    }
}

mod incremental_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_self_diff_regenerates_nothing() {
        let analysis = analyze(vec![customers(), invoice()]);
        let incremental = BindingGenerator::new().generate_incremental(&analysis, &analysis);

        assert!(incremental.is_empty());
        assert!(incremental.removed_files.is_empty());
        let paths: Vec<&str> = incremental.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.ts"]);
    }

    #[test]
    fn test_only_changed_tables_are_rendered() {
        let old = analyze(vec![customers(), invoice()]);
        let payments = TableDescriptor::new("payments")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key());
        let new = analyze(vec![
            customers().with_column(ColumnInfo::new("phone", "text")),
            payments,
        ]);

        let incremental = BindingGenerator::new().generate_incremental(&old, &new);

        let paths: Vec<&str> = incremental.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["customers.ts", "payments.ts", "index.ts"]);
        assert_eq!(incremental.removed_files, vec!["invoice.ts"]);
        assert_eq!(incremental.changes.len(), 3);
    }
}
