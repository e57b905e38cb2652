//! Tests for TypeScript rendering

use super::*;
use ferry_core::ColumnInfo;

fn profiles() -> TableDescriptor {
    TableDescriptor::new("profiles")
        .with_column(
            ColumnInfo::new("id", "uuid")
                .primary_key()
                .with_default("gen_random_uuid()"),
        )
        .with_column(ColumnInfo::new("email", "text").not_null())
        .with_column(ColumnInfo::new("facility_id", "uuid").references("facilities", "id"))
        .with_column(
            ColumnInfo::new("created_at", "timestamptz")
                .not_null()
                .with_default("now()"),
        )
}

mod type_mapping_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_types() {
        assert_eq!(ts_type("uuid"), "Id");
        assert_eq!(ts_type("varchar(255)"), "string");
        assert_eq!(ts_type("BIGINT"), "number");
        assert_eq!(ts_type("numeric(10, 2)"), "number");
        assert_eq!(ts_type("boolean"), "boolean");
        assert_eq!(ts_type("timestamptz"), "Timestamp");
        assert_eq!(ts_type("jsonb"), "Json");
        assert_eq!(ts_type("tsvector"), "unknown");
    }

    #[test]
    fn test_array_types() {
        assert_eq!(ts_type("text[]"), "string[]");
        assert_eq!(ts_type("uuid[][]"), "Id[][]");
    }

    #[test]
    fn test_module_and_file_names() {
        assert_eq!(module_name("OrderItems"), "order_items");
        assert_eq!(file_name("order_items"), "order_items.ts");
    }
}

mod module_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_full_module() {
        let table = profiles();
        let module = TableModule {
            table: &table,
            type_name: "Profiles",
            relations: vec![Relation {
                field: "facility".to_string(),
                type_name: "Facilities".to_string(),
                module: "facilities".to_string(),
                many: false,
            }],
        };

        let expected = "\
// Generated by ferry. Do not edit.
import type { Id, Timestamp } from './shared';
import type { Facilities } from './facilities';

/** Row of public.profiles */
export interface Profiles {
  id: Id;
  email: string;
  /** References facilities.id */
  facilityId: Id | null;
  createdAt: Timestamp;
}

export interface ProfilesInsert {
  email: string;
  facilityId?: Id | null;
}

export interface ProfilesUpdate {
  id: Id;
  email?: string;
  facilityId?: Id | null;
  createdAt?: Timestamp;
}

export interface ProfilesWithRelations extends Profiles {
  facility?: Facilities;
}
";
        assert_eq!(module.render().unwrap(), expected);
    }

    #[test]
    fn test_children_render_as_arrays() {
        let table = TableDescriptor::new("customers")
            .with_column(ColumnInfo::new("id", "uuid").primary_key());
        let module = TableModule {
            table: &table,
            type_name: "Customers",
            relations: vec![Relation {
                field: "orders".to_string(),
                type_name: "Orders".to_string(),
                module: "orders".to_string(),
                many: true,
            }],
        };
        let contents = module.render().unwrap();
        assert!(contents.contains("  orders?: Orders[];\n"));
        assert!(contents.contains("import type { Orders } from './orders';"));
    }

    #[test]
    fn test_self_relation_is_not_imported() {
        let table = TableDescriptor::new("employees")
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("manager_id", "uuid").references("employees", "id"));
        let module = TableModule {
            table: &table,
            type_name: "Employees",
            relations: vec![Relation {
                field: "manager".to_string(),
                type_name: "Employees".to_string(),
                module: "employees".to_string(),
                many: false,
            }],
        };
        let contents = module.render().unwrap();
        assert!(!contents.contains("from './employees'"));
        assert!(contents.contains("  manager?: Employees;"));
    }

    #[test]
    fn test_odd_column_names_are_quoted() {
        let table = TableDescriptor::new("scores")
            .with_column(ColumnInfo::new("2fa", "boolean").not_null());
        let module = TableModule {
            table: &table,
            type_name: "Scores",
            relations: Vec::new(),
        };
        let contents = module.render().unwrap();
        assert!(contents.contains("  '2"));
        assert!(contents.contains("': boolean;"));
        assert!(!contents.contains("import type"));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let table = TableDescriptor::new("empty");
        let module = TableModule {
            table: &table,
            type_name: "Empty",
            relations: Vec::new(),
        };
        assert_eq!(
            module.render(),
            Err(BindingError::EmptyTable("empty".to_string()))
        );
    }

    #[test]
    fn test_unusable_type_name_is_an_error() {
        let table = profiles();
        let module = TableModule {
            table: &table,
            type_name: "",
            relations: Vec::new(),
        };
        assert!(matches!(module.render(), Err(BindingError::InvalidName(_))));
    }
}

mod shared_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shared_module_defines_helpers() {
        let shared = shared_module();
        for name in [
            "type Id",
            "type Json",
            "type Timestamp",
            "interface BaseFields",
            "interface OrderBy<T>",
            "type FilterClause<T>",
        ] {
            assert!(shared.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_index_reexports_everything() {
        let index = index_module(["profiles", "facilities"]);
        assert_eq!(
            index,
            "// Generated by ferry. Do not edit.\n\
             export * from './shared';\n\
             export * from './profiles';\n\
             export * from './facilities';\n"
        );
    }
}
