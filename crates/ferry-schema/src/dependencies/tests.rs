//! Tests for the table dependency graph

use super::*;
use ferry_core::{ColumnInfo, ForeignKeyInfo, TableDescriptor};

fn table(name: &str) -> TableDescriptor {
    TableDescriptor::new(name).with_column(ColumnInfo::new("id", "uuid").primary_key())
}

fn table_with_fk(name: &str, column: &str, target: &str) -> TableDescriptor {
    table(name)
        .with_column(ColumnInfo::new(column, "uuid").references(target, "id"))
        .with_foreign_key(ForeignKeyInfo::new(
            format!("{}_{}_fkey", name, column),
            column,
            target,
            "id",
        ))
}

mod dependency_node_tests {
    use super::*;

    #[test]
    fn test_edges_are_mirrored() {
        let graph = DependencyGraph::from_tables(&[
            table("customers"),
            table_with_fk("orders", "customer_id", "customers"),
        ]);

        let orders = graph.get("orders").unwrap();
        assert_eq!(orders.depends_on, vec!["customers"]);
        assert!(!orders.has_dependents());

        let customers = graph.get("customers").unwrap();
        assert_eq!(customers.dependents, vec!["orders"]);
        assert!(!customers.has_dependencies());
    }

    #[test]
    fn test_references_outside_snapshot_are_ignored() {
        let graph =
            DependencyGraph::from_tables(&[table_with_fk("profiles", "user_id", "users")]);
        assert_eq!(graph.len(), 1);
        assert!(!graph.get("profiles").unwrap().has_dependencies());
    }
}

mod level_tests {
    use super::*;

    #[test]
    fn test_levels_on_acyclic_chain() {
        let graph = DependencyGraph::from_tables(&[
            table("customers"),
            table_with_fk("orders", "customer_id", "customers"),
            table_with_fk("order_items", "order_id", "orders"),
            table("products"),
        ]);

        assert_eq!(graph.get("customers").unwrap().level, 0);
        assert_eq!(graph.get("products").unwrap().level, 0);
        assert_eq!(graph.get("orders").unwrap().level, 1);
        assert_eq!(graph.get("order_items").unwrap().level, 2);
        assert!(!graph.has_cycles());
    }

    #[test]
    fn test_level_is_one_more_than_max_dependency() {
        // shipments -> orders -> customers, shipments -> carriers
        let shipments = table_with_fk("shipments", "order_id", "orders")
            .with_column(ColumnInfo::new("carrier_id", "uuid"))
            .with_foreign_key(ForeignKeyInfo::new(
                "shipments_carrier_id_fkey",
                "carrier_id",
                "carriers",
                "id",
            ));
        let graph = DependencyGraph::from_tables(&[
            table("customers"),
            table("carriers"),
            table_with_fk("orders", "customer_id", "customers"),
            shipments,
        ]);

        for node in graph.nodes() {
            let expected = node
                .depends_on
                .iter()
                .map(|d| graph.get(d).unwrap().level + 1)
                .max()
                .unwrap_or(0);
            assert_eq!(node.level, expected, "level of {}", node.table);
        }
        assert_eq!(graph.get("shipments").unwrap().level, 2);
    }

    #[test]
    fn test_levels_grouping() {
        let graph = DependencyGraph::from_tables(&[
            table("customers"),
            table_with_fk("orders", "customer_id", "customers"),
        ]);
        let levels = graph.levels();
        assert_eq!(levels[&0], vec!["customers"]);
        assert_eq!(levels[&1], vec!["orders"]);
    }
}

mod cycle_tests {
    use super::*;

    #[test]
    fn test_self_reference_flags_only_that_table() {
        let graph = DependencyGraph::from_tables(&[
            table_with_fk("employees", "manager_id", "employees"),
            table("departments"),
            table_with_fk("badges", "employee_id", "employees"),
        ]);

        assert_eq!(graph.circular_tables(), vec!["employees"]);
        assert_eq!(graph.cycles(), &[vec!["employees".to_string()]]);
        assert_eq!(graph.get("employees").unwrap().level, 0);
        assert_eq!(graph.get("badges").unwrap().level, 1);
    }

    #[test]
    fn test_two_table_cycle_detected_once() {
        let graph = DependencyGraph::from_tables(&[
            table_with_fk("a", "b_id", "b"),
            table_with_fk("b", "a_id", "a"),
            table("c"),
        ]);

        assert_eq!(graph.cycles().len(), 1);
        assert_eq!(
            graph.cycles()[0],
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(graph.circular_tables(), vec!["a", "b"]);
        assert!(!graph.get("c").unwrap().circular);
    }

    #[test]
    fn test_dependent_of_cycle_is_not_flagged() {
        let graph = DependencyGraph::from_tables(&[
            table_with_fk("a", "b_id", "b"),
            table_with_fk("b", "a_id", "a"),
            table_with_fk("c", "a_id", "a"),
        ]);

        assert!(!graph.get("c").unwrap().circular);
        assert_eq!(graph.get("c").unwrap().level, 1);
    }

    #[test]
    fn test_three_table_cycle_terminates() {
        let graph = DependencyGraph::from_tables(&[
            table_with_fk("x", "y_id", "y"),
            table_with_fk("y", "z_id", "z"),
            table_with_fk("z", "x_id", "x"),
        ]);

        assert_eq!(graph.circular_tables().len(), 3);
        assert_eq!(graph.cycles().len(), 1);
        assert_eq!(graph.cycles()[0][0], "x");
    }
}

mod traversal_tests {
    use super::*;

    #[test]
    fn test_find_all_dependents_transitive() {
        let graph = DependencyGraph::from_tables(&[
            table("customers"),
            table_with_fk("orders", "customer_id", "customers"),
            table_with_fk("order_items", "order_id", "orders"),
        ]);

        let dependents = graph.find_all_dependents("customers");
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains("orders"));
        assert!(dependents.contains("order_items"));
    }

    #[test]
    fn test_find_all_dependents_with_cycle_terminates() {
        let graph = DependencyGraph::from_tables(&[
            table_with_fk("a", "b_id", "b"),
            table_with_fk("b", "a_id", "a"),
        ]);
        let dependents = graph.find_all_dependents("a");
        assert_eq!(dependents.len(), 1);
        assert!(dependents.contains("b"));
    }
}
