//! Common test utilities and mocks

use async_trait::async_trait;
use std::sync::Arc;
use ferry_core::{ColumnInfo, FerryError, Record, Result, SchemaSource, TableDescriptor, Value};

/// Mock schema source for testing the orchestrator without a live catalog.
///
/// Counts introspection calls and can be switched to fail every call.
pub struct MockSchemaSource {
    pub tables: Vec<TableDescriptor>,
    pub should_fail: bool,
    pub load_count: Arc<parking_lot::Mutex<usize>>,
}

impl MockSchemaSource {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self {
            tables,
            should_fail: false,
            load_count: Arc::new(parking_lot::Mutex::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn load_count(&self) -> usize {
        *self.load_count.lock()
    }
}

#[async_trait]
impl SchemaSource for MockSchemaSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load_tables(&self) -> Result<Vec<TableDescriptor>> {
        *self.load_count.lock() += 1;

        if self.should_fail {
            return Err(FerryError::Introspection("catalog unreachable".into()));
        }
        Ok(self.tables.clone())
    }
}

/// `profiles(id, email)` and `facilities(id, name)`, no foreign keys
pub fn profiles_and_facilities() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("profiles")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("email", "text")),
        TableDescriptor::new("facilities")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("name", "text")),
    ]
}

/// `orders.customer_id` references `customers.id` without an index
pub fn orders_and_customers() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("customers")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("name", "text")),
        TableDescriptor::new("orders")
            .with_rls(true)
            .with_column(ColumnInfo::new("id", "uuid").primary_key())
            .with_column(ColumnInfo::new("customer_id", "uuid").references("customers", "id")),
    ]
}

/// Three unrelated tables with row-level security
pub fn secured_tables() -> Vec<TableDescriptor> {
    ["profiles", "facilities", "organizations"]
        .into_iter()
        .map(|name| {
            TableDescriptor::new(name)
                .with_rls(true)
                .with_column(ColumnInfo::new("id", "uuid").primary_key())
                .with_column(ColumnInfo::new("email", "text"))
        })
        .collect()
}

pub fn record(fields: &[(&str, Value)]) -> Record {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn contact_records() -> Vec<Record> {
    vec![
        record(&[
            ("email", Value::from("ada@example.com")),
            ("phone", Value::from("555-0100")),
            ("facility_name", Value::from("North")),
        ]),
        record(&[
            ("email", Value::from("alan@example.com")),
            ("phone", Value::from("555-0101")),
            ("facility_name", Value::from("South")),
        ]),
    ]
}

pub fn note_records() -> Vec<Record> {
    vec![record(&[
        ("title", Value::from("Kickoff")),
        ("body", Value::from("Agenda attached")),
    ])]
}
