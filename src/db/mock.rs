//! Mock database client for testing.
//!
//! Provides an in-memory implementation with a canned schema, scripted
//! query results, and scripted validation verdicts so agent behavior can be
//! tested without touching a real database.

use super::{Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Schema, Table, Value};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A mock database client that returns predefined results.
#[derive(Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    /// (needle, result) pairs; the first needle contained in the SQL wins.
    scripted_results: Vec<(String, QueryResult)>,
    /// (needle, error) pairs consulted by `validate`.
    invalid_patterns: Vec<(String, String)>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    /// Creates a mock with a small retail schema (customers, products,
    /// orders), which is what most agent tests want to talk about.
    pub fn with_store_schema() -> Self {
        Self::with_schema(store_schema())
    }

    /// Scripts a result for any executed SQL containing `needle`.
    pub fn with_result(mut self, needle: impl Into<String>, result: QueryResult) -> Self {
        self.scripted_results.push((needle.into(), result));
        self
    }

    /// Scripts a validation failure for any SQL containing `needle`.
    pub fn with_invalid(mut self, needle: impl Into<String>, error: impl Into<String>) -> Self {
        self.invalid_patterns.push((needle.into(), error.into()));
        self
    }

    fn lookup_invalid(&self, sql: &str) -> Option<String> {
        let sql_lower = sql.to_lowercase();
        self.invalid_patterns
            .iter()
            .find(|(needle, _)| sql_lower.contains(&needle.to_lowercase()))
            .map(|(_, error)| error.clone())
    }
}

/// Builds the small retail schema used across tests.
pub fn store_schema() -> Schema {
    Schema {
        tables: vec![
            Table {
                name: "customers".to_string(),
                columns: vec![
                    Column::new("customer_id", "INTEGER").nullable(false),
                    Column::new("first_name", "TEXT").nullable(false),
                    Column::new("last_name", "TEXT").nullable(false),
                    Column::new("email", "TEXT"),
                ],
                primary_key: vec!["customer_id".to_string()],
            },
            Table {
                name: "products".to_string(),
                columns: vec![
                    Column::new("product_id", "INTEGER").nullable(false),
                    Column::new("product_name", "TEXT").nullable(false),
                    Column::new("list_price", "REAL").nullable(false),
                ],
                primary_key: vec!["product_id".to_string()],
            },
            Table {
                name: "orders".to_string(),
                columns: vec![
                    Column::new("order_id", "INTEGER").nullable(false),
                    Column::new("customer_id", "INTEGER").nullable(false),
                    Column::new("order_date", "TEXT").nullable(false),
                ],
                primary_key: vec!["order_id".to_string()],
            },
        ],
        foreign_keys: vec![ForeignKey::new(
            "orders",
            vec!["customer_id".to_string()],
            "customers",
            vec!["customer_id".to_string()],
        )],
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let sql_lower = sql.to_lowercase();

        for (needle, result) in &self.scripted_results {
            if sql_lower.contains(&needle.to_lowercase()) {
                return Ok(result.clone());
            }
        }

        // Unscripted SELECTs get a single synthetic row so callers always
        // have something to display.
        if sql_lower.trim_start().starts_with("select") {
            let columns = vec![ColumnInfo::new("result", "TEXT")];
            let rows = vec![vec![Value::String(format!("Mock result for: {sql}"))]];
            return Ok(QueryResult::with_data(columns, rows)
                .with_execution_time(Duration::from_millis(1)));
        }

        Ok(QueryResult::new())
    }

    async fn validate(&self, sql: &str) -> Result<Option<String>> {
        Ok(self.lookup_invalid(sql))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
