//! Database abstraction layer for querywright.
//!
//! Provides a trait-based interface for database operations so the agent can
//! be tested against an in-memory mock as well as real SQLite files.

mod mock;
mod schema;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Opens a database client for the given SQLite file path.
///
/// This is the central factory function for database connections.
pub async fn connect(path: &Path) -> Result<Box<dyn DatabaseClient>> {
    let client = SqliteClient::open(path).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with WriterError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and relationship
    /// information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Dry-runs a SQL statement without executing it.
    ///
    /// Returns `None` when the engine accepts the statement, or the engine's
    /// error message when it does not. Transport-level failures are `Err`.
    async fn validate(&self, sql: &str) -> Result<Option<String>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
