//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for SQLite file databases using sqlx. The target database is opened
//! read-only: the agent only ever introspects, validates, and SELECTs.

use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
};
use crate::error::{Result, WriterError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 1000;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a read-only client for the database at `path`.
    ///
    /// Fails with a `Connection` error when the file does not exist; SQLite
    /// would otherwise happily create an empty database and defer the
    /// failure to the first query.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(WriterError::connection(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                WriterError::connection(format!("failed to open {}: {}", path.display(), e))
            })?;

        debug!("Opened database: {}", path.display());
        Ok(Self { pool })
    }

    /// Creates a client from an existing connection pool.
    ///
    /// This is primarily useful for testing with in-memory databases.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys(&tables).await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            WriterError::query(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| WriterError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;

        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
        })
    }

    async fn validate(&self, sql: &str) -> Result<Option<String>> {
        // EXPLAIN compiles the statement without running it, so syntax and
        // name-resolution errors surface without paying for execution.
        let explain = format!("EXPLAIN {sql}");
        match sqlx::query(&explain).fetch_all(&self.pool).await {
            Ok(_) => Ok(None),
            Err(sqlx::Error::Database(e)) => Ok(Some(e.message().to_string())),
            Err(e) => Err(WriterError::query(format!("validation failed: {e}"))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteClient {
    /// Fetches all user tables with their columns and primary keys.
    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WriterError::query(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let (columns, primary_key) = self.fetch_columns(&table_name).await?;
            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
            });
        }

        Ok(tables)
    }

    /// Fetches columns and primary-key members for a specific table.
    async fn fetch_columns(&self, table_name: &str) -> Result<(Vec<Column>, Vec<String>)> {
        // cid, name, type, notnull, dflt_value, pk
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
            sqlx::query_as(&format!("PRAGMA table_info({})", quote_ident(table_name)))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    WriterError::query(format!("Failed to fetch columns for {table_name}: {e}"))
                })?;

        // pk holds the 1-based position within the primary key, 0 otherwise
        let mut pk_members: Vec<(i64, String)> = rows
            .iter()
            .filter(|(_, _, _, _, _, pk)| *pk > 0)
            .map(|(_, name, _, _, _, pk)| (*pk, name.clone()))
            .collect();
        pk_members.sort_by_key(|(pos, _)| *pos);

        let columns = rows
            .into_iter()
            .map(|(_, name, data_type, notnull, default, _)| Column {
                name,
                data_type: if data_type.is_empty() {
                    "ANY".to_string()
                } else {
                    data_type
                },
                is_nullable: notnull == 0,
                default,
            })
            .collect();

        Ok((columns, pk_members.into_iter().map(|(_, n)| n).collect()))
    }

    /// Fetches all foreign key relationships.
    ///
    /// `tables` is needed to resolve references to a target table's implicit
    /// primary key (SQLite reports the target column as NULL in that case).
    async fn fetch_foreign_keys(&self, tables: &[Table]) -> Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();

        for table in tables {
            // id, seq, table, from, to, on_update, on_delete, match
            let rows: Vec<(i64, i64, String, String, Option<String>, String, String, String)> =
                sqlx::query_as(&format!(
                    "PRAGMA foreign_key_list({})",
                    quote_ident(&table.name)
                ))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    WriterError::query(format!(
                        "Failed to fetch foreign keys for {}: {e}",
                        table.name
                    ))
                })?;

            // Group rows by constraint id to keep multi-column keys together.
            let mut by_id: BTreeMap<i64, (String, Vec<String>, Vec<String>)> = BTreeMap::new();
            for (id, _seq, to_table, from_col, to_col, ..) in rows {
                let to_col = to_col.or_else(|| {
                    tables
                        .iter()
                        .find(|t| t.name == to_table)
                        .and_then(|t| t.primary_key.first().cloned())
                });
                let entry = by_id
                    .entry(id)
                    .or_insert_with(|| (to_table, Vec::new(), Vec::new()));
                entry.1.push(from_col);
                if let Some(to_col) = to_col {
                    entry.2.push(to_col);
                }
            }

            for (_, (to_table, from_columns, to_columns)) in by_id {
                foreign_keys.push(ForeignKey {
                    from_table: table.name.clone(),
                    from_columns,
                    to_table,
                    to_columns,
                });
            }
        }

        Ok(foreign_keys)
    }
}

/// Double-quotes an identifier for safe interpolation into a PRAGMA.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Formats a sqlx error into a readable query error message.
fn format_query_error(e: sqlx::Error) -> String {
    match e {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a SqliteRow to our Value type.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INTEGER" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "NUMERIC" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // TEXT, DATE, DATETIME, and anything else: fall back to string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
