//! Database schema types for querywright.
//!
//! Represents the structure of a database including tables, columns, and
//! foreign keys. The schema descriptor is what the LLM sees: it is formatted
//! into the system prompt before every generation request.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema, in name order.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    ///
    /// One line per table with its ordered `name (TYPE)` column list,
    /// followed by the foreign-key relationships. Kept compact so large
    /// schemas don't crowd out the question.
    pub fn format_for_llm(&self) -> String {
        let mut out = String::new();

        for table in &self.tables {
            let cols = table
                .columns
                .iter()
                .map(|col| self.format_column(table, col))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("Table {}: {}\n", table.name, cols));
        }

        if !self.foreign_keys.is_empty() {
            out.push_str("Foreign Keys:\n");
            for fk in &self.foreign_keys {
                out.push_str(&format!(
                    "  {}.{} -> {}.{}\n",
                    fk.from_table,
                    fk.from_columns.join(", "),
                    fk.to_table,
                    fk.to_columns.join(", ")
                ));
            }
        }

        out
    }

    fn format_column(&self, table: &Table, column: &Column) -> String {
        let mut annotations = Vec::new();
        if table.primary_key.contains(&column.name) {
            annotations.push("PK");
        }
        if !column.is_nullable {
            annotations.push("NOT NULL");
        }

        if annotations.is_empty() {
            format!("{} ({})", column.name, column.data_type)
        } else {
            format!(
                "{} ({}, {})",
                column.name,
                column.data_type,
                annotations.join(", ")
            )
        }
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns the names of all tables.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns true if the schema contains no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (e.g., "INTEGER", "TEXT"). SQLite columns without a
    /// declared type report "ANY".
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Source table name.
    pub from_table: String,

    /// Source column names.
    pub from_columns: Vec<String>,

    /// Target table name.
    pub to_table: String,

    /// Target column names.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema {
            tables: vec![
                Table {
                    name: "customers".to_string(),
                    columns: vec![
                        Column::new("customer_id", "INTEGER").nullable(false),
                        Column::new("first_name", "TEXT").nullable(false),
                        Column::new("email", "TEXT"),
                    ],
                    primary_key: vec!["customer_id".to_string()],
                },
                Table {
                    name: "orders".to_string(),
                    columns: vec![
                        Column::new("order_id", "INTEGER").nullable(false),
                        Column::new("customer_id", "INTEGER").nullable(false),
                        Column::new("order_date", "TEXT").with_default("CURRENT_TIMESTAMP"),
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

    #[test]
    fn test_format_for_llm_lists_tables_and_columns() {
        let schema = sample_schema();
        let formatted = schema.format_for_llm();

        assert!(formatted.contains("Table customers:"));
        assert!(formatted.contains("customer_id (INTEGER, PK, NOT NULL)"));
        assert!(formatted.contains("email (TEXT)"));
        assert!(formatted.contains("Table orders:"));
    }

    #[test]
    fn test_format_for_llm_lists_foreign_keys() {
        let schema = sample_schema();
        let formatted = schema.format_for_llm();

        assert!(formatted.contains("Foreign Keys:"));
        assert!(formatted.contains("orders.customer_id -> customers.customer_id"));
    }

    #[test]
    fn test_format_empty_schema_has_no_fk_section() {
        let formatted = Schema::new().format_for_llm();
        assert!(!formatted.contains("Foreign Keys:"));
    }

    #[test]
    fn test_table_lookup() {
        let schema = sample_schema();
        assert!(schema.table("orders").is_some());
        assert!(schema.table("products").is_none());
        assert_eq!(schema.table_names(), vec!["customers", "orders"]);
    }

    #[test]
    fn test_column_builder() {
        let col = Column::new("email", "TEXT").nullable(false).with_default("''");

        assert_eq!(col.name, "email");
        assert_eq!(col.data_type, "TEXT");
        assert!(!col.is_nullable);
        assert_eq!(col.default, Some("''".to_string()));
    }
}
