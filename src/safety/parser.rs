//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use super::{ClassificationResult, SafetyLevel, StatementType};

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Classifies a SQL string and returns the classification result.
    ///
    /// SQL that cannot be parsed is treated as destructive (conservative
    /// default) with a warning message.
    pub fn classify(&self, sql: &str) -> ClassificationResult {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(_) => {
                return ClassificationResult::with_warning(
                    SafetyLevel::Destructive,
                    StatementType::Unknown,
                    "Could not parse SQL. Please review carefully.",
                )
            }
        };

        if statements.is_empty() {
            return ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Empty SQL statement",
            );
        }

        if statements.len() == 1 {
            let (level, stmt_type) = classify_statement(&statements[0]);
            return ClassificationResult::new(level, stmt_type);
        }

        // Multiple statements: report the most dangerous classification
        let mut max_level = SafetyLevel::Safe;
        let mut max_stmt_type = StatementType::Unknown;

        for stmt in &statements {
            let (level, stmt_type) = classify_statement(stmt);
            if level_priority(&level) > level_priority(&max_level) {
                max_level = level;
                max_stmt_type = stmt_type;
            }
        }

        ClassificationResult::new(max_level, StatementType::Multiple(Box::new(max_stmt_type)))
    }
}

/// Convenience function to classify SQL without creating a classifier
/// instance.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    SqlClassifier::new().classify(sql)
}

/// Returns a priority value for safety levels (higher = more dangerous).
fn level_priority(level: &SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Safe => 0,
        SafetyLevel::Mutating => 1,
        SafetyLevel::Destructive => 2,
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the query
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }

        // Mutating: data modification
        Statement::Insert(_) => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        // Destructive: data loss or schema changes
        Statement::Delete(_) => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::AlterIndex { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::AlterView { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),

        // Conservative default: treat unknown statements as destructive
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying
/// operations. Returns the most dangerous (SafetyLevel, StatementType)
/// found.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let mut max_level = SafetyLevel::Safe;
    let mut max_type = StatementType::Select;

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let (level, stmt_type) = classify_query(&cte.query);
            if level_priority(&level) > level_priority(&max_level) {
                max_level = level;
                max_type = stmt_type;
            }
        }
    }

    let (body_level, body_type) = classify_set_expr(&query.body);
    if level_priority(&body_level) > level_priority(&max_level) {
        max_level = body_level;
        max_type = body_type;
    }

    (max_level, max_type)
}

/// Classifies a SetExpr, detecting mutations and recursing into nested
/// queries.
fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Insert(stmt) => classify_statement(stmt),

        SetExpr::Query(query) => classify_query(query),

        SetExpr::Select(select) => {
            let mut max_level = SafetyLevel::Safe;
            let mut max_type = StatementType::Select;
            for table_with_joins in &select.from {
                let (level, stmt_type) = classify_table_with_joins(table_with_joins);
                if level_priority(&level) > level_priority(&max_level) {
                    max_level = level;
                    max_type = stmt_type;
                }
            }
            (max_level, max_type)
        }

        // Set operations (UNION, INTERSECT, EXCEPT): check both sides
        SetExpr::SetOperation { left, right, .. } => {
            let (left_level, left_type) = classify_set_expr(left);
            let (right_level, right_type) = classify_set_expr(right);
            if level_priority(&left_level) >= level_priority(&right_level) {
                (left_level, left_type)
            } else {
                (right_level, right_type)
            }
        }

        SetExpr::Values(_) | SetExpr::Table(_) => (SafetyLevel::Safe, StatementType::Select),
    }
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementType) {
    let mut max_level = SafetyLevel::Safe;
    let mut max_type = StatementType::Select;

    let (level, stmt_type) = classify_table_factor(&twj.relation);
    if level_priority(&level) > level_priority(&max_level) {
        max_level = level;
        max_type = stmt_type;
    }

    for join in &twj.joins {
        let (level, stmt_type) = classify_table_factor(&join.relation);
        if level_priority(&level) > level_priority(&max_level) {
            max_level = level;
            max_type = stmt_type;
        }
    }

    (max_level, max_type)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementType) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_classification(sql: &str, expected_level: SafetyLevel, expected_type: StatementType) {
        let result = classify_sql(sql);
        assert_eq!(
            result.level, expected_level,
            "SQL: '{}' - expected level {:?}, got {:?}",
            sql, expected_level, result.level
        );
        assert_eq!(
            result.statement_type, expected_type,
            "SQL: '{}' - expected type {:?}, got {:?}",
            sql, expected_type, result.statement_type
        );
    }

    #[test]
    fn test_select_is_safe() {
        assert_classification(
            "SELECT * FROM customers",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_select_with_joins_is_safe() {
        assert_classification(
            "SELECT c.first_name, COUNT(o.order_id) FROM customers c JOIN orders o ON o.customer_id = c.customer_id GROUP BY c.first_name",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_cte_select_is_safe() {
        assert_classification(
            "WITH recent AS (SELECT * FROM orders ORDER BY order_date DESC LIMIT 10) SELECT * FROM recent",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_subquery_is_safe() {
        assert_classification(
            "SELECT * FROM (SELECT customer_id FROM orders) AS o",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_explain_is_safe() {
        assert_classification(
            "EXPLAIN SELECT * FROM customers",
            SafetyLevel::Safe,
            StatementType::Explain,
        );
    }

    #[test]
    fn test_insert_is_mutating() {
        assert_classification(
            "INSERT INTO customers (first_name) VALUES ('Eve')",
            SafetyLevel::Mutating,
            StatementType::Insert,
        );
    }

    #[test]
    fn test_update_is_mutating() {
        assert_classification(
            "UPDATE customers SET first_name = 'Eve' WHERE customer_id = 1",
            SafetyLevel::Mutating,
            StatementType::Update,
        );
    }

    #[test]
    fn test_delete_is_destructive() {
        assert_classification(
            "DELETE FROM customers WHERE customer_id = 1",
            SafetyLevel::Destructive,
            StatementType::Delete,
        );
    }

    #[test]
    fn test_drop_is_destructive() {
        assert_classification(
            "DROP TABLE customers",
            SafetyLevel::Destructive,
            StatementType::Drop,
        );
    }

    #[test]
    fn test_unparseable_is_destructive_with_warning() {
        let result = classify_sql("SELECT FROM WHERE (((");
        assert_eq!(result.level, SafetyLevel::Destructive);
        assert!(result.warning.is_some());
    }

    #[test]
    fn test_multiple_statements_take_worst() {
        let result = classify_sql("SELECT 1; DROP TABLE customers");
        assert_eq!(result.level, SafetyLevel::Destructive);
        assert!(matches!(result.statement_type, StatementType::Multiple(_)));
    }

    #[test]
    fn test_empty_sql_is_flagged() {
        let result = classify_sql("");
        assert_eq!(result.level, SafetyLevel::Destructive);
    }
}
