//! End-to-end agent tests over a real SQLite file with a mocked backend.

use super::common::seed_store;
use pretty_assertions::assert_eq;
use querywright::agent::QueryWriter;
use querywright::db::{self, Value};
use querywright::llm::MockLlmClient;
use std::path::Path;
use tempfile::tempdir;

async fn store_writer(path: &Path) -> QueryWriter {
    seed_store(path).await;
    let db = db::connect(path).await.expect("connect");
    QueryWriter::from_parts(db, Box::new(MockLlmClient::new()), None)
        .await
        .expect("writer")
}

#[tokio::test]
async fn open_with_missing_database_fails_clearly() {
    let err = QueryWriter::open(Path::new("/nonexistent/bike_store.db"))
        .await
        .err()
        .expect("should fail");

    assert_eq!(err.category(), "Connection Error");
}

#[tokio::test]
async fn count_question_yields_a_single_numeric_row() {
    let dir = tempdir().unwrap();
    let writer = store_writer(&dir.path().join("store.db")).await;

    let sql = writer
        .generate_query("How many customers are there?")
        .await
        .unwrap();

    assert!(!sql.is_empty());
    assert!(!sql.contains("```"));

    let result = writer.execute(&sql).await.unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::Int(5));
}

#[tokio::test]
async fn top_five_products_are_limited_and_ordered() {
    let dir = tempdir().unwrap();
    let writer = store_writer(&dir.path().join("store.db")).await;

    let sql = writer
        .generate_query("What are the top 5 most expensive products?")
        .await
        .unwrap();

    let result = writer.execute(&sql).await.unwrap();
    assert_eq!(result.row_count, 5);

    // Prices must be descending
    let prices: Vec<f64> = result
        .rows
        .iter()
        .map(|row| match &row[1] {
            Value::Float(f) => *f,
            other => panic!("expected price, got {other:?}"),
        })
        .collect();
    let mut sorted = prices.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(prices, sorted);
    assert_eq!(prices[0], 2499.99);
}

#[tokio::test]
async fn generated_sql_has_no_fences_or_prose() {
    let dir = tempdir().unwrap();
    let writer = store_writer(&dir.path().join("store.db")).await;

    for question in [
        "How many customers are there?",
        "What are the top 5 most expensive products?",
        "List customers",
    ] {
        let sql = writer.generate_query(question).await.unwrap();
        assert!(!sql.is_empty(), "empty SQL for {question:?}");
        assert!(!sql.contains("```"), "fence left in SQL for {question:?}");
        assert!(
            sql.to_uppercase().starts_with("SELECT") || sql.to_uppercase().starts_with("WITH"),
            "prose left in SQL for {question:?}: {sql}"
        );
    }
}

#[tokio::test]
async fn repeated_questions_give_consistent_results() {
    let dir = tempdir().unwrap();
    let writer = store_writer(&dir.path().join("store.db")).await;

    let first_sql = writer
        .generate_query("How many customers are there?")
        .await
        .unwrap();
    let second_sql = writer
        .generate_query("How many customers are there?")
        .await
        .unwrap();

    let first = writer.execute(&first_sql).await.unwrap();
    let second = writer.execute(&second_sql).await.unwrap();

    assert!(first.same_data(&second));
}

#[tokio::test]
async fn nonsense_prompt_returns_documented_fallback() {
    let dir = tempdir().unwrap();
    let writer = store_writer(&dir.path().join("store.db")).await;

    let sql = writer
        .generate_query("purple monkey dishwasher")
        .await
        .unwrap();
    assert_eq!(sql, "");

    let sql = writer.generate_query("").await.unwrap();
    assert_eq!(sql, "");
}

#[tokio::test]
async fn invalid_candidate_is_repaired_through_retry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    seed_store(&path).await;

    // First attempt references a misspelled column; the EXPLAIN dry run
    // rejects it and the scripted second attempt is correct.
    let llm = MockLlmClient::new().with_script(vec![
        "```sql\nSELECT prce FROM products;\n```".to_string(),
        "```sql\nSELECT list_price FROM products;\n```".to_string(),
    ]);
    let db = db::connect(&path).await.unwrap();
    let writer = QueryWriter::from_parts(db, Box::new(llm), None)
        .await
        .unwrap();

    let sql = writer.generate_query("List product prices").await.unwrap();
    assert_eq!(sql, "SELECT list_price FROM products;");

    let result = writer.execute(&sql).await.unwrap();
    assert_eq!(result.row_count, 6);
}
