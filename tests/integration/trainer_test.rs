//! Self-play training tests over a real SQLite file.

use super::common::seed_store;
use pretty_assertions::assert_eq;
use querywright::agent::{QueryWriter, Trainer};
use querywright::db;
use querywright::knowledge::KnowledgeBase;
use querywright::llm::MockLlmClient;
use tempfile::tempdir;

const TEACHER_JSON: &str =
    r#"{"question": "How many customers are there?", "sql": "SELECT COUNT(*) FROM customers"}"#;

#[tokio::test]
async fn solved_questions_land_in_the_knowledge_base() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    seed_store(&db_path).await;

    let kb = KnowledgeBase::open(&dir.path().join("knowledge.db"), None)
        .await
        .unwrap();

    let db = db::connect(&db_path).await.unwrap();
    let writer = QueryWriter::from_parts(db, Box::new(MockLlmClient::new()), Some(kb))
        .await
        .unwrap();

    let generator = MockLlmClient::new().with_response("SQL teacher", TEACHER_JSON);
    let trainer = Trainer::new(&writer, Box::new(generator)).with_target_per_level(1);

    let report = trainer.run().await.unwrap();

    // The generator only knows one pair: the easy level solves it, later
    // levels hit the duplicate filter and abandon.
    assert_eq!(report.levels[0].solved, 1);
    assert!(!report.levels[0].abandoned);
    assert_eq!(report.total_solved(), 1);

    // The confirmed pair was persisted and is retrievable after reopening
    // the store.
    let kb = KnowledgeBase::open(&dir.path().join("knowledge.db"), None)
        .await
        .unwrap();
    assert_eq!(kb.len().await.unwrap(), 1);
    let examples = kb
        .search("How many customers are there?", 3)
        .await
        .unwrap();
    assert_eq!(examples[0].sql, "SELECT COUNT(*) FROM customers;");
}

#[tokio::test]
async fn wrong_student_answers_are_not_learned() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    seed_store(&db_path).await;

    let kb = KnowledgeBase::open(&dir.path().join("knowledge.db"), None)
        .await
        .unwrap();

    // The student always counts orders (4) while the truth counts
    // customers (5), so nothing ever matches.
    let student = MockLlmClient::new()
        .with_response("customers", "```sql\nSELECT COUNT(*) FROM orders;\n```");

    let db = db::connect(&db_path).await.unwrap();
    let writer = QueryWriter::from_parts(db, Box::new(student), Some(kb))
        .await
        .unwrap();

    let generator = MockLlmClient::new().with_response("SQL teacher", TEACHER_JSON);
    let trainer = Trainer::new(&writer, Box::new(generator)).with_target_per_level(1);

    let report = trainer.run().await.unwrap();

    assert_eq!(report.total_solved(), 0);
    assert!(report.levels.iter().all(|l| l.abandoned));
}
