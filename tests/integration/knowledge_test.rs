//! Knowledge base persistence and retrieval tests.

use pretty_assertions::assert_eq;
use querywright::knowledge::KnowledgeBase;
use tempfile::tempdir;

#[tokio::test]
async fn learned_queries_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knowledge.db");

    {
        let kb = KnowledgeBase::open(&path, None).await.unwrap();
        kb.add_learned_query(
            "How many customers are there?",
            "SELECT COUNT(*) FROM customers;",
        )
        .await
        .unwrap();
        assert_eq!(kb.len().await.unwrap(), 1);
    }

    let kb = KnowledgeBase::open(&path, None).await.unwrap();
    assert_eq!(kb.len().await.unwrap(), 1);

    let results = kb.search("how many customers", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].sql, "SELECT COUNT(*) FROM customers;");
}

#[tokio::test]
async fn store_directory_is_created_on_demand() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("knowledge.db");

    let kb = KnowledgeBase::open(&path, None).await.unwrap();
    assert!(kb.is_empty().await.unwrap());
    assert!(path.exists());
}

#[tokio::test]
async fn search_returns_at_most_k_results() {
    let dir = tempdir().unwrap();
    let kb = KnowledgeBase::open(&dir.path().join("knowledge.db"), None)
        .await
        .unwrap();

    for i in 0..5 {
        kb.add_learned_query(
            &format!("How many customers bought product {i}?"),
            &format!("SELECT COUNT(*) FROM orders WHERE product_id = {i};"),
        )
        .await
        .unwrap();
    }

    let results = kb.search("how many customers bought things", 2).await.unwrap();
    assert_eq!(results.len(), 2);
}
