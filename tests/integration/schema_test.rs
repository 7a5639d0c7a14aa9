//! Schema introspection tests against a real SQLite file.

use super::common::seed_store;
use pretty_assertions::assert_eq;
use querywright::db;
use tempfile::tempdir;

#[tokio::test]
async fn introspects_tables_in_name_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    seed_store(&path).await;

    let client = db::connect(&path).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();

    assert_eq!(schema.table_names(), vec!["customers", "orders", "products"]);
}

#[tokio::test]
async fn introspects_columns_with_types_and_nullability() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    seed_store(&path).await;

    let client = db::connect(&path).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();

    let customers = schema.table("customers").unwrap();
    assert_eq!(customers.primary_key, vec!["customer_id"]);

    let email = customers
        .columns
        .iter()
        .find(|c| c.name == "email")
        .unwrap();
    assert_eq!(email.data_type, "TEXT");
    assert!(email.is_nullable);

    let first_name = customers
        .columns
        .iter()
        .find(|c| c.name == "first_name")
        .unwrap();
    assert!(!first_name.is_nullable);
}

#[tokio::test]
async fn introspects_foreign_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    seed_store(&path).await;

    let client = db::connect(&path).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();

    assert_eq!(schema.foreign_keys.len(), 1);
    let fk = &schema.foreign_keys[0];
    assert_eq!(fk.from_table, "orders");
    assert_eq!(fk.from_columns, vec!["customer_id"]);
    assert_eq!(fk.to_table, "customers");
    assert_eq!(fk.to_columns, vec!["customer_id"]);
}

#[tokio::test]
async fn formatted_schema_mentions_every_table_and_relationship() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    seed_store(&path).await;

    let client = db::connect(&path).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();
    let formatted = schema.format_for_llm();

    assert!(formatted.contains("Table customers:"));
    assert!(formatted.contains("Table products:"));
    assert!(formatted.contains("Table orders:"));
    assert!(formatted.contains("list_price (REAL, NOT NULL)"));
    assert!(formatted.contains("orders.customer_id -> customers.customer_id"));
}
