//! Shared fixtures for integration tests.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;

/// Seed statements for a small retail database: five customers, six
/// products, and a handful of orders.
const SEED: &[&str] = &[
    r#"
    CREATE TABLE customers (
        customer_id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT
    )
    "#,
    r#"
    CREATE TABLE products (
        product_id INTEGER PRIMARY KEY,
        product_name TEXT NOT NULL,
        list_price REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE orders (
        order_id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(customer_id),
        order_date TEXT NOT NULL
    )
    "#,
    r#"
    INSERT INTO customers (first_name, last_name, email) VALUES
        ('Alice', 'Archer', 'alice@example.com'),
        ('Bob', 'Baker', 'bob@example.com'),
        ('Carol', 'Cooper', NULL),
        ('Dan', 'Drake', 'dan@example.com'),
        ('Erin', 'Ellis', NULL)
    "#,
    r#"
    INSERT INTO products (product_name, list_price) VALUES
        ('Trailblazer 900', 2499.99),
        ('Roadster Elite', 1899.00),
        ('Gravel King', 1499.50),
        ('City Cruiser', 799.00),
        ('Commuter Basic', 450.00),
        ('Kids Starter', 199.99)
    "#,
    r#"
    INSERT INTO orders (customer_id, order_date) VALUES
        (1, '2024-01-05'),
        (1, '2024-02-11'),
        (2, '2024-02-14'),
        (4, '2024-03-01')
    "#,
];

/// Creates and seeds a retail database at `path`.
pub async fn seed_store(path: &Path) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("seed pool");

    for statement in SEED {
        sqlx::query(statement).execute(&pool).await.expect("seed");
    }

    pool.close().await;
}
