//! Knowledge base for learned queries.
//!
//! Persists (question, sql) pairs the agent has gotten right, and retrieves
//! the most similar past questions to fold into future prompts. Similarity
//! uses embedding vectors when an embedding backend is available, with a
//! token-overlap fallback so retrieval still works offline.

use crate::error::{Result, WriterError};
use crate::llm::prompt::LearnedExample;
use crate::llm::Embedder;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Knowledge base over a local SQLite store.
pub struct KnowledgeBase {
    pool: SqlitePool,
    embedder: Option<Box<dyn Embedder>>,
}

impl KnowledgeBase {
    /// Opens (or creates) the knowledge store at the given path.
    pub async fn open(path: &Path, embedder: Option<Box<dyn Embedder>>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                WriterError::knowledge(format!("Failed to create store directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                WriterError::knowledge(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let kb = Self { pool, embedder };
        kb.migrate().await?;
        debug!("Opened knowledge store: {}", path.display());
        Ok(kb)
    }

    /// Opens an in-memory knowledge store, for tests.
    pub async fn open_in_memory(embedder: Option<Box<dyn Embedder>>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| WriterError::knowledge(format!("Failed to open in-memory store: {e}")))?;

        let kb = Self { pool, embedder };
        kb.migrate().await?;
        Ok(kb)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS learned_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                sql TEXT NOT NULL,
                embedding TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| WriterError::knowledge(format!("Failed to migrate store: {e}")))?;
        Ok(())
    }

    /// Persists a learned (question, sql) pair.
    ///
    /// Embedding failures degrade to an unembedded entry rather than losing
    /// the pair; such entries still participate in search via token overlap.
    pub async fn add_learned_query(&self, question: &str, sql: &str) -> Result<()> {
        let embedding = match &self.embedder {
            Some(embedder) => match embedder.embed(question).await {
                Ok(vector) => serde_json::to_string(&vector).ok(),
                Err(e) => {
                    warn!("Embedding failed, storing without vector: {e}");
                    None
                }
            },
            None => None,
        };

        sqlx::query("INSERT INTO learned_queries (question, sql, embedding) VALUES (?, ?, ?)")
            .bind(question)
            .bind(sql)
            .bind(embedding)
            .execute(&self.pool)
            .await
            .map_err(|e| WriterError::knowledge(format!("Failed to store learned query: {e}")))?;

        debug!("Learned new query: {question}");
        Ok(())
    }

    /// Returns the `k` learned pairs most similar to `question`.
    ///
    /// Entries with embeddings are scored by cosine similarity against the
    /// embedded question; entries without fall back to token overlap. Only
    /// positive-scoring entries are returned.
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<LearnedExample>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, Option<String>)> =
            sqlx::query_as("SELECT question, sql, embedding FROM learned_queries")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| WriterError::knowledge(format!("Failed to search store: {e}")))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = match &self.embedder {
            Some(embedder) => match embedder.embed(question).await {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!("Embedding failed, falling back to token overlap: {e}");
                    None
                }
            },
            None => None,
        };

        let mut scored: Vec<(f32, LearnedExample)> = rows
            .into_iter()
            .map(|(stored_question, sql, embedding)| {
                let stored_vector: Option<Vec<f32>> = embedding
                    .as_deref()
                    .and_then(|json| serde_json::from_str(json).ok());

                let score = match (&query_vector, &stored_vector) {
                    (Some(a), Some(b)) => cosine_similarity(a, b).max(0.0),
                    _ => token_overlap(question, &stored_question),
                };

                (
                    score,
                    LearnedExample {
                        question: stored_question,
                        sql,
                    },
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .filter(|(score, _)| *score > 0.0)
            .take(k)
            .map(|(_, example)| example)
            .collect())
    }

    /// Returns the number of learned pairs in the store.
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learned_queries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| WriterError::knowledge(format!("Failed to count store: {e}")))?;
        Ok(count as u64)
    }

    /// Returns true if the store holds no learned pairs.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Cosine similarity between two vectors. Mismatched dimensions score zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Jaccard overlap of lowercase word sets.
fn token_overlap(a: &str, b: &str) -> f32 {
    let tokens_a: HashSet<String> = tokenize(a);
    let tokens_b: HashSet<String> = tokenize(b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count() as f32;
    let union = tokens_a.union(&tokens_b).count() as f32;
    intersection / union
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
