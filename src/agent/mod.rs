//! The natural-language-to-SQL agent.
//!
//! `QueryWriter` owns a database connection, a formatted schema descriptor,
//! an LLM client, and an optional knowledge base of learned queries. Each
//! `generate_query` call is independent: build the prompt, ask the backend,
//! clean the completion, classify it, dry-run it, and retry with error
//! feedback until the candidate compiles or the attempt budget runs out.

pub mod trainer;

pub use trainer::{Trainer, TrainingReport};

use crate::db::{self, DatabaseClient, QueryResult, Schema};
use crate::error::{Result, WriterError};
use crate::knowledge::KnowledgeBase;
use crate::llm::prompt::{build_messages, AttemptError, LearnedExample};
use crate::llm::{create_client, extract_sql, LlmClient, LlmProvider};
use crate::safety::classify_sql;
use std::path::Path;
use tracing::{debug, warn};

/// How many generation attempts before settling for a best-effort answer.
const MAX_ATTEMPTS: usize = 3;

/// How many learned examples to retrieve per question by default.
const DEFAULT_EXAMPLES: usize = 3;

/// The natural-language-to-SQL agent.
pub struct QueryWriter {
    db: Box<dyn DatabaseClient>,
    llm: Box<dyn LlmClient>,
    knowledge: Option<KnowledgeBase>,
    schema: Schema,
    schema_text: String,
    max_attempts: usize,
    examples_per_prompt: usize,
}

impl QueryWriter {
    /// Opens an agent for the database at `db_path` with the default
    /// backend (Ollama, configured from the environment) and no knowledge
    /// base.
    ///
    /// Fails with a `Connection` error when the path is invalid or
    /// inaccessible.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let db = db::connect(db_path).await?;
        let llm = create_client(LlmProvider::default(), None)?;
        Self::from_parts(db, llm, None).await
    }

    /// Assembles an agent from explicit parts.
    ///
    /// The schema is introspected once here and cached for the lifetime of
    /// the instance.
    pub async fn from_parts(
        db: Box<dyn DatabaseClient>,
        llm: Box<dyn LlmClient>,
        knowledge: Option<KnowledgeBase>,
    ) -> Result<Self> {
        let schema = db.introspect_schema().await?;
        let schema_text = schema.format_for_llm();

        Ok(Self {
            db,
            llm,
            knowledge,
            schema,
            schema_text,
            max_attempts: MAX_ATTEMPTS,
            examples_per_prompt: DEFAULT_EXAMPLES,
        })
    }

    /// Sets how many learned examples are retrieved per question.
    pub fn with_examples_per_prompt(mut self, n: usize) -> Self {
        self.examples_per_prompt = n;
        self
    }

    /// Returns the cached schema descriptor.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the schema formatted as the LLM sees it.
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    /// Generates a SQL query from a natural-language prompt.
    ///
    /// Returns a single SQL string with no markdown fences or prose. When
    /// the question cannot be translated (ambiguous, unanswerable, or the
    /// backend keeps producing rejected candidates), the last candidate is
    /// returned as a best effort, or the empty string when no candidate was
    /// ever produced. `Err` means the backend was unreachable on every
    /// attempt with nothing to fall back to, or the database itself failed
    /// during validation.
    pub async fn generate_query(&self, prompt: &str) -> Result<String> {
        let examples = self.retrieve_examples(prompt).await;

        let mut errors: Vec<AttemptError> = Vec::new();
        let mut last_candidate: Option<String> = None;
        let mut llm_failures = 0;
        let mut last_llm_error: Option<WriterError> = None;

        for attempt in 1..=self.max_attempts {
            let messages = build_messages(&self.schema_text, &examples, prompt, &errors);

            let response = match self.llm.complete(&messages).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("LLM request failed on attempt {attempt}: {e}");
                    llm_failures += 1;
                    last_llm_error = Some(e);
                    continue;
                }
            };

            let Some(sql) = extract_sql(&response) else {
                debug!("Attempt {attempt}: response contained no SQL");
                errors.push(AttemptError {
                    sql: response.chars().take(200).collect(),
                    error: "The response did not contain a SQL statement.".to_string(),
                });
                continue;
            };

            let classification = classify_sql(&sql);
            if !classification.is_read_only() {
                debug!(
                    "Attempt {attempt}: rejected {} statement",
                    classification.statement_type
                );
                errors.push(AttemptError {
                    sql,
                    error: format!(
                        "Only read-only SELECT statements are allowed, got {}.",
                        classification.statement_type
                    ),
                });
                continue;
            }

            last_candidate = Some(sql.clone());

            match self.db.validate(&sql).await? {
                None => {
                    debug!("Attempt {attempt}: candidate validated");
                    return Ok(sql);
                }
                Some(engine_error) => {
                    debug!("Attempt {attempt} failed validation: {engine_error}");
                    errors.push(AttemptError {
                        sql,
                        error: engine_error,
                    });
                }
            }
        }

        if let Some(sql) = last_candidate {
            warn!(
                "Returning best-effort SQL after {} attempts",
                self.max_attempts
            );
            return Ok(sql);
        }

        if llm_failures == self.max_attempts {
            return Err(last_llm_error
                .unwrap_or_else(|| WriterError::llm("backend unavailable on every attempt")));
        }

        warn!("No SQL could be generated for prompt: {prompt:?}");
        Ok(String::new())
    }

    /// Executes a read-only SQL statement against the agent's database.
    ///
    /// Anything that is not classified as read-only is refused.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let classification = classify_sql(sql);
        if !classification.is_read_only() {
            return Err(WriterError::query(format!(
                "Refusing to execute {} statement",
                classification.statement_type
            )));
        }
        self.db.execute_query(sql).await
    }

    /// Saves a confirmed (question, sql) pair to the knowledge base.
    ///
    /// A no-op when no knowledge base is attached.
    pub async fn learn(&self, prompt: &str, sql: &str) -> Result<()> {
        match &self.knowledge {
            Some(kb) => kb.add_learned_query(prompt, sql).await,
            None => Ok(()),
        }
    }

    /// Closes the underlying database connection.
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }

    /// Retrieves similar learned examples; retrieval failures degrade to
    /// generation without examples.
    async fn retrieve_examples(&self, prompt: &str) -> Vec<LearnedExample> {
        let Some(kb) = &self.knowledge else {
            return Vec::new();
        };

        match kb.search(prompt, self.examples_per_prompt).await {
            Ok(examples) => examples,
            Err(e) => {
                warn!("Knowledge base search failed: {e}");
                Vec::new()
            }
        }
    }
}
