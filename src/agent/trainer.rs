//! Self-play training loop.
//!
//! Asks an LLM to produce ground-truth (question, sql) pairs over the live
//! schema at increasing difficulty, has the agent solve each question, and
//! feeds confirmed pairs into the knowledge base. Results are compared
//! order-insensitively: the student does not need to produce the same SQL
//! text, only the same data.

use crate::agent::QueryWriter;
use crate::error::Result;
use crate::llm::types::Message;
use crate::llm::LlmClient;
use crate::safety::classify_sql;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};

/// Retries per ground-truth generation before giving up on a question.
const GENERATION_RETRIES: usize = 5;

/// Consecutive student failures before a level is abandoned.
const MAX_CONSECUTIVE_FAILURES: usize = 10;

/// Curriculum difficulty levels, easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// All levels in curriculum order.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Returns the level as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }

    /// SQL features the ground-truth generator should exercise.
    fn guidance(&self) -> &'static str {
        match self {
            Self::Easy => "Use a single table with basic SELECT ... WHERE filtering.",
            Self::Medium => "Use a JOIN between 2 tables.",
            Self::Hard => "Use JOINs across 3 or more tables, GROUP BY, and aggregates.",
            Self::Expert => "Use window functions (RANK, LEAD), CTEs, or subqueries.",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one curriculum level.
#[derive(Debug, Clone)]
pub struct LevelOutcome {
    /// The difficulty level.
    pub level: Difficulty,
    /// Questions the student solved (and the agent learned).
    pub solved: usize,
    /// The per-level target.
    pub target: usize,
    /// Whether the level was abandoned after repeated failures.
    pub abandoned: bool,
}

/// Summary of a full training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// One outcome per level, in curriculum order.
    pub levels: Vec<LevelOutcome>,
}

impl TrainingReport {
    /// Total questions solved across all levels.
    pub fn total_solved(&self) -> usize {
        self.levels.iter().map(|l| l.solved).sum()
    }
}

/// A validated ground-truth pair.
struct GroundTruth {
    question: String,
    sql: String,
    result: crate::db::QueryResult,
}

/// Wire format the generator is asked to produce.
#[derive(Debug, Deserialize)]
struct GroundTruthSpec {
    question: String,
    sql: String,
}

/// Self-play curriculum driver.
pub struct Trainer<'a> {
    writer: &'a QueryWriter,
    generator: Box<dyn LlmClient>,
    target_per_level: usize,
}

impl<'a> Trainer<'a> {
    /// Creates a trainer that teaches `writer` using `generator` to produce
    /// ground truth.
    pub fn new(writer: &'a QueryWriter, generator: Box<dyn LlmClient>) -> Self {
        Self {
            writer,
            generator,
            target_per_level: 5,
        }
    }

    /// Sets the number of questions to solve per level.
    pub fn with_target_per_level(mut self, target: usize) -> Self {
        self.target_per_level = target;
        self
    }

    /// Runs the full curriculum and returns the per-level outcomes.
    pub async fn run(&self) -> Result<TrainingReport> {
        let mut report = TrainingReport::default();
        let mut seen = HashSet::new();

        for level in Difficulty::ALL {
            info!("Starting level: {level}");
            let outcome = self.run_level(level, &mut seen).await?;
            info!(
                "Level {level}: solved {}/{}{}",
                outcome.solved,
                outcome.target,
                if outcome.abandoned { " (abandoned)" } else { "" }
            );
            report.levels.push(outcome);
        }

        Ok(report)
    }

    async fn run_level(&self, level: Difficulty, seen: &mut HashSet<u64>) -> Result<LevelOutcome> {
        let mut solved = 0;
        let mut consecutive_failures = 0;

        while solved < self.target_per_level {
            if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                warn!("{MAX_CONSECUTIVE_FAILURES} failures in a row at level {level}, abandoning");
                return Ok(LevelOutcome {
                    level,
                    solved,
                    target: self.target_per_level,
                    abandoned: true,
                });
            }

            let Some(truth) = self.generate_ground_truth(level, seen).await else {
                consecutive_failures += 1;
                continue;
            };
            debug!("Ground truth question: {}", truth.question);

            let student_sql = self.writer.generate_query(&truth.question).await?;
            if student_sql.is_empty() {
                debug!("Student produced no SQL");
                consecutive_failures += 1;
                continue;
            }

            let student_result = match self.writer.execute(&student_sql).await {
                Ok(result) => result,
                Err(e) => {
                    debug!("Student SQL failed to execute: {e}");
                    consecutive_failures += 1;
                    continue;
                }
            };

            if student_result.same_data(&truth.result) {
                self.writer.learn(&truth.question, &student_sql).await?;
                solved += 1;
                consecutive_failures = 0;
                debug!("Solved ({solved}/{})", self.target_per_level);
            } else {
                debug!("Wrong result for: {}", truth.question);
                consecutive_failures += 1;
            }
        }

        Ok(LevelOutcome {
            level,
            solved,
            target: self.target_per_level,
            abandoned: false,
        })
    }

    /// Asks the generator for a fresh, valid ground-truth pair.
    ///
    /// A pair qualifies when it parses as JSON, is read-only, executes
    /// against the live database, returns at least one row, and has not
    /// been generated before.
    async fn generate_ground_truth(
        &self,
        level: Difficulty,
        seen: &mut HashSet<u64>,
    ) -> Option<GroundTruth> {
        let prompt = format!(
            r#"You are a SQL teacher.
Schema:
{schema}

Task: Generate 1 unique SQL query and its corresponding natural language question.
Difficulty: {level} ({guidance})
Constraint: The SQL MUST be valid SQLite syntax and return data (not empty).

Output JSON ONLY:
{{
  "question": "...",
  "sql": "..."
}}"#,
            schema = self.writer.schema_text(),
            level = level,
            guidance = level.guidance(),
        );

        for _ in 0..GENERATION_RETRIES {
            let response = match self
                .generator
                .complete(&[Message::user(prompt.clone())])
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    debug!("Ground-truth generation failed: {e}");
                    continue;
                }
            };

            let Some(spec) = parse_ground_truth(&response) else {
                continue;
            };

            let key = pair_hash(&spec.question, &spec.sql);
            if seen.contains(&key) {
                continue;
            }

            if !classify_sql(&spec.sql).is_read_only() {
                continue;
            }

            let result = match self.writer.execute(&spec.sql).await {
                Ok(result) => result,
                Err(_) => continue,
            };
            if result.is_empty() {
                continue;
            }

            seen.insert(key);
            return Some(GroundTruth {
                question: spec.question,
                sql: spec.sql,
                result,
            });
        }

        None
    }
}

/// Parses the generator's response, tolerating fences and chatter around
/// the JSON object.
fn parse_ground_truth(response: &str) -> Option<GroundTruthSpec> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Content hash used to skip duplicate generated pairs.
fn pair_hash(question: &str, sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    question.hash(&mut hasher);
    sql.hash(&mut hasher);
    hasher.finish()
}
