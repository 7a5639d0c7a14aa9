//! Prompt construction for LLM requests.
//!
//! Builds the system prompt with database schema context, retrieved
//! examples, and the error history accumulated across retry attempts.

use crate::llm::types::Message;

/// System prompt template for the SQL generation request.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL assistant for a SQLite database. Generate SQL queries based on user questions.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid SQLite SQL
- Return ONLY the SQL query, no explanations
- ALWAYS use table aliases (e.g. p.list_price, o.order_date) to prevent ambiguous column errors
- Use explicit JOINs based on the foreign keys
- Never generate INSERT, UPDATE, DELETE, DROP, or other data-modifying statements

OUTPUT FORMAT:
Return the SQL query wrapped in ```sql code blocks."#;

/// A learned (question, sql) pair retrieved from the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedExample {
    /// The natural-language question.
    pub question: String,
    /// The SQL that answered it.
    pub sql: String,
}

/// A failed generation attempt, fed back into the next retry.
#[derive(Debug, Clone)]
pub struct AttemptError {
    /// The SQL the model produced.
    pub sql: String,
    /// Why it was rejected (engine message or classification verdict).
    pub error: String,
}

/// Builds the system prompt with the schema and retrieved examples injected.
pub fn build_system_prompt(schema_text: &str, examples: &[LearnedExample]) -> String {
    let mut prompt = SYSTEM_PROMPT_TEMPLATE.replace("{schema}", schema_text);

    if !examples.is_empty() {
        prompt.push_str("\n\nRELEVANT PAST QUERIES:\n");
        for example in examples {
            prompt.push_str(&format!("Q: {}\nSQL: {}\n", example.question, example.sql));
        }
    }

    prompt
}

/// Builds the complete message list for a generation request.
///
/// On retries, `errors` carries the rejected SQL and engine messages from
/// earlier attempts so the model can correct itself instead of repeating
/// the same mistake.
pub fn build_messages(
    schema_text: &str,
    examples: &[LearnedExample],
    question: &str,
    errors: &[AttemptError],
) -> Vec<Message> {
    let mut user_content = String::from(question);

    if !errors.is_empty() {
        user_content.push_str("\n\nYour previous attempts failed. Fix the problem:\n");
        for (i, attempt) in errors.iter().enumerate() {
            user_content.push_str(&format!(
                "Attempt {} SQL:\n{}\nError: {}\n",
                i + 1,
                attempt.sql,
                attempt.error
            ));
        }
    }

    vec![
        Message::system(build_system_prompt(schema_text, examples)),
        Message::user(user_content),
    ]
}
