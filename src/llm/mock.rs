//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus a scripted
//! mode that replays a fixed sequence of responses for retry-loop tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// When non-empty, responses are replayed in order, ignoring patterns.
    /// The last entry repeats once the script is exhausted.
    script: Vec<String>,
    call_count: AtomicUsize,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Replays the given responses in order regardless of input.
    pub fn with_script(mut self, responses: Vec<String>) -> Self {
        self.script = responses;
        self
    }

    /// Returns how many completions have been requested.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        // Default pattern matching against the store schema
        if input_lower.contains("how many customers") {
            return "```sql\nSELECT COUNT(*) FROM customers;\n```".to_string();
        }

        if input_lower.contains("top 5") && input_lower.contains("expensive") {
            return "```sql\nSELECT p.product_name, p.list_price\nFROM products p\nORDER BY p.list_price DESC\nLIMIT 5;\n```"
                .to_string();
        }

        if input_lower.contains("all customers") || input_lower.contains("list customers") {
            return "```sql\nSELECT * FROM customers;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        if input_lower.contains("orders") && input_lower.contains("customer") {
            return "```sql\nSELECT o.* FROM orders o\nJOIN customers c ON o.customer_id = c.customer_id;\n```"
                .to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.script.is_empty() {
            let index = call.min(self.script.len() - 1);
            return Ok(self.script[index].clone());
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_customer_count() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("How many customers are there?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT COUNT(*) FROM customers"));
    }

    #[tokio::test]
    async fn test_mock_returns_top_products() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("What are the top 5 most expensive products?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("ORDER BY p.list_price DESC"));
        assert!(response.contains("LIMIT 5"));
    }

    #[tokio::test]
    async fn test_mock_returns_unknown_response() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("What is the meaning of life?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("don't understand"));
    }

    #[tokio::test]
    async fn test_mock_custom_response() {
        let client = MockLlmClient::new()
            .with_response("revenue", "```sql\nSELECT SUM(total) FROM orders;\n```");

        let messages = vec![Message::user("What is the total revenue?")];
        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT SUM(total) FROM orders"));
    }

    #[tokio::test]
    async fn test_mock_script_replays_in_order() {
        let client = MockLlmClient::new().with_script(vec![
            "```sql\nSELECT prce FROM products;\n```".to_string(),
            "```sql\nSELECT list_price FROM products;\n```".to_string(),
        ]);
        let messages = vec![Message::user("anything")];

        let first = client.complete(&messages).await.unwrap();
        let second = client.complete(&messages).await.unwrap();
        let third = client.complete(&messages).await.unwrap();

        assert!(first.contains("prce"));
        assert!(second.contains("list_price"));
        // Script exhausted: last entry repeats
        assert_eq!(second, third);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_case_insensitive() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("HOW MANY CUSTOMERS ARE THERE?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT COUNT(*) FROM customers"));
    }
}
