//! Ollama LLM client implementation.
//!
//! Implements the LlmClient and Embedder traits for local Ollama instances.
//! This is the default backend: the agent was designed around locally hosted
//! models.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, WriterError};
use crate::llm::types::Message;
use crate::llm::{Embedder, LlmClient};

/// Default timeout for API requests. Local models can be slow to load and
/// slower to generate, so this is generous.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default Ollama API URL.
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model for knowledge-base indexing.
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model to use for chat completions (e.g., "llama3.2").
    pub model: String,
    /// Model to use for embeddings.
    pub embed_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Creates a new config with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new("llama3.2")
    }
}

/// Ollama LLM client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    /// Creates a new Ollama client with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WriterError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `OLLAMA_HOST` for the base URL (defaults to
    /// http://localhost:11434), `OLLAMA_MODEL` for the chat model (defaults
    /// to "llama3.2"), and `OLLAMA_EMBED_MODEL` for the embedding model.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        let embed_model =
            std::env::var("OLLAMA_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());

        Self::new(
            OllamaConfig::new(model)
                .with_url(base_url)
                .with_embed_model(embed_model),
        )
    }

    /// Checks if Ollama is available at the configured URL.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        self.client.get(&url).send().await.is_ok()
    }

    /// Converts internal messages to Ollama API format.
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Returns the chat API endpoint URL.
    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }

    /// Returns the embeddings API endpoint URL.
    fn embed_url(&self) -> String {
        format!("{}/api/embed", self.config.base_url)
    }

    fn map_transport_error(e: reqwest::Error) -> WriterError {
        if e.is_timeout() {
            WriterError::llm("Request timed out. Try again.")
        } else if e.is_connect() {
            WriterError::llm("Failed to connect to Ollama. Is it running? Try: ollama serve")
        } else {
            WriterError::llm(format!("Request failed: {}", e))
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            stream: false,
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WriterError::llm(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(WriterError::llm(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let response: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| WriterError::llm(format!("Failed to parse response: {}", e)))?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: self.config.embed_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(self.embed_url())
            .json(&request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WriterError::llm(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(WriterError::llm(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let response: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| WriterError::llm(format!("Failed to parse response: {}", e)))?;

        // Newer servers return `embeddings` (batched); older ones `embedding`.
        response
            .embeddings
            .and_then(|mut batch| if batch.is_empty() { None } else { Some(batch.remove(0)) })
            .or(response.embedding)
            .ok_or_else(|| WriterError::llm("Embedding response contained no vector"))
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}
