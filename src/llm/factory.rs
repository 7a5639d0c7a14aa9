//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::error::{Result, WriterError};
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client for the given provider.
///
/// If `model` is provided, it takes precedence over environment variables.
/// Provider settings resolve from the environment:
/// - Ollama: `OLLAMA_HOST` (defaults to http://localhost:11434),
///   `OLLAMA_MODEL` (defaults to "llama3.2")
/// - OpenAI: `OPENAI_API_KEY` (required), `OPENAI_MODEL` (defaults to
///   "gpt-4o"), `OPENAI_BASE_URL`
pub fn create_client(provider: LlmProvider, model: Option<String>) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::Ollama => {
            let client = match model {
                Some(model) => {
                    let host = std::env::var("OLLAMA_HOST")
                        .unwrap_or_else(|_| "http://localhost:11434".to_string());
                    let embed_model = std::env::var("OLLAMA_EMBED_MODEL")
                        .unwrap_or_else(|_| "nomic-embed-text".to_string());
                    OllamaClient::new(
                        OllamaConfig::new(model)
                            .with_url(host)
                            .with_embed_model(embed_model),
                    )?
                }
                None => OllamaClient::from_env()?,
            };
            Ok(Box::new(client))
        }
        LlmProvider::OpenAi => {
            let key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                WriterError::llm("No API key configured. Set OPENAI_API_KEY.")
            })?;
            let model = model
                .or_else(|| std::env::var("OPENAI_MODEL").ok())
                .unwrap_or_else(|| "gpt-4o".to_string());
            let mut config = OpenAiConfig::new(key, model);
            if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
                config = config.with_base_url(base_url);
            }
            Ok(Box::new(OpenAiClient::new(config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_client() {
        let client = create_client(LlmProvider::Mock, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(LlmProvider::Ollama, Some("codellama".to_string()));
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_openai_without_key_fails() {
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = create_client(LlmProvider::OpenAi, None);
        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("No API key configured"));

        if let Some(key) = original {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }
}
