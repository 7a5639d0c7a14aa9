//! Configuration management for querywright.
//!
//! Handles loading configuration from TOML files and environment variables:
//! which database to target, which LLM backend translates questions, and
//! where learned examples are stored.

use crate::error::{Result, WriterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for querywright.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM backend configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Target database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Knowledge base configuration.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// LLM backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "ollama", "openai", or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "llama3.2", "gpt-4o").
    pub model: Option<String>,
}

fn default_provider() -> String {
    "ollama".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
        }
    }
}

/// Target database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("store.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Whether learned-example retrieval is enabled at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path to the knowledge store. Defaults to the platform data directory.
    pub path: Option<PathBuf>,

    /// How many learned examples to retrieve per question.
    #[serde(default = "default_examples")]
    pub examples: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_examples() -> usize {
    3
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: None,
            examples: default_examples(),
        }
    }
}

impl KnowledgeConfig {
    /// Resolves the knowledge store path, falling back to the platform
    /// data directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(Config::default_store_path)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querywright")
            .join("config.toml")
    }

    /// Returns the default knowledge store path for the current platform.
    pub fn default_store_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querywright")
            .join("knowledge.db")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WriterError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            WriterError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
