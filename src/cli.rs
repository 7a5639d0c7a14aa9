//! Command-line argument parsing for querywright.
//!
//! Uses clap to parse CLI arguments for the ask/repl/train/schema
//! subcommands.

use crate::config::Config;
use crate::error::{Result, WriterError};
use crate::llm::LlmProvider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A natural-language-to-SQL agent for SQLite databases.
#[derive(Parser, Debug)]
#[command(name = "querywright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite database file (overrides config)
    #[arg(short, long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// LLM provider: ollama, openai, or mock (overrides config)
    #[arg(long, value_name = "PROVIDER", env = "QUERYWRIGHT_PROVIDER")]
    pub provider: Option<String>,

    /// Model name (overrides config and provider defaults)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Knowledge store path (overrides config)
    #[arg(long, value_name = "PATH")]
    pub knowledge: Option<PathBuf>,

    /// Disable learned-example retrieval and storage
    #[arg(long)]
    pub no_learn: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. Running without one starts the interactive loop.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate SQL for a single question
    Ask {
        /// The natural-language question
        question: String,

        /// Print the SQL without executing it
        #[arg(long)]
        no_execute: bool,
    },

    /// Interactive question loop
    Repl,

    /// Self-play training over the difficulty curriculum
    Train {
        /// Questions to solve per difficulty level
        #[arg(long, value_name = "N", default_value_t = 5)]
        per_level: usize,
    },

    /// Print the schema descriptor the LLM sees
    Schema,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Resolves the database path from CLI args and config.
    pub fn resolve_db_path(&self, config: &Config) -> PathBuf {
        self.db.clone().unwrap_or_else(|| config.database.path.clone())
    }

    /// Resolves the LLM provider from CLI args and config.
    pub fn resolve_provider(&self, config: &Config) -> Result<LlmProvider> {
        let name = self.provider.as_deref().unwrap_or(&config.llm.provider);
        name.parse()
            .map_err(|e: String| WriterError::config(e))
    }

    /// Resolves the model override from CLI args and config.
    pub fn resolve_model(&self, config: &Config) -> Option<String> {
        self.model.clone().or_else(|| config.llm.model.clone())
    }

    /// Resolves the knowledge store path from CLI args and config.
    pub fn resolve_knowledge_path(&self, config: &Config) -> PathBuf {
        self.knowledge
            .clone()
            .unwrap_or_else(|| config.knowledge.resolved_path())
    }
}
