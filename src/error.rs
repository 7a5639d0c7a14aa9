//! Error types for querywright.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for querywright operations.
#[derive(Error, Debug)]
pub enum WriterError {
    /// Database connection errors (missing file, locked database, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown tables, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (backend unreachable, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, unknown provider, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Knowledge base errors (store unavailable, corrupt entries, etc.)
    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WriterError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a knowledge base error with the given message.
    pub fn knowledge(msg: impl Into<String>) -> Self {
        Self::Knowledge(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Knowledge(_) => "Knowledge Base Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using WriterError.
pub type Result<T> = std::result::Result<T, WriterError>;
