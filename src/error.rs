//! Error types for Sitewise.

use thiserror::Error;

/// Library-level error type for Sitewise operations.
#[derive(Error, Debug)]
pub enum SitewiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Sitewise operations.
pub type Result<T> = std::result::Result<T, SitewiseError>;
