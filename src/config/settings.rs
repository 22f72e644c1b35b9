//! Configuration settings for Sitewise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub index: IndexSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sitewise".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Text splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in tokens (estimated at four characters per token).
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

/// Locations of the persisted document indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Root directory holding one subdirectory per collection.
    pub root_dir: String,
    /// Collection of environmental assessment reports.
    pub enviro_collection: String,
    /// Collection of planning application documents, one index per file.
    pub planning_collection: String,
    /// Single combined index over all planning documents.
    pub planning_global_collection: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            root_dir: "~/.sitewise/indexes".to_string(),
            enviro_collection: "enviro_ns".to_string(),
            planning_collection: "planning_app".to_string(),
            planning_global_collection: "planning_app_global".to_string(),
        }
    }
}

/// Agent and query engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// LLM model used by agents and response synthesis.
    pub model: String,
    /// Sampling temperature of the LLM.
    pub temperature: f32,
    /// Number of tools retrieved per query by document agents.
    pub retriever_top_k: usize,
    /// Number of chunks retrieved by a vector query.
    pub similarity_top_k: usize,
    /// Maximum LLM round trips per agent query.
    pub max_iterations: usize,
    /// Maximum concurrent summarization calls.
    pub summary_max_concurrent: usize,
    /// Maximum characters of context packed into one summarization call.
    pub summary_context_chars: usize,
    /// Log every tool call and result at info level.
    pub verbose: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            retriever_top_k: 3,
            similarity_top_k: 2,
            max_iterations: 10,
            summary_max_concurrent: 4,
            summary_context_chars: 12_000,
            verbose: true,
        }
    }
}

/// Internet search (Perplexica) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Offer the search tool to the routing agent.
    pub enabled: bool,
    /// Perplexica search API endpoint.
    pub endpoint: String,
    pub chat_provider: String,
    pub chat_model: String,
    pub embedding_provider: String,
    pub embedding_model: String,
    /// Perplexica optimization mode (speed, balanced, quality).
    pub optimization_mode: String,
    /// Perplexica focus mode (webSearch, academicSearch, ...).
    pub focus_mode: String,
    /// Seconds to wait for a search answer.
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:3001/api/search".to_string(),
            chat_provider: "openai".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            optimization_mode: "speed".to_string(),
            focus_mode: "webSearch".to_string(),
            timeout_secs: 60,
        }
    }
}

/// A downloadable source file advertised with every answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Display name.
    pub name: String,
    /// File name under the download directory.
    pub link: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served by `/download/{filename}`.
    pub download_dir: String,
    /// Source files returned with every answer. Empty means "list download_dir".
    pub sources: Vec<SourceFile>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            download_dir: "~/.sitewise/files".to_string(),
            sources: Vec::new(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SitewiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitewise")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded index root directory.
    pub fn index_root(&self) -> PathBuf {
        Self::expand_path(&self.index.root_dir)
    }

    /// Directory of a named index collection.
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.index_root().join(collection)
    }

    /// Get the expanded download directory.
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_path(&self.server.download_dir)
    }
}
