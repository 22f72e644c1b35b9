//! Configuration module for Sitewise.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, SynthesisPrompts};
pub use settings::{
    AgentSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, IndexSettings,
    PromptSettings, SearchSettings, ServerSettings, Settings, SourceFile,
};
