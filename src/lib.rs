//! Sitewise - question answering over environmental and planning reports
//!
//! Turns a folder of PDF reports into per-document vector and summary
//! indexes, exposes each report to an LLM agent as a pair of tools, and
//! answers questions through a routing agent from the CLI or over HTTP.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `document` - PDF loading, one record per page
//! - `chunking` - Sentence-aware text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Node storage and similarity search
//! - `index` - Persisted vector and summary indexes, response synthesis
//! - `llm` - Chat completion with function calling
//! - `agent` - Document tools, tool retrieval and agents
//! - `orchestrator` - Index building pipeline
//! - `server` - HTTP and WebSocket API
//!
//! # Example
//!
//! ```rust,no_run
//! use sitewise::agent::{build_agents, AgentContext};
//! use sitewise::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AgentContext::from_settings(Settings::load()?)?;
//!     let agents = build_agents(&ctx).await?;
//!
//!     let response = agents.router.query("Where is the wind farm located?").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod server;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SitewiseError};
