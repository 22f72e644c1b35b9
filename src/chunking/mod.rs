//! Text chunking for breaking document pages into searchable nodes.

mod sentence;

pub use sentence::SentenceSplitter;

use serde::{Deserialize, Serialize};

/// Characters per token used to turn token budgets into character budgets.
pub const CHARS_PER_TOKEN: usize = 4;

/// A chunk of text from one page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub text: String,
    /// File name of the source PDF.
    pub file_name: String,
    /// Page the chunk was taken from.
    pub page_label: String,
    /// Order of this chunk in the document.
    pub order: i32,
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Chunk size in characters.
    pub fn chunk_chars(&self) -> usize {
        (self.chunk_size * CHARS_PER_TOKEN).max(1)
    }

    /// Overlap in characters, never more than half a chunk.
    pub fn overlap_chars(&self) -> usize {
        (self.chunk_overlap * CHARS_PER_TOKEN).min(self.chunk_chars() / 2)
    }
}
