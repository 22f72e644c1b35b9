//! Persisted per-document indexes.
//!
//! Each document is stored in its own directory:
//!
//! ```text
//! <save_path>/
//!   vector/store.db      SQLite vector store with embedded chunks
//!   summary/nodes.json   every chunk in order, for tree summarization
//! ```

mod synthesizer;

pub use synthesizer::{Synthesizer, EMPTY_RESPONSE};

use crate::error::{Result, SitewiseError};
use crate::vector_store::{Node, PageFilter, SearchResult, SqliteVectorStore, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const VECTOR_DIR: &str = "vector";
const VECTOR_FILE: &str = "store.db";
const SUMMARY_DIR: &str = "summary";
const SUMMARY_FILE: &str = "nodes.json";

/// Nearest-neighbour index over a document's embedded chunks.
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
}

impl VectorIndex {
    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Write a vector index under `save_path`, replacing any previous contents.
    #[instrument(skip(nodes), fields(count = nodes.len()))]
    pub async fn create(save_path: &Path, nodes: &[Node]) -> Result<Self> {
        let store = SqliteVectorStore::new(&vector_file(save_path))?;
        let removed = store.clear().await?;
        if removed > 0 {
            debug!("Replaced {} existing nodes", removed);
        }
        store.upsert_batch(nodes).await?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Open a previously persisted vector index.
    pub fn open(save_path: &Path) -> Result<Self> {
        let path = vector_file(save_path);
        if !path.is_file() {
            return Err(SitewiseError::IndexNotFound(path.display().to_string()));
        }
        let store = SqliteVectorStore::new(&path)?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Retrieve the `top_k` chunks most similar to the query that pass the filter.
    pub async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: &PageFilter,
    ) -> Result<Vec<SearchResult>> {
        self.store.search(query_embedding, top_k, filter).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.node_count().await
    }
}

/// Ordered list of every chunk of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryIndex {
    nodes: Vec<Node>,
}

impl SummaryIndex {
    /// Build an in-memory summary index. Embeddings are dropped.
    pub fn new(nodes: &[Node]) -> Self {
        let mut nodes: Vec<Node> = nodes
            .iter()
            .cloned()
            .map(|mut node| {
                node.embedding.clear();
                node
            })
            .collect();
        nodes.sort_by_key(|n| n.chunk_order);
        Self { nodes }
    }

    /// Write a summary index under `save_path`, replacing any previous contents.
    pub fn create(save_path: &Path, nodes: &[Node]) -> Result<Self> {
        let index = Self::new(nodes);
        let path = summary_file(save_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string(&index)?)?;
        Ok(index)
    }

    /// Open a previously persisted summary index.
    pub fn open(save_path: &Path) -> Result<Self> {
        let path = summary_file(save_path);
        if !path.is_file() {
            return Err(SitewiseError::IndexNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Persist both indexes for one document.
pub async fn persist_index_pair(
    save_path: &Path,
    nodes: &[Node],
) -> Result<(VectorIndex, SummaryIndex)> {
    let vector = VectorIndex::create(save_path, nodes).await?;
    let summary = SummaryIndex::create(save_path, nodes)?;
    info!("Persisted {} nodes to {}", nodes.len(), save_path.display());
    Ok((vector, summary))
}

/// Load both indexes for one document.
pub fn load_index_pair(save_path: &Path) -> Result<(VectorIndex, SummaryIndex)> {
    if !save_path.is_dir() {
        return Err(SitewiseError::IndexNotFound(save_path.display().to_string()));
    }
    let vector = VectorIndex::open(save_path)?;
    let summary = SummaryIndex::open(save_path)?;
    debug!("Loaded index pair from {}", save_path.display());
    Ok((vector, summary))
}

/// Document index directories inside a collection, sorted by path.
pub fn list_index_dirs(root_dir: &Path) -> Result<Vec<PathBuf>> {
    if !root_dir.is_dir() {
        return Err(SitewiseError::IndexNotFound(root_dir.display().to_string()));
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn vector_file(save_path: &Path) -> PathBuf {
    save_path.join(VECTOR_DIR).join(VECTOR_FILE)
}

fn summary_file(save_path: &Path) -> PathBuf {
    save_path.join(SUMMARY_DIR).join(SUMMARY_FILE)
}
