//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank_nodes, Node, PageFilter, SearchResult, VectorStore};
use crate::error::{Result, SitewiseError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    nodes: RwLock<HashMap<String, Node>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> SitewiseError {
        SitewiseError::VectorStore(format!("Failed to acquire lock: {}", e))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize> {
        let mut store = self.nodes.write().map_err(Self::lock_error)?;
        for node in nodes {
            store.insert(node.id.to_string(), node.clone());
        }
        Ok(nodes.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &PageFilter,
    ) -> Result<Vec<SearchResult>> {
        let nodes = self.nodes.read().map_err(Self::lock_error)?;
        Ok(rank_nodes(nodes.values().cloned(), query_embedding, limit, filter))
    }

    async fn nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.nodes.read().map_err(Self::lock_error)?;
        let mut result: Vec<Node> = nodes.values().cloned().collect();
        result.sort_by_key(|n| n.chunk_order);
        Ok(result)
    }

    async fn node_count(&self) -> Result<usize> {
        let nodes = self.nodes.read().map_err(Self::lock_error)?;
        Ok(nodes.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut nodes = self.nodes.write().map_err(Self::lock_error)?;
        let count = nodes.len();
        nodes.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let first = Node::new(
            "ea",
            "ea.pdf",
            "1",
            "Hello world".to_string(),
            vec![1.0, 0.0, 0.0],
            0,
        );
        let second = Node::new(
            "ea",
            "ea.pdf",
            "2",
            "Goodbye world".to_string(),
            vec![0.0, 1.0, 0.0],
            1,
        );

        store.upsert_batch(&[second, first]).await.unwrap();
        assert_eq!(store.node_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, &PageFilter::all()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let ordered = store.nodes().await.unwrap();
        assert_eq!(ordered[0].content, "Hello world");

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.node_count().await.unwrap(), 0);
    }
}
