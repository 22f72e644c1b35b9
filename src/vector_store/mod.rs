//! Vector store abstraction for Sitewise.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk of a document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID.
    pub id: Uuid,
    /// Name of the document this node belongs to.
    pub doc_name: String,
    /// File name of the source PDF.
    pub file_name: String,
    /// Page the text was taken from.
    pub page_label: String,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector. Empty for nodes that only feed summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Order of this chunk in the document.
    pub chunk_order: i32,
    /// When this node was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node.
    pub fn new(
        doc_name: &str,
        file_name: &str,
        page_label: &str,
        content: String,
        embedding: Vec<f32>,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc_name: doc_name.to_string(),
            file_name: file_name.to_string(),
            page_label: page_label.to_string(),
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }

    /// Citation label, e.g. "wind_farm_ea.pdf p. 12".
    pub fn citation(&self) -> String {
        format!("{} p. {}", self.file_name, self.page_label)
    }
}

/// Restricts a search to a set of pages.
///
/// Pages are combined with OR; an empty filter matches every node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFilter {
    pages: Vec<String>,
}

impl PageFilter {
    /// A filter that matches every node.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter matching any of the given page labels.
    pub fn pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_labels(&self) -> &[String] {
        &self.pages
    }

    /// Check whether a node passes the filter.
    pub fn matches(&self, node: &Node) -> bool {
        self.pages.is_empty() || self.pages.iter().any(|p| *p == node.page_label)
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched node.
    pub node: Node,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk upsert nodes.
    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize>;

    /// Search for the nodes most similar to the query that pass the filter.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &PageFilter,
    ) -> Result<Vec<SearchResult>>;

    /// All nodes, in chunk order.
    async fn nodes(&self) -> Result<Vec<Node>>;

    /// Get total node count.
    async fn node_count(&self) -> Result<usize>;

    /// Remove every node.
    async fn clear(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, filter, sort and truncate candidate nodes.
pub(crate) fn rank_nodes<I>(
    nodes: I,
    query_embedding: &[f32],
    limit: usize,
    filter: &PageFilter,
) -> Vec<SearchResult>
where
    I: IntoIterator<Item = Node>,
{
    let mut results: Vec<SearchResult> = nodes
        .into_iter()
        .filter(|node| filter.matches(node))
        .map(|node| {
            let score = cosine_similarity(query_embedding, &node.embedding);
            SearchResult { node, score }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(page: &str, embedding: Vec<f32>) -> Node {
        Node::new("ea", "ea.pdf", page, format!("page {}", page), embedding, 0)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_page_filter_is_or_over_labels() {
        let filter = PageFilter::pages(["3", "7"]);
        assert!(filter.matches(&node("3", vec![])));
        assert!(filter.matches(&node("7", vec![])));
        assert!(!filter.matches(&node("4", vec![])));

        assert!(PageFilter::all().matches(&node("4", vec![])));
    }

    #[test]
    fn test_rank_nodes_filters_before_truncating() {
        let nodes = vec![
            node("1", vec![1.0, 0.0]),
            node("2", vec![0.9, 0.1]),
            node("3", vec![0.0, 1.0]),
        ];

        let results = rank_nodes(nodes.clone(), &[1.0, 0.0], 2, &PageFilter::all());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].node.page_label, "1");
        assert_eq!(results[1].node.page_label, "2");

        let results = rank_nodes(nodes, &[1.0, 0.0], 2, &PageFilter::pages(["3"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.page_label, "3");
    }

    #[test]
    fn test_node_citation() {
        assert_eq!(node("12", vec![]).citation(), "ea.pdf p. 12");
    }
}
