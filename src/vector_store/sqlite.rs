//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust. Page filters are
//! applied in SQL before scoring.

use super::{rank_nodes, Node, PageFilter, SearchResult, VectorStore};
use crate::error::{Result, SitewiseError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id TEXT PRIMARY KEY,
        doc_name TEXT NOT NULL,
        file_name TEXT NOT NULL,
        page_label TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_nodes_page_label ON nodes(page_label);
"#;

const SELECT_NODES: &str = r#"
    SELECT id, doc_name, file_name, page_label, content, embedding, chunk_order, indexed_at
    FROM nodes
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SitewiseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at_str: String = row.get(7)?;

        Ok(Node {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            doc_name: row.get(1)?,
            file_name: row.get(2)?,
            page_label: row.get(3)?,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            chunk_order: row.get(6)?,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, nodes), fields(count = nodes.len()))]
    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for node in nodes {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO nodes
                (id, doc_name, file_name, page_label, content, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    node.id.to_string(),
                    node.doc_name,
                    node.file_name,
                    node.page_label,
                    node.content,
                    Self::embedding_to_bytes(&node.embedding),
                    node.chunk_order,
                    node.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} nodes", nodes.len());
        Ok(nodes.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &PageFilter,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let sql = if filter.is_empty() {
            SELECT_NODES.to_string()
        } else {
            let placeholders = vec!["?"; filter.page_labels().len()].join(", ");
            format!("{} WHERE page_label IN ({})", SELECT_NODES, placeholders)
        };

        let mut stmt = conn.prepare(&sql)?;
        let nodes = stmt
            .query_map(params_from_iter(filter.page_labels()), Self::row_to_node)?
            .filter_map(|n| n.ok());

        let results = rank_nodes(nodes, query_embedding, limit, filter);

        debug!("Found {} matching nodes", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn nodes(&self) -> Result<Vec<Node>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY chunk_order", SELECT_NODES))?;
        let nodes: Vec<Node> = stmt
            .query_map([], Self::row_to_node)?
            .filter_map(|n| n.ok())
            .collect();
        Ok(nodes)
    }

    async fn node_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM nodes", [])?;
        info!("Deleted {} nodes", deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(page: &str, order: i32, embedding: Vec<f32>) -> Node {
        Node::new("ea", "ea.pdf", page, format!("text of page {}", page), embedding, order)
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert_batch(&[
                node("2", 1, vec![0.0, 1.0, 0.0]),
                node("1", 0, vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.node_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, &PageFilter::all()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].node.page_label, "1");
        assert_eq!(results[0].node.embedding, vec![1.0, 0.0, 0.0]);

        let ordered = store.nodes().await.unwrap();
        assert_eq!(ordered[0].chunk_order, 0);
        assert_eq!(ordered[1].chunk_order, 1);

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.node_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_with_page_filter() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert_batch(&[
                node("1", 0, vec![1.0, 0.0]),
                node("5", 1, vec![0.5, 0.5]),
                node("9", 2, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let filter = PageFilter::pages(["5", "9"]);
        let results = store.search(&[1.0, 0.0], 10, &filter).await.unwrap();
        let pages: Vec<&str> = results.iter().map(|r| r.node.page_label.as_str()).collect();
        assert_eq!(pages, vec!["5", "9"]);
    }

    #[tokio::test]
    async fn test_store_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector").join("store.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store.upsert_batch(&[node("1", 0, vec![1.0])]).await.unwrap();
        }

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.node_count().await.unwrap(), 1);
    }
}
