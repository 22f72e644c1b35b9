//! Retrieval over tools, so an agent only sees the tools relevant to a query.

use super::tools::Tool;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::cosine_similarity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// File name of the persisted tool index inside a collection directory.
pub const TOOL_INDEX_FILE: &str = "tools.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolEmbedding {
    name: String,
    text: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ToolIndexFile {
    tools: Vec<ToolEmbedding>,
}

/// Ranks tools by similarity between the query and `"name: description"`.
pub struct ToolRetriever {
    tools: Vec<Arc<dyn Tool>>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

fn tool_text(tool: &dyn Tool) -> String {
    format!("{}: {}", tool.name(), tool.metadata().description)
}

impl ToolRetriever {
    /// Embed every tool's name and description.
    #[instrument(skip_all, fields(tools = tools.len(), top_k = top_k))]
    pub async fn from_tools(
        tools: Vec<Arc<dyn Tool>>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = tools.iter().map(|t| tool_text(t.as_ref())).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).await?
        };

        Ok(Self {
            tools,
            embeddings,
            embedder,
            top_k,
        })
    }

    /// Reuse embeddings cached at `path`, embedding only new or changed tools.
    ///
    /// The cache is rewritten when anything had to be embedded.
    #[instrument(skip(tools, embedder), fields(tools = tools.len()))]
    pub async fn load_or_build(
        tools: Vec<Arc<dyn Tool>>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
        path: &Path,
    ) -> Result<Self> {
        let cached: HashMap<String, ToolEmbedding> = match read_index_file(path) {
            Ok(file) => file.tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
            Err(e) => {
                if path.exists() {
                    warn!("Ignoring unreadable tool index {}: {}", path.display(), e);
                }
                HashMap::new()
            }
        };

        let texts: Vec<String> = tools.iter().map(|t| tool_text(t.as_ref())).collect();
        let mut embeddings: Vec<Option<Vec<f32>>> = texts
            .iter()
            .zip(&tools)
            .map(|(text, tool)| {
                cached
                    .get(tool.name())
                    .filter(|entry| entry.text == *text)
                    .map(|entry| entry.embedding.clone())
            })
            .collect();

        let missing: Vec<usize> = (0..tools.len()).filter(|&i| embeddings[i].is_none()).collect();
        debug!(
            "{} cached tool embeddings, {} to embed",
            tools.len() - missing.len(),
            missing.len()
        );

        if !missing.is_empty() {
            let missing_texts: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = embedder.embed_batch(&missing_texts).await?;
            for (i, embedding) in missing.iter().zip(fresh) {
                embeddings[*i] = Some(embedding);
            }
        }

        let retriever = Self {
            tools,
            embeddings: embeddings.into_iter().map(Option::unwrap_or_default).collect(),
            embedder,
            top_k,
        };

        if !missing.is_empty() {
            retriever.persist(path)?;
        }
        Ok(retriever)
    }

    /// Write the tool embeddings to `path` as JSON.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = ToolIndexFile {
            tools: self
                .tools
                .iter()
                .zip(&self.embeddings)
                .map(|(tool, embedding)| ToolEmbedding {
                    name: tool.name().to_string(),
                    text: tool_text(tool.as_ref()),
                    embedding: embedding.clone(),
                })
                .collect(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&file)?)?;
        info!("Persisted {} tool embeddings to {}", file.tools.len(), path.display());
        Ok(())
    }

    /// The `top_k` tools most similar to the query.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Arc<dyn Tool>>> {
        if self.tools.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(&query_embedding, e)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let selected: Vec<Arc<dyn Tool>> = scored
            .into_iter()
            .take(self.top_k)
            .map(|(i, _)| self.tools[i].clone())
            .collect();

        debug!(
            "Retrieved tools: {}",
            selected.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(selected)
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

fn read_index_file(path: &Path) -> Result<ToolIndexFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{KeywordEmbedder, StaticTool};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VOCABULARY: &[&str] = &["moose", "bat", "turbine", "wetland", "noise"];

    /// Counts how many texts were embedded.
    struct CountingEmbedder {
        inner: KeywordEmbedder,
        embedded: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    fn tools() -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(StaticTool::new("vector_tool_moose", "Moose and wetland surveys", "m")),
            Arc::new(StaticTool::new("vector_tool_bats", "Bat acoustic monitoring", "b")),
            Arc::new(StaticTool::new("vector_tool_noise", "Turbine noise modelling", "n")),
        ]
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
        let retriever = ToolRetriever::from_tools(tools(), embedder, 2).await.unwrap();

        let selected = retriever.retrieve("How loud is the turbine noise?").await.unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name(), "vector_tool_noise");
    }

    #[tokio::test]
    async fn test_retrieve_from_empty_tool_set() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
        let retriever = ToolRetriever::from_tools(Vec::new(), embedder, 3).await.unwrap();
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_or_build_reuses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOOL_INDEX_FILE);

        let embedder = Arc::new(CountingEmbedder {
            inner: KeywordEmbedder::new(VOCABULARY),
            embedded: AtomicUsize::new(0),
        });

        ToolRetriever::load_or_build(tools(), embedder.clone(), 3, &path).await.unwrap();
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);
        assert!(path.is_file());

        let mut extended = tools();
        extended.push(Arc::new(StaticTool::new(
            "summary_tool_moose",
            "Summaries of moose reports",
            "s",
        )));
        let retriever = ToolRetriever::load_or_build(extended, embedder.clone(), 3, &path)
            .await
            .unwrap();

        // Only the new tool is embedded
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 4);
        assert_eq!(retriever.tools().len(), 4);

        let selected = retriever.retrieve("bat activity").await.unwrap();
        assert_eq!(selected[0].name(), "vector_tool_bats");
    }
}
