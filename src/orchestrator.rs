//! Indexing pipeline for Sitewise.
//!
//! Coordinates the process from PDF files to persisted vector, summary and
//! tool-retrieval indexes.

use crate::agent::{return_tools_from_index_store, AgentContext, ToolRetriever};
use crate::chunking::{ChunkingConfig, SentenceSplitter};
use crate::config::Settings;
use crate::document::{document_name, list_pdfs, load_documents, DocumentPage};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::index::persist_index_pair;
use crate::vector_store::Node;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The indexing pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    splitter: SentenceSplitter,
}

impl Orchestrator {
    /// Create an orchestrator that embeds with the configured OpenAI model.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        Ok(Self::with_components(settings, embedder))
    }

    /// Create an orchestrator with a custom embedder.
    pub fn with_components(settings: Settings, embedder: Arc<dyn Embedder>) -> Self {
        let splitter = SentenceSplitter::new(ChunkingConfig {
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
        });

        Self {
            settings,
            embedder,
            splitter,
        }
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load, chunk and embed `files`, then persist one vector and one summary
    /// index under `save_path`. Any previous index there is replaced.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn build_vector_and_summary_index(
        &self,
        files: &[PathBuf],
        save_path: &Path,
    ) -> Result<IndexResult> {
        let pages = load_documents(files).await?;
        self.index_pages(&pages, save_path).await
    }

    /// Chunk, embed and persist already loaded pages.
    pub async fn index_pages(
        &self,
        pages: &[DocumentPage],
        save_path: &Path,
    ) -> Result<IndexResult> {
        let chunks = self.splitter.split(pages);
        info!("Split {} pages into {} chunks", pages.len(), chunks.len());

        if chunks.is_empty() {
            warn!("No text extracted for {}", save_path.display());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };

        let nodes: Vec<Node> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Node::new(
                    &document_name(Path::new(&chunk.file_name)),
                    &chunk.file_name,
                    &chunk.page_label,
                    chunk.text,
                    embedding,
                    chunk.order,
                )
            })
            .collect();

        persist_index_pair(save_path, &nodes).await?;

        Ok(IndexResult {
            save_path: save_path.to_path_buf(),
            pages: pages.len(),
            nodes: nodes.len(),
        })
    }

    /// Build one index per PDF in `root_dir`, saved to
    /// `root_save_dir/<document name>`.
    #[instrument(skip(self, progress))]
    pub async fn build_indexes_from_dir(
        &self,
        root_dir: &Path,
        root_save_dir: &Path,
        progress: &ProgressBar,
    ) -> Result<Vec<IndexResult>> {
        let pdfs = list_pdfs(root_dir)?;
        progress.set_length(pdfs.len() as u64);

        let mut results = Vec::with_capacity(pdfs.len());
        for pdf in pdfs {
            let name = document_name(&pdf);
            progress.set_message(name.clone());

            let save_path = root_save_dir.join(&name);
            let result = self
                .build_vector_and_summary_index(std::slice::from_ref(&pdf), &save_path)
                .await?;
            results.push(result);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(results)
    }

    /// Build one combined index over every PDF in `root_dir`.
    pub async fn build_combined_index(
        &self,
        root_dir: &Path,
        save_path: &Path,
    ) -> Result<IndexResult> {
        let pdfs = list_pdfs(root_dir)?;
        self.build_vector_and_summary_index(&pdfs, save_path).await
    }
}

/// Build the tools of the collection at `index_dir` and persist their
/// retrieval embeddings to `save_path`. Returns the number of tools.
#[instrument(skip(ctx))]
pub async fn build_tool_index(
    index_dir: &Path,
    save_path: &Path,
    ctx: &AgentContext,
) -> Result<usize> {
    let tools = return_tools_from_index_store(index_dir, ctx)?;
    let top_k = ctx.settings.agent.retriever_top_k;
    let retriever = ToolRetriever::from_tools(tools, ctx.embedder.clone(), top_k).await?;
    retriever.persist(save_path)?;
    Ok(retriever.tools().len())
}

/// Result of indexing one document (or a combined set of documents).
#[derive(Debug)]
pub struct IndexResult {
    /// Directory the index pair was written to.
    pub save_path: PathBuf,
    /// Number of pages loaded.
    pub pages: usize,
    /// Number of chunks indexed.
    pub nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TOOL_INDEX_FILE;
    use crate::config::Prompts;
    use crate::index::load_index_pair;
    use crate::testing::{KeywordEmbedder, ScriptedLlm};
    use crate::vector_store::PageFilter;

    const VOCABULARY: &[&str] = &["moose", "bat", "turbine"];

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Arc::new(KeywordEmbedder::new(VOCABULARY)),
        )
    }

    #[tokio::test]
    async fn test_index_pages_persists_pair() {
        let dir = tempfile::tempdir().unwrap();
        let save_path = dir.path().join("wind_farm_ea");
        let pages = vec![
            DocumentPage::new(
                "wind_farm_ea.pdf",
                "1",
                "Moose tracks were found. The wetland is small.",
            ),
            DocumentPage::new("wind_farm_ea.pdf", "2", "   "),
            DocumentPage::new("wind_farm_ea.pdf", "3", "Bat surveys used acoustic detectors."),
        ];

        let result = orchestrator().index_pages(&pages, &save_path).await.unwrap();
        assert_eq!(result.pages, 3);
        assert_eq!(result.nodes, 2);

        let (vector, summary) = load_index_pair(&save_path).unwrap();
        let hits = vector.query(&[0.0, 1.0, 0.0], 1, &PageFilter::all()).await.unwrap();
        assert_eq!(hits[0].node.page_label, "3");
        assert_eq!(hits[0].node.doc_name, "wind_farm_ea");
        assert_eq!(summary.nodes()[0].page_label, "1");
    }

    #[tokio::test]
    async fn test_build_indexes_from_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = orchestrator()
            .build_indexes_from_dir(&dir.path().join("absent"), dir.path(), &ProgressBar::hidden())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_indexes_from_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let results = orchestrator()
            .build_indexes_from_dir(dir.path(), &dir.path().join("out"), &ProgressBar::hidden())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_build_tool_index() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator();
        for doc in ["a_report", "b_report"] {
            let pages = vec![DocumentPage::new(&format!("{}.pdf", doc), "1", "Turbine layout.")];
            orchestrator.index_pages(&pages, &dir.path().join(doc)).await.unwrap();
        }

        let ctx = AgentContext {
            settings: Settings::default(),
            prompts: Prompts::default(),
            llm: Arc::new(ScriptedLlm::answering("ok")),
            embedder: orchestrator.embedder(),
        };

        let save_path = dir.path().join(TOOL_INDEX_FILE);
        let count = build_tool_index(dir.path(), &save_path, &ctx).await.unwrap();
        assert_eq!(count, 4);
        assert!(save_path.is_file());
    }
}
