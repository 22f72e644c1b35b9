//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, SitewiseError};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per embedding request.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Inputs are cut to this many characters, well below the 8191 token limit.
const MAX_INPUT_CHARS: usize = 24_000;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder for the configured model.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Self::with_config(&settings.model, settings.dimensions as usize)
    }

    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set how many texts are sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Prepare extracted PDF text for the embeddings endpoint.
///
/// The API rejects empty strings, and layout newlines only add noise.
fn prepare_input(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut flat = match flat.char_indices().nth(MAX_INPUT_CHARS) {
        Some((idx, _)) => flat[..idx].to_string(),
        None => flat,
    };
    if flat.is_empty() {
        flat.push(' ');
    }
    flat
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SitewiseError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!("Embedding batch {} ({} texts)", batch_no + 1, batch.len());
            let input: Vec<String> = batch.iter().map(|t| prepare_input(t)).collect();

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(input))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| SitewiseError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| SitewiseError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut data = response.data;
            data.sort_by_key(|e| e.index);
            all_embeddings.extend(data.into_iter().map(|e| e.embedding));
        }

        if all_embeddings.len() != texts.len() {
            return Err(SitewiseError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                all_embeddings.len()
            )));
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
