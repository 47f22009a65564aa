//! OpenAI embeddings implementation.

use super::BatchEmbedding;
use crate::error::{Result, VidsageError};
use crate::openai::{block_on, create_client_with_timeout, runtime_handle};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, instrument};

/// OpenAI limits the number of inputs per embedding request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
///
/// Exposes only a batch entry point: OpenAI embeds queries and documents
/// with the same model.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    runtime: Handle,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            runtime: runtime_handle()?,
            model: model.to_string(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| VidsageError::Backend(format!("Failed to build embedding request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| VidsageError::Backend(format!("Embedding API error: {}", e)))?;

            // Sort by index to ensure correct order
            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        Ok(all_embeddings)
    }
}

impl BatchEmbedding for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());
        let embeddings = block_on(&self.runtime, self.embed_all(texts))?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
