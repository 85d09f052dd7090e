//! Embedding provider trait and factory.

use super::providers::{MockProvider, OllamaProvider};
use std::sync::Arc;
use std::time::Duration;
use visionrag_core::{AppConfig, AppError, AppResult};

/// Maps text to a fixed-length vector.
///
/// Implementations never retry. A response without an embedding is an
/// `AppError::EmptyResponse`, never an empty vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Generate the embedding for one text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Embed several texts in order, stopping at the first failure.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Create the embedding provider named in the configuration.
pub fn create_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "ollama" => {
            let provider = OllamaProvider::new(
                &config.ollama.endpoint,
                &config.ollama.embedding_model,
                Duration::from_secs(config.ollama.embedding_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }

        "mock" => Ok(Arc::new(MockProvider::new(384))),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, mock",
            other
        ))),
    }
}
