//! Ollama embedding provider.
//!
//! `POST {endpoint}/api/embeddings` with `{model, prompt}` answers
//! `{embedding: [...]}`. One request per text; Ollama has no batch form.

use crate::embeddings::EmbeddingProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use visionrag_core::{AppError, AppResult};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Build a provider. Does not contact the server.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    fn service_name(&self) -> String {
        format!("Ollama embeddings at {} (model '{}')", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::connectivity(
                    self.service_name(),
                    format!("{}. Ensure Ollama is running and run: ollama pull {}", e, self.model),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::connectivity(
                self.service_name(),
                format!("API error ({}): {}", status, message),
            ));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Failed to parse Ollama embedding response: {}", e)))?;

        match body.embedding {
            Some(embedding) if !embedding.is_empty() => {
                debug!("Generated {} dimensional embedding", embedding.len());
                Ok(embedding)
            }
            _ => Err(AppError::empty_response(self.service_name(), "embedding")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visionrag_core::testing::{closed_port_url, serve_once};

    fn provider(url: &str) -> OllamaProvider {
        OllamaProvider::new(url, "nomic-embed-text", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let url = serve_once("200 OK", r#"{"embedding":[0.5,-0.25,1.0]}"#).await.url;
        let embedding = provider(&url).embed("a car enters").await.unwrap();
        assert_eq!(embedding, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_missing_embedding_is_empty_response() {
        let url = serve_once("200 OK", r#"{"model":"nomic-embed-text"}"#).await.url;
        let err = provider(&url).embed("a car enters").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse { ref field, .. } if field == "embedding"));
    }

    #[tokio::test]
    async fn test_empty_embedding_is_empty_response() {
        let url = serve_once("200 OK", r#"{"embedding":[]}"#).await.url;
        let err = provider(&url).embed("a car enters").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_error_status_names_model() {
        let url = serve_once("404 Not Found", r#"{"error":"model \"nomic-embed-text\" not found"}"#).await.url;
        let err = provider(&url).embed("x").await.unwrap_err();
        assert!(err.is_connectivity());
        let message = err.to_string();
        assert!(message.contains("nomic-embed-text"));
        assert!(message.contains("404"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connectivity() {
        let err = provider(&closed_port_url().await).embed("x").await.unwrap_err();
        assert!(err.is_connectivity());
    }
}
