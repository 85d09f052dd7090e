//! Ollama LLM provider implementation.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ClientOptions;
use serde::{Deserialize, Serialize};
use visionrag_core::{AppError, AppResult};

/// Ollama generate request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama generate response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama LLM client.
pub struct OllamaClient {
    options: ClientOptions,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    pub fn new() -> Self {
        Self {
            options: ClientOptions::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a new Ollama client with a custom base URL and default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            options: ClientOptions {
                endpoint: base_url.into().trim_end_matches('/').to_string(),
                ..Default::default()
            },
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from explicit connection options.
    pub fn with_options(options: ClientOptions) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { options, client })
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.options.endpoint
    }

    fn service_name(&self, model: &str) -> String {
        format!("Ollama at {} (model '{}')", self.options.endpoint, model)
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            images: request.images.clone(),
            options,
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, request: &LlmRequest, response: OllamaResponse) -> AppResult<LlmResponse> {
        let content = response
            .response
            .ok_or_else(|| AppError::empty_response(self.service_name(&request.model), "response"))?;

        Ok(LlmResponse {
            content: content.trim().to_string(),
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        })
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, images = request.images.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama ({} prompt chars)", request.prompt.len());

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.options.endpoint);

        let response = self
            .client
            .post(&url)
            .timeout(self.options.completion_timeout)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                AppError::connectivity(
                    self.service_name(&request.model),
                    format!("{}. Ensure Ollama is running and the model is pulled", e),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::connectivity(
                self.service_name(&request.model),
                format!("API error ({}): {}", status, error_text),
            ));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        let converted = self.convert_response(request, ollama_response)?;
        tracing::debug!(
            "Received completion from Ollama ({} tokens)",
            converted.usage.completion_tokens
        );

        Ok(converted)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.options.endpoint);
        match self
            .client
            .get(&url)
            .timeout(self.options.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health probe failed: {}", e);
                false
            }
        }
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/api/tags", self.options.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(self.options.health_timeout)
            .send()
            .await
            .map_err(|e| AppError::connectivity(format!("Ollama at {}", self.options.endpoint), e.to_string()))?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visionrag_core::testing::{closed_port_url, serve_once};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");

        let request = LlmRequest::new("Hello", "llama3")
            .with_temperature(0.2)
            .with_max_tokens(100)
            .with_image("Zm9v");

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3");
        assert_eq!(ollama_req.prompt, "Hello");
        assert_eq!(ollama_req.images, vec!["Zm9v".to_string()]);
        assert!(!ollama_req.stream);
        assert_eq!(
            ollama_req.options,
            Some(OllamaOptions {
                temperature: Some(0.2),
                num_predict: Some(100)
            })
        );
    }

    #[tokio::test]
    async fn test_complete_trims_response() {
        let url = serve_once("200 OK", r#"{"model":"llama3","response":"  A red car.\n","eval_count":4}"#).await.url;
        let client = OllamaClient::with_base_url(url);

        let response = client.complete(&LlmRequest::new("q", "llama3")).await.unwrap();
        assert_eq!(response.content, "A red car.");
        assert_eq!(response.usage.completion_tokens, 4);
    }

    #[tokio::test]
    async fn test_complete_missing_response_field() {
        let url = serve_once("200 OK", r#"{"model":"llama3","done":true}"#).await.url;
        let client = OllamaClient::with_base_url(url);

        let err = client.complete(&LlmRequest::new("q", "llama3")).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse { ref field, .. } if field == "response"));
    }

    #[tokio::test]
    async fn test_complete_error_status_is_connectivity() {
        let url = serve_once("404 Not Found", r#"{"error":"model 'nope' not found"}"#).await.url;
        let client = OllamaClient::with_base_url(url);

        let err = client.complete(&LlmRequest::new("q", "nope")).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = OllamaClient::with_base_url(closed_port_url().await);

        let err = client.complete(&LlmRequest::new("q", "llama3")).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_and_models() {
        let url = serve_once("200 OK", r#"{"models":[{"name":"llava:latest"}]}"#).await.url;
        let client = OllamaClient::with_base_url(url.clone());
        assert!(client.health_check().await);

        let url = serve_once("200 OK", r#"{"models":[{"name":"llava:latest"},{"name":"nomic-embed-text:latest"}]}"#).await.url;
        let client = OllamaClient::with_base_url(url);
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llava:latest", "nomic-embed-text:latest"]);
    }
}
