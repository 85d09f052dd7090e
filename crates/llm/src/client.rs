//! LLM client abstraction and request/response types.

use serde::{Deserialize, Serialize};
use visionrag_core::AppResult;

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "llama3:instruct", "llava")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Base64-encoded images for vision-language models
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            images: Vec::new(),
            system: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach a base64-encoded image.
    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.images.push(image_base64.into());
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text, trimmed
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for completion providers.
///
/// Calls are blocking from the caller's point of view (awaited one at a
/// time), bounded by the provider's fixed timeout, and never retried.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    ///
    /// Fails with `AppError::Connectivity` when the server cannot be reached
    /// and `AppError::EmptyResponse` when the reply has no generated text.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Lightweight reachability probe. Never fails; returns availability.
    async fn health_check(&self) -> bool;

    /// Names of the models installed on the server.
    async fn list_models(&self) -> AppResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("What is in this frame?", "llava")
            .with_image("aGVsbG8=")
            .with_temperature(0.1)
            .with_max_tokens(60);

        assert_eq!(request.images, vec!["aGVsbG8=".to_string()]);
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(60));
        assert!(request.system.is_none());
    }

    #[test]
    fn test_request_serialization_skips_empty_images() {
        let request = LlmRequest::new("hi", "llama3");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("images").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
