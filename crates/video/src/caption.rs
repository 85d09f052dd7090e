//! Frame captioning.

use base64::Engine;
use std::sync::Arc;
use visionrag_core::{AppError, AppResult};
use visionrag_llm::{LlmClient, LlmRequest};

const CAPTION_PROMPT: &str = "Describe this surveillance camera frame in one short sentence. \
Mention people, vehicles, objects and what they are doing. Do not speculate.";

/// Turns one encoded frame into a short natural-language description.
#[async_trait::async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> AppResult<String>;
}

/// Captioner that asks a vision-capable model through an [`LlmClient`].
pub struct LlmCaptioner {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
}

impl LlmCaptioner {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 60,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, image: &[u8]) -> LlmRequest {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        LlmRequest::new(CAPTION_PROMPT, &self.model)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_image(encoded)
    }
}

#[async_trait::async_trait]
impl Captioner for LlmCaptioner {
    async fn caption(&self, image: &[u8]) -> AppResult<String> {
        let response = self.client.complete(&self.build_request(image)).await?;
        let caption = response.content.lines().next().unwrap_or("").trim().to_string();
        if caption.is_empty() {
            return Err(AppError::empty_response(
                format!("{} caption model '{}'", self.client.provider_name(), self.model),
                "response",
            ));
        }
        Ok(caption)
    }
}
