//! Availability checks for the inference server and its models.

use crate::embeddings::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use visionrag_llm::{LlmClient, LlmRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCheck {
    pub server: bool,
    pub embedding_model: bool,
    pub llm_model: bool,
    /// Models the server reports as pulled
    #[serde(default)]
    pub installed: Vec<String>,
}

impl ModelCheck {
    pub fn ready(&self) -> bool {
        self.server && self.embedding_model && self.llm_model
    }

    /// Human-readable problems, empty when everything is available.
    pub fn issues(&self, embedding_model: &str, llm_model: &str) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.server {
            issues.push("Inference server is not running. Start Ollama and pull the models.".to_string());
            return issues;
        }
        if !self.embedding_model {
            issues.push(format!(
                "Embedding model '{}' not available. Run: ollama pull {}",
                embedding_model, embedding_model
            ));
        }
        if !self.llm_model {
            issues.push(format!(
                "LLM model '{}' not available. Run: ollama pull {}",
                llm_model, llm_model
            ));
        }
        issues
    }
}

/// Check the server, list its models, then try one embedding and one
/// short completion.
///
/// Model checks are skipped when the server is down.
pub async fn check_models(
    llm: &dyn LlmClient,
    embedder: &dyn EmbeddingProvider,
    llm_model: &str,
) -> ModelCheck {
    let server = llm.health_check().await;
    if !server {
        return ModelCheck::default();
    }

    let installed = match llm.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!("Could not list installed models: {}", e);
            Vec::new()
        }
    };

    let embedding_model = match embedder.embed("test").await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Embedding model check failed: {}", e);
            false
        }
    };

    let ping = LlmRequest::new("Reply with OK.", llm_model).with_max_tokens(4);
    let llm_model = match llm.complete(&ping).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("LLM model check failed: {}", e);
            false
        }
    };

    ModelCheck {
        server,
        embedding_model,
        llm_model,
        installed,
    }
}
