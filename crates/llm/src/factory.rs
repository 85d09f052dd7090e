//! LLM provider factory.
//!
//! Resolves a provider name into a shared client handle. Clients are built
//! once per process and passed around as `Arc<dyn LlmClient>`.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::{ClientOptions, ProviderType};
use std::sync::Arc;
use visionrag_core::{AppError, AppResult};

/// Create an LLM client for the named provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_client(provider: &str, options: &ClientOptions) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let client = OllamaClient::with_options(options.clone())?;
            Ok(Arc::new(client))
        }
        None => Err(AppError::Config(format!(
            "Unknown LLM provider: {}. Supported: ollama",
            provider
        ))),
    }
}
