//! LLM provider selection and connection options.

use std::time::Duration;
use visionrag_core::config::OllamaConfig;

/// Connection options shared by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Base URL of the inference server
    pub endpoint: String,

    /// Upper bound for one completion call
    pub completion_timeout: Duration,

    /// Upper bound for the reachability probe
    pub health_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&OllamaConfig::default())
    }
}

impl From<&OllamaConfig> for ClientOptions {
    fn from(config: &OllamaConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            completion_timeout: Duration::from_secs(config.completion_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        }
    }
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
        }
    }
}
