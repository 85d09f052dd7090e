//! Language model integration for VisionRAG.
//!
//! A provider-agnostic completion interface (`LlmClient`) with an Ollama
//! implementation. The same interface serves answer generation and, through
//! image attachments, frame captioning with vision-language models.
//!
//! # Example
//! ```no_run
//! use visionrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Describe the parking lot.", "llama3:instruct");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::{ClientOptions, ProviderType};
