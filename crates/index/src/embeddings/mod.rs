//! Text embedding providers.
//!
//! Turns documents and questions into vectors for the store. Providers are
//! built once and shared as `Arc<dyn EmbeddingProvider>`.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OllamaProvider};
