//! Retrieval and indexing for VisionRAG.
//!
//! Frame captions and speech segments are embedded, stored in a SQLite
//! vector store and retrieved per video to ground answers from a language
//! model.
//!
//! # Example
//! ```no_run
//! use visionrag_core::AppConfig;
//! use visionrag_index::{answer, Services};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let services = Services::from_config(&config)?;
//! let result = answer(
//!     services.embedder.as_ref(),
//!     services.store.as_ref(),
//!     services.llm.as_ref(),
//!     &services.answer_model,
//!     "3f2a9c01b7de",
//!     "When does the delivery van arrive?",
//!     config.clamp_top_k(10),
//! )
//! .await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod embeddings;
pub mod health;
pub mod indexing;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use catalog::VideoCatalog;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use health::{check_models, ModelCheck};
pub use indexing::{document_text, index_video};
pub use pipeline::{delete_video, process_video, ProcessOptions, ProcessReport, SamplingMode, Services};
pub use progress::{ProgressEvent, ProgressReporter};
pub use query::{answer, Answer, AnswerModel};
pub use store::{DistanceMetric, SqliteVectorStore, VectorStore};
pub use types::{CollectionStats, FrameKind, FrameRecord, IndexEntry, QueryResult, VideoRecord};
