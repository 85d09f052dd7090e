//! Error types for VisionRAG.
//!
//! One enum covers every failure category in the pipeline: configuration,
//! I/O, external service connectivity, malformed service responses, video
//! decoding, vector storage and partially completed indexing runs.

use thiserror::Error;

/// Unified error type for VisionRAG.
///
/// All fallible functions return `Result<T, AppError>`. Errors are never
/// retried internally; they carry enough context (service, model, path) for
/// the presentation layer to show a useful message.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An inference service is unreachable, timed out or answered with an
    /// error status.
    #[error("Cannot reach {service}: {message}")]
    Connectivity { service: String, message: String },

    /// A service answered but the payload lacked a required field.
    #[error("{service} returned no '{field}' in its response")]
    EmptyResponse { service: String, field: String },

    /// The source video could not be opened, probed or decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Vector store and catalog errors
    #[error("Store error: {0}")]
    Store(String),

    /// Indexing failed after some entries were already written.
    ///
    /// Entries written before the failure remain in the store.
    #[error("Indexing stopped after {indexed} entries: {source}")]
    PartialIndex {
        indexed: usize,
        #[source]
        source: Box<AppError>,
    },

    /// Language model errors that are not connectivity related
    #[error("LLM error: {0}")]
    Llm(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a connectivity error for a named service.
    pub fn connectivity(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Connectivity {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build an empty-response error for a named service and missing field.
    pub fn empty_response(service: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::EmptyResponse {
            service: service.into(),
            field: field.into(),
        }
    }

    /// Whether this error (or the error that interrupted indexing) is a
    /// connectivity failure.
    pub fn is_connectivity(&self) -> bool {
        match self {
            AppError::Connectivity { .. } => true,
            AppError::PartialIndex { source, .. } => source.is_connectivity(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_message_names_service() {
        let err = AppError::connectivity("ollama embeddings (nomic-embed-text)", "timed out");
        assert_eq!(
            err.to_string(),
            "Cannot reach ollama embeddings (nomic-embed-text): timed out"
        );
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_partial_index_wraps_source() {
        let err = AppError::PartialIndex {
            indexed: 4,
            source: Box::new(AppError::connectivity("ollama", "refused")),
        };
        assert!(err.to_string().contains("after 4 entries"));
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_empty_response_message() {
        let err = AppError::empty_response("ollama embeddings", "embedding");
        assert!(err.to_string().contains("'embedding'"));
        assert!(!err.is_connectivity());
    }
}
