//! Vector store abstraction.
//!
//! One named collection holds the entries of every video; queries and
//! deletes are scoped by the `video_id` metadata field.

pub mod sqlite;

pub use sqlite::SqliteVectorStore;

use crate::types::{CollectionStats, IndexEntry, QueryResult};
use visionrag_core::{AppError, AppResult};

/// Distance function of a collection, fixed when the collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Euclidean distance, unbounded
    L2,
    /// `1 - cosine similarity`, in `[0, 2]`
    Cosine,
}

impl DistanceMetric {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(AppError::Config(format!(
                "Unknown distance metric: {}. Supported: l2, cosine",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
        }
    }

    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    /// Map a distance to a score in `(0, 1]`, decreasing in distance.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::L2 => 1.0 / (1.0 + distance.max(0.0)),
            DistanceMetric::Cosine => (1.0 - distance / 2.0).clamp(0.0, 1.0),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Persistent storage with filtered nearest-neighbour search.
pub trait VectorStore: Send + Sync {
    /// Insert entries, replacing any with the same id. An empty slice
    /// writes nothing and returns 0.
    fn upsert(&self, entries: &[IndexEntry]) -> AppResult<usize>;

    /// Up to `top_k` entries of `video_id`, nearest first.
    fn query(&self, query_vector: &[f32], top_k: usize, video_id: &str) -> AppResult<Vec<QueryResult>>;

    /// Delete every entry of `video_id`, returning how many were removed.
    fn delete_by_video(&self, video_id: &str) -> AppResult<usize>;

    fn stats(&self) -> AppResult<CollectionStats>;

    /// Number of entries stored for one video.
    fn count_for_video(&self, video_id: &str) -> AppResult<usize>;

    fn metric(&self) -> DistanceMetric;
}
