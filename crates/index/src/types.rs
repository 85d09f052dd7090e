//! Index type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use visionrag_video::format_timestamp;

/// Frame index used by audio records, which have no frame.
pub const AUDIO_FRAME_INDEX: i64 = -1;

/// Prefix marking captions that came from speech rather than pixels.
pub const AUDIO_CAPTION_PREFIX: &str = "[AUDIO TRANSCRIPT] ";

/// Origin of a [`FrameRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Visual,
    Audio,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Visual => "visual",
            FrameKind::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "visual" => Some(FrameKind::Visual),
            "audio" => Some(FrameKind::Audio),
            _ => None,
        }
    }
}

/// A captioned moment of a video, ready to be indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: i64,
    pub timestamp_seconds: f64,
    pub timestamp_str: String,
    pub caption: String,
    #[serde(rename = "type")]
    pub kind: FrameKind,
}

impl FrameRecord {
    pub fn visual(frame_index: usize, timestamp_seconds: f64, caption: impl Into<String>) -> Self {
        Self {
            frame_index: frame_index as i64,
            timestamp_seconds,
            timestamp_str: format_timestamp(timestamp_seconds),
            caption: caption.into(),
            kind: FrameKind::Visual,
        }
    }

    /// Record for a transcribed speech segment starting at `start`.
    pub fn audio(start: f64, text: &str) -> Self {
        Self {
            frame_index: AUDIO_FRAME_INDEX,
            timestamp_seconds: start,
            timestamp_str: format_timestamp(start),
            caption: format!("{}{}", AUDIO_CAPTION_PREFIX, text.trim()),
            kind: FrameKind::Audio,
        }
    }
}

/// Metadata stored next to every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub video_id: String,
    pub frame_index: i64,
    pub timestamp_seconds: f64,
    pub timestamp_str: String,
    pub caption: String,
    pub kind: FrameKind,
}

/// One row of the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// A retrieved entry with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub caption: String,
    pub timestamp_str: String,
    pub timestamp_seconds: f64,
    pub frame_index: i64,
    pub kind: FrameKind,
    pub distance: f32,
    /// Derived from `distance` by the store's metric; higher is closer
    pub similarity_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_entries: usize,
    pub collection_name: String,
    pub metric: String,
    pub dimension: Option<usize>,
}

/// Catalog row for a processed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub original_name: String,
    pub stored_path: PathBuf,
    pub duration: f64,
    pub fps: f64,
    pub frames: usize,
    pub indexed: usize,
    pub created_at: DateTime<Utc>,
}
