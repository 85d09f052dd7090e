//! Video-side collaborators for VisionRAG.
//!
//! Everything that touches pixels or audio lives here: frame sampling,
//! captioning, visual embeddings, keyframe selection by clustering and
//! speech transcription. Each capability is a trait so the indexing and
//! query pipeline can run against deterministic stand-ins in tests.

pub mod caption;
pub mod cluster;
pub mod encoder;
pub mod ffmpeg;
pub mod frame;
pub mod keyframes;
pub mod storage;
pub mod timestamp;
pub mod transcribe;

pub use caption::{Captioner, LlmCaptioner};
pub use cluster::{Clustering, KMeans};
pub use encoder::{HistogramEncoder, VisionEncoder};
pub use ffmpeg::FfmpegFrameSource;
pub use frame::{sampling_interval, FrameSource, SampledFrame, VideoInfo};
pub use keyframes::KeyframeSelector;
pub use storage::{generate_video_id, save_frame_image, save_video};
pub use timestamp::format_timestamp;
pub use transcribe::{Transcriber, TranscriptSegment, WhisperTranscriber};
