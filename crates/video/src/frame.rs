//! Sampled frames and the frame source abstraction.

use serde::{Deserialize, Serialize};
use std::path::Path;
use visionrag_core::AppResult;

/// A frame taken from the source video at a sampling step.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    /// Position of this frame within the sampling pass (0, 1, 2, ...)
    pub index: usize,

    /// Frame number in the decoded video stream
    pub frame_number: u64,

    /// Presentation time of the frame
    pub timestamp_seconds: f64,

    /// Encoded image (JPEG from ffmpeg, any format `image` can decode)
    pub image: Vec<u8>,
}

/// Basic properties of a video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub fps: f64,
    pub frame_count: u64,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Source of decoded frames.
///
/// Implementations fail with `AppError::Decode` when the video cannot be
/// opened. A readable video with no decodable frames yields an empty list.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Probe basic stream properties.
    async fn probe(&self, video: &Path) -> AppResult<VideoInfo>;

    /// Sample frames at roughly `target_fps` frames per second.
    async fn sample(&self, video: &Path, target_fps: f64) -> AppResult<Vec<SampledFrame>>;
}

/// Number of decoded frames between two samples.
///
/// A 30 fps video sampled at 1 fps keeps every 30th frame. Never below 1.
pub fn sampling_interval(video_fps: f64, target_fps: f64) -> u64 {
    if !(video_fps > 0.0) || !(target_fps > 0.0) || target_fps >= video_fps {
        return 1;
    }
    ((video_fps / target_fps).floor() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_interval() {
        assert_eq!(sampling_interval(30.0, 1.0), 30);
        assert_eq!(sampling_interval(29.97, 1.0), 29);
        assert_eq!(sampling_interval(25.0, 0.2), 125);
        assert_eq!(sampling_interval(25.0, 5.0), 5);
        // Asking for more than the native rate keeps every frame
        assert_eq!(sampling_interval(10.0, 15.0), 1);
        assert_eq!(sampling_interval(0.0, 1.0), 1);
        assert_eq!(sampling_interval(30.0, 0.0), 1);
    }
}
