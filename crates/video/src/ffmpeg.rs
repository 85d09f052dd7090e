//! Frame sampling and audio extraction through the ffmpeg command line tools.
//!
//! `ffprobe` supplies stream metadata and `ffmpeg` writes sampled frames as
//! JPEG files into a scratch directory that is removed afterwards.

use crate::frame::{sampling_interval, FrameSource, SampledFrame, VideoInfo};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use visionrag_core::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    nb_frames: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Frame source backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegFrameSource {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    /// Use explicit binary locations.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run_probe(&self, video: &Path, select: &str) -> AppResult<ProbeOutput> {
        if !video.is_file() {
            return Err(AppError::Decode(format!(
                "Video file not found: {}",
                video.display()
            )));
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", select])
            .args(["-show_entries", "stream=codec_type,avg_frame_rate,r_frame_rate,nb_frames,width,height,duration"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "json"])
            .arg(video)
            .output()
            .await
            .map_err(|e| AppError::Decode(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(AppError::Decode(format!(
                "Cannot open video {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Whether the file carries at least one audio stream.
    pub async fn has_audio(&self, video: &Path) -> AppResult<bool> {
        let probe = self.run_probe(video, "a").await?;
        Ok(probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref().unwrap_or("audio") == "audio"))
    }

    /// Extract the audio track as 16 kHz mono PCM wav.
    pub async fn extract_audio(&self, video: &Path, output: &Path) -> AppResult<()> {
        let result = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-y", "-i"])
            .arg(video)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(output)
            .output()
            .await
            .map_err(|e| AppError::Decode(format!("Failed to run ffmpeg: {}", e)))?;

        if !result.status.success() {
            return Err(AppError::Decode(format!(
                "Audio extraction failed for {}: {}",
                video.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an ffprobe rational such as `30000/1001` or `25`.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_probe(probe: &ProbeOutput) -> AppResult<VideoInfo> {
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| AppError::Decode("No video stream found".to_string()))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| AppError::Decode("Video stream reports no frame rate".to_string()))?;

    let duration = stream
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or_else(|| (duration * fps).round() as u64);

    Ok(VideoInfo {
        fps,
        frame_count,
        duration,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    })
}

#[async_trait::async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn probe(&self, video: &Path) -> AppResult<VideoInfo> {
        let probe = self.run_probe(video, "v:0").await?;
        parse_probe(&probe)
    }

    #[tracing::instrument(skip(self), fields(video = %video.display()))]
    async fn sample(&self, video: &Path, target_fps: f64) -> AppResult<Vec<SampledFrame>> {
        let info = self.probe(video).await?;
        let interval = sampling_interval(info.fps, target_fps);
        tracing::debug!(
            "Sampling every {} frame(s) of {:.2} fps video",
            interval,
            info.fps
        );

        let scratch = tempfile::tempdir()?;
        let pattern = scratch.path().join("frame_%06d.jpg");
        let filter = format!("select=not(mod(n\\,{}))", interval);

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(video)
            .args(["-vf", &filter, "-vsync", "vfr", "-q:v", "2"])
            .arg(&pattern)
            .output()
            .await
            .map_err(|e| AppError::Decode(format!("Failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(AppError::Decode(format!(
                "Frame extraction failed for {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jpg"))
            .collect();
        files.sort();

        let mut frames = Vec::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            let frame_number = index as u64 * interval;
            frames.push(SampledFrame {
                index,
                frame_number,
                timestamp_seconds: frame_number as f64 / info.fps,
                image: tokio::fs::read(path).await?,
            });
        }

        tracing::info!("Sampled {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("30"), Some(30.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [{"codec_type":"video","avg_frame_rate":"30/1","r_frame_rate":"30/1",
                         "nb_frames":"300","width":640,"height":480,"duration":"10.000000"}],
            "format": {"duration":"10.010000"}
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = parse_probe(&probe).unwrap();
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count, 300);
        assert_eq!(info.duration, 10.0);
        assert_eq!((info.width, info.height), (640, 480));
    }

    #[test]
    fn test_parse_probe_falls_back_to_format_duration() {
        let json = r#"{
            "streams": [{"avg_frame_rate":"0/0","r_frame_rate":"25/1"}],
            "format": {"duration":"4.0"}
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = parse_probe(&probe).unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.duration, 4.0);
        assert_eq!(info.frame_count, 100);
    }

    #[test]
    fn test_parse_probe_without_stream() {
        let probe: ProbeOutput = serde_json::from_str(r#"{"streams":[]}"#).unwrap();
        assert!(matches!(parse_probe(&probe), Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_decode_error() {
        let source = FfmpegFrameSource::new();
        let err = source
            .sample(Path::new("/definitely/not/here.mp4"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not a video").unwrap();

        let source = FfmpegFrameSource::with_binaries("/nonexistent/ffmpeg", "/nonexistent/ffprobe");
        let err = source.probe(&video).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
