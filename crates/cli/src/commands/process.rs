//! Process command handler.
//!
//! Samples, captions and indexes a video so it can be queried with `ask`.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use visionrag_core::{config::AppConfig, AppError, AppResult};
use visionrag_index::{process_video, ProcessOptions, ProgressEvent, ProgressReporter, SamplingMode, Services};

/// Process and index a video file
#[derive(Args, Debug)]
pub struct ProcessCommand {
    /// Path to the video file
    pub video: PathBuf,

    /// Frames per second to caption (clamped to the configured range)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Select one keyframe per visual scene instead of a fixed rate
    #[arg(long)]
    pub scenes: bool,

    /// Number of scenes to detect
    #[arg(long, requires = "scenes")]
    pub clusters: Option<usize>,

    /// Frames per second analysed during scene detection
    #[arg(long, requires = "scenes")]
    pub analysis_rate: Option<f64>,

    /// Transcribe the audio track and index the speech as well
    #[arg(long)]
    pub transcribe: bool,

    /// Keep the sampled frames as JPEG files
    #[arg(long)]
    pub save_frames: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProcessCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing process command for {:?}", self.video);
        tracing::debug!("Process options: {:?}", self);

        if !self.video.is_file() {
            return Err(AppError::Decode(format!("Video file not found: {}", self.video.display())));
        }
        let options = self.options(config)?;
        if options.transcribe && config.transcription.endpoint.is_none() {
            return Err(AppError::Config(
                "--transcribe needs a transcription endpoint (set WHISPER_URL)".to_string(),
            ));
        }

        let services = Services::from_config(config)?;
        super::ensure_models_ready(&services, config).await?;

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
        };

        let report = match process_video(&services, &self.video, &options, &progress).await {
            Ok(report) => report,
            Err(AppError::PartialIndex { indexed, source }) => {
                eprintln!(
                    "Indexing stopped after {} entries; the video is registered with partial content.",
                    indexed
                );
                return Err(AppError::PartialIndex { indexed, source });
            }
            Err(e) => return Err(e),
        };

        if self.json {
            return super::print_json(&report);
        }

        println!("Video ID: {}", report.video_id);
        println!("Source:   {}", report.original_name);
        println!(
            "Duration: {:.1}s at {:.2} fps ({}x{})",
            report.info.duration, report.info.fps, report.info.width, report.info.height
        );
        match &report.sampling {
            SamplingMode::Fixed { fps } => println!("Sampling: {} fps", fps),
            SamplingMode::Scenes { num_clusters, analysis_rate, .. } => {
                println!("Sampling: up to {} scenes (analysed at {} fps)", num_clusters, analysis_rate)
            }
        }
        println!("Captioned {} frames", report.frames_captioned);
        if self.transcribe {
            println!("Transcribed {} speech segments", report.audio_segments);
        }
        println!("Indexed {} entries", report.indexed);
        println!();
        println!("Ask about it with: visionrag ask {} \"<question>\"", report.video_id);

        Ok(())
    }

    fn options(&self, config: &AppConfig) -> AppResult<ProcessOptions> {
        for (flag, rate) in [("--fps", self.fps), ("--analysis-rate", self.analysis_rate)] {
            if let Some(rate) = rate.filter(|r| !r.is_finite()) {
                return Err(AppError::Config(format!("{} must be a finite number, got {}", flag, rate)));
            }
        }

        let mut options = ProcessOptions::from_config(config, self.fps.unwrap_or(config.sampling.default_fps));
        if self.scenes {
            options = options.with_scenes(config, self.clusters, self.analysis_rate);
        }
        options.transcribe = self.transcribe;
        options.save_frames = self.save_frames;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        cmd: ProcessCommand,
    }

    #[test]
    fn test_fixed_rate_is_clamped() {
        let config = AppConfig::default();
        let harness = Harness::parse_from(["test", "clip.mp4", "--fps", "12"]);
        let options = harness.cmd.options(&config).unwrap();
        assert_eq!(options.sampling, SamplingMode::Fixed { fps: 5.0 });
        assert!(!options.transcribe);
    }

    #[test]
    fn test_scene_flags() {
        let config = AppConfig::default();
        let harness = Harness::parse_from(["test", "clip.mp4", "--scenes", "--clusters", "4", "--transcribe"]);
        let options = harness.cmd.options(&config).unwrap();
        assert_eq!(
            options.sampling,
            SamplingMode::Scenes {
                num_clusters: 4,
                analysis_rate: 1.0,
                seed: 42
            }
        );
        assert!(options.transcribe);
    }

    #[test]
    fn test_non_finite_rates_rejected() {
        let config = AppConfig::default();
        for args in [
            vec!["test", "clip.mp4", "--fps", "NaN"],
            vec!["test", "clip.mp4", "--fps", "inf"],
            vec!["test", "clip.mp4", "--scenes", "--analysis-rate", "NaN"],
        ] {
            let harness = Harness::parse_from(args.clone());
            let err = harness.cmd.options(&config).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{:?} gave {:?}", args, err);
        }
    }

    #[tokio::test]
    async fn test_transcribe_without_endpoint_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really an mp4").unwrap();
        let mut config = AppConfig::default();
        config.transcription.endpoint = None;
        config.ollama.endpoint = "http://127.0.0.1:9".to_string();

        let harness = Harness::parse_from(["test", video.to_str().unwrap(), "--transcribe"]);
        let err = harness.cmd.execute(&config).await.unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("WHISPER_URL"));
    }

    #[test]
    fn test_clusters_require_scenes() {
        assert!(Harness::try_parse_from(["test", "clip.mp4", "--clusters", "4"]).is_err());
    }
}
