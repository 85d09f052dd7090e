//! End-to-end video processing.
//!
//! save → probe → sample (fixed rate or scene keyframes) → caption →
//! transcribe (optional) → index → register. Steps run one after another;
//! every heavy collaborator comes from [`Services`].

use crate::catalog::VideoCatalog;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::indexing::index_video;
use crate::progress::ProgressReporter;
use crate::query::AnswerModel;
use crate::store::{DistanceMetric, SqliteVectorStore, VectorStore};
use crate::types::{FrameRecord, VideoRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use visionrag_core::{AppConfig, AppError, AppResult};
use visionrag_llm::{create_client, ClientOptions, LlmClient};
use visionrag_video::{
    generate_video_id, save_frame_image, save_video, Captioner, FfmpegFrameSource, FrameSource,
    HistogramEncoder, KeyframeSelector, LlmCaptioner, SampledFrame, Transcriber, VideoInfo,
    VisionEncoder, WhisperTranscriber,
};

/// Shared handles to every external collaborator, built once per process.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn VectorStore>,
    pub catalog: Arc<VideoCatalog>,
    pub llm: Arc<dyn LlmClient>,
    pub answer_model: AnswerModel,
    pub captioner: Arc<dyn Captioner>,
    pub frame_source: Arc<dyn FrameSource>,
    pub encoder: Arc<dyn VisionEncoder>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl Services {
    /// Build the production services described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_data_dirs()?;

        let llm = create_client("ollama", &ClientOptions::from(&config.ollama))?;
        let embedder = create_provider(config)?;
        let metric = DistanceMetric::parse(&config.store.metric)?;
        let store = SqliteVectorStore::open(&config.index_path(), &config.store.collection, metric)?;
        let catalog = VideoCatalog::open(&config.index_path())?;
        let captioner = LlmCaptioner::new(llm.clone(), &config.ollama.caption_model);

        let transcriber = config.transcription.endpoint.as_ref().map(|endpoint| {
            Arc::new(WhisperTranscriber::new(
                endpoint,
                &config.transcription.model,
                Duration::from_secs(config.transcription.timeout_secs),
            )) as Arc<dyn Transcriber>
        });

        Ok(Self {
            embedder,
            store: Arc::new(store),
            catalog: Arc::new(catalog),
            llm,
            answer_model: AnswerModel::new(&config.ollama.llm_model),
            captioner: Arc::new(captioner),
            frame_source: Arc::new(FfmpegFrameSource::new()),
            encoder: Arc::new(HistogramEncoder::default()),
            transcriber,
        })
    }
}

/// How frames are chosen for captioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SamplingMode {
    /// Every `video_fps / fps`-th frame
    Fixed { fps: f64 },
    /// One keyframe per visual scene cluster
    Scenes { num_clusters: usize, analysis_rate: f64, seed: u64 },
}

impl SamplingMode {
    /// Index recorded for a sampled frame: the sample position at a fixed
    /// rate, the decoded frame number for scene keyframes.
    pub fn frame_index(&self, frame: &SampledFrame) -> usize {
        match self {
            SamplingMode::Fixed { .. } => frame.index,
            SamplingMode::Scenes { .. } => frame.frame_number as usize,
        }
    }

    fn describe(&self) -> String {
        match self {
            SamplingMode::Fixed { fps } => format!("{} fps", fps),
            SamplingMode::Scenes { num_clusters, .. } => format!("up to {} scenes", num_clusters),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub sampling: SamplingMode,
    pub transcribe: bool,
    pub save_frames: bool,
    pub batch_size: usize,
    pub videos_dir: PathBuf,
    pub frames_dir: PathBuf,
}

impl ProcessOptions {
    /// Fixed-rate options with the configured layout and batch size.
    pub fn from_config(config: &AppConfig, fps: f64) -> Self {
        Self {
            sampling: SamplingMode::Fixed {
                fps: config.clamp_fps(fps),
            },
            transcribe: false,
            save_frames: false,
            batch_size: config.store.batch_size,
            videos_dir: config.videos_dir(),
            frames_dir: config.frames_dir(),
        }
    }

    pub fn with_scenes(mut self, config: &AppConfig, num_clusters: Option<usize>, analysis_rate: Option<f64>) -> Self {
        self.sampling = SamplingMode::Scenes {
            num_clusters: num_clusters.unwrap_or(config.scenes.num_clusters).max(1),
            analysis_rate: config.clamp_fps(analysis_rate.unwrap_or(config.scenes.analysis_rate)),
            seed: config.scenes.seed,
        };
        self
    }
}

/// Summary of a processed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub video_id: String,
    pub original_name: String,
    pub stored_path: PathBuf,
    pub info: VideoInfo,
    pub sampling: SamplingMode,
    pub frames_captioned: usize,
    pub audio_segments: usize,
    pub indexed: usize,
}

/// Process one video file end to end.
///
/// # Errors
/// `AppError::Config` when transcription is requested without a
/// transcriber. `AppError::Decode` when the video cannot be read or yields
/// no frames. Captioning and embedding failures propagate; transcription
/// failures are logged and the video is indexed without audio.
///
/// On failure the stored copy, saved frames and any written entries are
/// removed, except when indexing stops part-way: the video is then
/// registered with the entries already written before the
/// `AppError::PartialIndex` is returned.
#[tracing::instrument(skip(services, options, progress), fields(source = %source.display()))]
pub async fn process_video(
    services: &Services,
    source: &Path,
    options: &ProcessOptions,
    progress: &ProgressReporter,
) -> AppResult<ProcessReport> {
    if options.transcribe && services.transcriber.is_none() {
        return Err(AppError::Config(
            "Transcription requested but no transcription endpoint is configured (set WHISPER_URL)".to_string(),
        ));
    }

    let original_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Decode(format!("Not a video file path: {}", source.display())))?;

    let created_at = Utc::now();
    let video_id = generate_video_id(&original_name, created_at);
    tracing::info!("Processing {} as video {}", original_name, video_id);

    progress.save(&original_name);
    let stored_path = save_video(source, &options.videos_dir, &video_id).await?;

    let stored = StoredVideo {
        video_id,
        original_name,
        stored_path,
        created_at,
    };

    match ingest(services, &stored, options, progress).await {
        Ok(report) => Ok(report),
        Err(e @ AppError::PartialIndex { .. }) => Err(e),
        Err(e) => {
            rollback(services, &stored, &options.frames_dir).await;
            Err(e)
        }
    }
}

/// A source video copied into the workspace, not yet registered.
struct StoredVideo {
    video_id: String,
    original_name: String,
    stored_path: PathBuf,
    created_at: DateTime<Utc>,
}

async fn ingest(
    services: &Services,
    stored: &StoredVideo,
    options: &ProcessOptions,
    progress: &ProgressReporter,
) -> AppResult<ProcessReport> {
    let video_id = &stored.video_id;
    let info = services.frame_source.probe(&stored.stored_path).await?;

    let frames = sample_frames(services, &stored.stored_path, &options.sampling).await?;
    if frames.is_empty() {
        return Err(AppError::Decode(format!(
            "No frames could be extracted from {}",
            stored.original_name
        )));
    }
    progress.sample(frames.len() as u64, &options.sampling.describe());

    let mut records = Vec::with_capacity(frames.len());
    let total = frames.len() as u64;
    for (i, frame) in frames.iter().enumerate() {
        let frame_index = options.sampling.frame_index(frame);
        if options.save_frames {
            save_frame_image(&options.frames_dir, video_id, frame_index, &frame.image).await?;
        }

        progress.caption(i as u64 + 1, total);
        let caption = services.captioner.caption(&frame.image).await?;
        tracing::debug!("Frame {} at {:.2}s: {}", frame_index, frame.timestamp_seconds, caption);
        records.push(FrameRecord::visual(frame_index, frame.timestamp_seconds, caption));
    }
    let frames_captioned = records.len();

    let audio_segments = if options.transcribe {
        let audio = transcribe(services, &stored.stored_path).await;
        progress.transcribe(audio.len() as u64);
        let count = audio.len();
        records.extend(audio);
        count
    } else {
        0
    };

    let indexed = index_video(
        services.embedder.as_ref(),
        services.store.as_ref(),
        video_id,
        &records,
        options.batch_size,
        progress,
    )
    .await;

    let register = |indexed: usize| {
        services.catalog.register(&VideoRecord {
            id: video_id.clone(),
            original_name: stored.original_name.clone(),
            stored_path: stored.stored_path.clone(),
            duration: info.duration,
            fps: info.fps,
            frames: frames_captioned,
            indexed,
            created_at: stored.created_at,
        })
    };

    let indexed = match indexed {
        Ok(n) => n,
        Err(AppError::PartialIndex { indexed, source }) => {
            register(indexed)?;
            return Err(AppError::PartialIndex { indexed, source });
        }
        Err(e) => return Err(e),
    };

    register(indexed)?;
    progress.register(video_id);

    Ok(ProcessReport {
        video_id: video_id.clone(),
        original_name: stored.original_name.clone(),
        stored_path: stored.stored_path.clone(),
        info,
        sampling: options.sampling.clone(),
        frames_captioned,
        audio_segments,
        indexed,
    })
}

/// Remove everything a failed run left behind. Errors are logged only.
async fn rollback(services: &Services, stored: &StoredVideo, frames_dir: &Path) {
    tracing::info!("Discarding partial state of video {}", stored.video_id);

    if let Err(e) = services.store.delete_by_video(&stored.video_id) {
        tracing::warn!("Failed to remove entries of {}: {}", stored.video_id, e);
    }
    if let Err(e) = tokio::fs::remove_file(&stored.stored_path).await {
        tracing::warn!("Failed to remove {}: {}", stored.stored_path.display(), e);
    }
    let frames = frames_dir.join(&stored.video_id);
    if frames.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&frames).await {
            tracing::warn!("Failed to remove {}: {}", frames.display(), e);
        }
    }
}

async fn sample_frames(
    services: &Services,
    video: &Path,
    sampling: &SamplingMode,
) -> AppResult<Vec<SampledFrame>> {
    match sampling {
        SamplingMode::Fixed { fps } => services.frame_source.sample(video, *fps).await,
        SamplingMode::Scenes {
            num_clusters,
            analysis_rate,
            seed,
        } => {
            let selector = KeyframeSelector::new(services.encoder.clone(), *num_clusters, *analysis_rate, *seed);
            selector.extract(services.frame_source.as_ref(), video).await
        }
    }
}

async fn transcribe(services: &Services, video: &Path) -> Vec<FrameRecord> {
    let Some(transcriber) = &services.transcriber else {
        return Vec::new();
    };

    match transcriber.transcribe(video).await {
        Ok(segments) => segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| FrameRecord::audio(s.start, &s.text))
            .collect(),
        Err(e) => {
            tracing::warn!("Transcription failed, indexing visual frames only: {}", e);
            Vec::new()
        }
    }
}

/// Remove a video's entries, catalog row and stored files.
///
/// Returns the number of vector entries deleted.
pub async fn delete_video(services: &Services, video_id: &str, frames_dir: &Path) -> AppResult<usize> {
    let deleted = services.store.delete_by_video(video_id)?;

    if let Some(video) = services.catalog.get(video_id)? {
        if video.stored_path.exists() {
            tokio::fs::remove_file(&video.stored_path).await?;
        }
        services.catalog.remove(video_id)?;
    }

    let frames = frames_dir.join(video_id);
    if frames.exists() {
        tokio::fs::remove_dir_all(&frames).await?;
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_options_clamp_rates() {
        let config = AppConfig::default();
        let options = ProcessOptions::from_config(&config, 60.0);
        assert_eq!(options.sampling, SamplingMode::Fixed { fps: 5.0 });

        let options = options.with_scenes(&config, Some(0), Some(0.01));
        assert_eq!(
            options.sampling,
            SamplingMode::Scenes {
                num_clusters: 1,
                analysis_rate: 0.2,
                seed: 42
            }
        );
    }

    #[test]
    fn test_scene_defaults_from_config() {
        let config = AppConfig::default();
        let options = ProcessOptions::from_config(&config, 1.0).with_scenes(&config, None, None);
        assert_eq!(
            options.sampling,
            SamplingMode::Scenes {
                num_clusters: 15,
                analysis_rate: 1.0,
                seed: 42
            }
        );
    }
}
