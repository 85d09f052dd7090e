//! Speech transcription of a video's audio track.
//!
//! The audio is extracted with ffmpeg and sent to a whisper-compatible
//! server (`POST /v1/audio/transcriptions`, `response_format=verbose_json`).

use crate::ffmpeg::FfmpegFrameSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use visionrag_core::{AppError, AppResult};

/// One timed span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio of `video`. A video without audio yields no
    /// segments; segments with blank text are dropped.
    async fn transcribe(&self, video: &Path) -> AppResult<Vec<TranscriptSegment>>;
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    segments: Option<Vec<TranscriptSegment>>,
}

pub struct WhisperTranscriber {
    endpoint: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
    ffmpeg: FfmpegFrameSource,
}

impl WhisperTranscriber {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
            client: reqwest::Client::new(),
            ffmpeg: FfmpegFrameSource::new(),
        }
    }

    fn service_name(&self) -> String {
        format!("whisper at {} (model '{}')", self.endpoint, self.model)
    }

    /// Send an already extracted wav file for transcription.
    pub async fn transcribe_wav(&self, wav: Vec<u8>) -> AppResult<Vec<TranscriptSegment>> {
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| AppError::Other(format!("Invalid audio part: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let url = format!("{}/v1/audio/transcriptions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::connectivity(self.service_name(), e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::connectivity(
                self.service_name(),
                format!("API error ({}): {}", status, body),
            ));
        }

        let parsed: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Invalid transcription response: {}", e)))?;
        let segments = parsed
            .segments
            .ok_or_else(|| AppError::empty_response(self.service_name(), "segments"))?;

        Ok(segments
            .into_iter()
            .filter_map(|s| {
                let text = s.text.trim().to_string();
                (!text.is_empty()).then_some(TranscriptSegment { text, ..s })
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperTranscriber {
    #[tracing::instrument(skip(self), fields(video = %video.display()))]
    async fn transcribe(&self, video: &Path) -> AppResult<Vec<TranscriptSegment>> {
        if !self.ffmpeg.has_audio(video).await? {
            tracing::info!("No audio track found");
            return Ok(Vec::new());
        }

        let scratch = tempfile::tempdir()?;
        let wav_path = scratch.path().join("audio.wav");
        self.ffmpeg.extract_audio(video, &wav_path).await?;
        let wav = tokio::fs::read(&wav_path).await?;

        let segments = self.transcribe_wav(wav).await?;
        tracing::info!("Transcribed {} speech segments", segments.len());
        Ok(segments)
    }
}
