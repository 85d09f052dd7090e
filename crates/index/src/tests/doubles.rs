//! Deterministic stand-ins for external services.

use crate::catalog::VideoCatalog;
use crate::embeddings::{EmbeddingProvider, MockProvider};
use crate::pipeline::Services;
use crate::query::AnswerModel;
use crate::store::{DistanceMetric, SqliteVectorStore};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use visionrag_core::{AppError, AppResult};
use visionrag_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use visionrag_video::{
    Captioner, FrameSource, HistogramEncoder, SampledFrame, Transcriber, TranscriptSegment,
    VideoInfo,
};

/// Completer that counts calls and remembers prompts.
#[derive(Default)]
pub struct CountingLlm {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl CountingLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for CountingLlm {
    fn provider_name(&self) -> &str {
        "counting"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(LlmResponse {
            content: "A car enters at 00:00:00 and is parked by 00:00:05.".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 12),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(vec!["llama3:instruct".to_string()])
    }
}

/// Embedder that becomes unreachable after a fixed number of calls.
#[derive(Debug)]
pub struct FlakyEmbedder {
    inner: MockProvider,
    remaining: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(successes: usize) -> Self {
        Self {
            inner: MockProvider::new(64),
            remaining: AtomicUsize::new(successes),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        "flaky"
    }

    fn model_name(&self) -> &str {
        "flaky-v1"
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(AppError::connectivity("flaky embeddings (flaky-v1)", "timed out"));
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        self.inner.embed(text).await
    }
}

/// Frame source returning a fixed list of frames for any video.
pub struct ScriptedFrames {
    pub frames: Vec<SampledFrame>,
    pub requested_fps: Mutex<Vec<f64>>,
}

impl ScriptedFrames {
    pub fn new(frames: Vec<SampledFrame>) -> Self {
        Self {
            frames,
            requested_fps: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedFrames {
    async fn probe(&self, _video: &Path) -> AppResult<VideoInfo> {
        Ok(VideoInfo {
            fps: 30.0,
            frame_count: self.frames.len() as u64 * 30,
            duration: self.frames.len() as f64,
            width: 8,
            height: 8,
        })
    }

    async fn sample(&self, _video: &Path, target_fps: f64) -> AppResult<Vec<SampledFrame>> {
        self.requested_fps.lock().unwrap().push(target_fps);
        Ok(self.frames.clone())
    }
}

/// Captioner that reads the caption back from the frame bytes when they are
/// UTF-8, and otherwise describes the frame by its size.
pub struct EchoCaptioner;

#[async_trait::async_trait]
impl Captioner for EchoCaptioner {
    async fn caption(&self, image: &[u8]) -> AppResult<String> {
        match std::str::from_utf8(image) {
            Ok(text) => Ok(text.to_string()),
            Err(_) => Ok(format!("image of {} bytes", image.len())),
        }
    }
}

pub struct ScriptedTranscriber(pub AppResult<Vec<TranscriptSegment>>);

#[async_trait::async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _video: &Path) -> AppResult<Vec<TranscriptSegment>> {
        match &self.0 {
            Ok(segments) => Ok(segments.clone()),
            Err(e) => Err(AppError::Other(e.to_string())),
        }
    }
}

/// A frame whose bytes are its caption.
pub fn text_frame(index: usize, seconds: f64, caption: &str) -> SampledFrame {
    SampledFrame {
        index,
        frame_number: index as u64 * 30,
        timestamp_seconds: seconds,
        image: caption.as_bytes().to_vec(),
    }
}

/// Services backed by a temporary SQLite file and in-process doubles.
pub struct TestServices {
    pub dir: TempDir,
    pub services: Services,
    pub llm: Arc<CountingLlm>,
}

pub fn test_services(frames: Vec<SampledFrame>, embedder: Arc<dyn EmbeddingProvider>) -> TestServices {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join(".visionrag").join("index.sqlite");
    let store = SqliteVectorStore::open(&db, "video_frames", DistanceMetric::L2).unwrap();
    let catalog = VideoCatalog::open(&db).unwrap();
    let llm = Arc::new(CountingLlm::default());

    let services = Services {
        embedder,
        store: Arc::new(store),
        catalog: Arc::new(catalog),
        llm: llm.clone(),
        answer_model: AnswerModel::new("llama3:instruct"),
        captioner: Arc::new(EchoCaptioner),
        frame_source: Arc::new(ScriptedFrames::new(frames)),
        encoder: Arc::new(HistogramEncoder::default()),
        transcriber: None,
    };

    TestServices { dir, services, llm }
}
