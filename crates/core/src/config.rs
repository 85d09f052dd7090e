//! Configuration management for VisionRAG.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`.visionrag/config.yaml` in the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! All persistent state (stored videos, saved frames, the vector index)
//! lives under `<workspace>/.visionrag/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the workspace state directory.
pub const DATA_DIR_NAME: &str = ".visionrag";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .visionrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding provider: "ollama" or "mock"
    pub embedding_provider: String,

    pub ollama: OllamaConfig,
    pub store: StoreConfig,
    pub sampling: SamplingConfig,
    pub retrieval: RetrievalConfig,
    pub scenes: SceneConfig,
    pub transcription: TranscriptionConfig,
}

/// Local inference server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OllamaConfig {
    pub endpoint: String,
    pub embedding_model: String,
    pub llm_model: String,
    /// Vision-language model used for frame captions
    pub caption_model: String,
    pub embedding_timeout_secs: u64,
    pub completion_timeout_secs: u64,
    pub health_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            llm_model: "llama3:instruct".to_string(),
            caption_model: "llava".to_string(),
            embedding_timeout_secs: 30,
            completion_timeout_secs: 120,
            health_timeout_secs: 5,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Collection holding every indexed video
    pub collection: String,
    /// Distance metric used when the collection is first created: "l2" or "cosine"
    pub metric: String,
    /// Entries embedded before each upsert
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: "video_frames".to_string(),
            metric: "l2".to_string(),
            batch_size: 16,
        }
    }
}

/// Fixed-rate frame sampling bounds, in frames per second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    pub default_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            default_fps: 1.0,
            min_fps: 0.2,
            max_fps: 5.0,
        }
    }
}

/// Retrieval depth bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub min_top_k: usize,
    pub max_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            min_top_k: 3,
            max_top_k: 20,
        }
    }
}

/// Scene detection (keyframe clustering) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub num_clusters: usize,
    /// Analysis sampling rate in frames per second
    pub analysis_rate: f64,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            num_clusters: 15,
            analysis_rate: 1.0,
            seed: 42,
        }
    }
}

/// Speech-to-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscriptionConfig {
    /// Whisper-compatible server base URL; transcription is unavailable when unset
    pub endpoint: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "whisper-1".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    embedding_provider: Option<String>,
    ollama: Option<OllamaConfig>,
    store: Option<StoreConfig>,
    sampling: Option<SamplingConfig>,
    retrieval: Option<RetrievalConfig>,
    scenes: Option<SceneConfig>,
    transcription: Option<TranscriptionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

/// Command-line overrides applied on top of file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub llm_model: Option<String>,
    pub embedding_model: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            embedding_provider: "ollama".to_string(),
            ollama: OllamaConfig::default(),
            store: StoreConfig::default(),
            sampling: SamplingConfig::default(),
            retrieval: RetrievalConfig::default(),
            scenes: SceneConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `VISIONRAG_WORKSPACE`: Override workspace path
    /// - `VISIONRAG_CONFIG`: Path to config file
    /// - `VISIONRAG_EMBEDDING_PROVIDER`: "ollama" or "mock"
    /// - `OLLAMA_BASE_URL`: Inference server endpoint
    /// - `OLLAMA_EMBEDDING_MODEL`, `OLLAMA_LLM_MODEL`, `OLLAMA_CAPTION_MODEL`: Model names
    /// - `WHISPER_URL`: Transcription server endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use visionrag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(ConfigOverrides::default())
    }

    /// Load configuration with command-line overrides.
    ///
    /// The workspace and config file overrides are applied before the file
    /// is read; everything else is applied last.
    pub fn load_with(overrides: ConfigOverrides) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("VISIONRAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = &overrides.workspace {
            config.workspace = workspace.clone();
        }

        if let Ok(config_file) = std::env::var("VISIONRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = &overrides.config_file {
            config.config_file = Some(config_file.clone());
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.data_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();
        Ok(config.with_overrides(overrides))
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("VISIONRAG_EMBEDDING_PROVIDER") {
            self.embedding_provider = provider;
        }
        if let Ok(endpoint) = std::env::var("OLLAMA_BASE_URL") {
            self.ollama.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("OLLAMA_EMBEDDING_MODEL") {
            self.ollama.embedding_model = model;
        }
        if let Ok(model) = std::env::var("OLLAMA_LLM_MODEL") {
            self.ollama.llm_model = model;
        }
        if let Ok(model) = std::env::var("OLLAMA_CAPTION_MODEL") {
            self.ollama.caption_model = model;
        }
        if let Ok(endpoint) = std::env::var("WHISPER_URL") {
            self.transcription.endpoint = Some(endpoint);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(config_file))
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(provider) = file.embedding_provider {
            result.embedding_provider = provider;
        }
        if let Some(ollama) = file.ollama {
            result.ollama = ollama;
        }
        if let Some(store) = file.store {
            result.store = store;
        }
        if let Some(sampling) = file.sampling {
            result.sampling = sampling;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(scenes) = file.scenes {
            result.scenes = scenes;
        }
        if let Some(transcription) = file.transcription {
            result.transcription = transcription;
        }

        result
    }

    /// Apply CLI overrides, which take precedence over file and environment.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }
        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }
        if let Some(endpoint) = overrides.endpoint {
            self.ollama.endpoint = endpoint;
        }
        if let Some(model) = overrides.llm_model {
            self.ollama.llm_model = model;
        }
        if let Some(model) = overrides.embedding_model {
            self.ollama.embedding_model = model;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the workspace state directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(DATA_DIR_NAME)
    }

    /// Directory holding stored copies of processed videos.
    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir().join("videos")
    }

    /// Directory holding saved frame images, one subdirectory per video.
    pub fn frames_dir(&self) -> PathBuf {
        self.data_dir().join("frames")
    }

    /// SQLite file backing the vector store and the video catalog.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir().join("index.sqlite")
    }

    /// Ensure the state directory layout exists.
    pub fn ensure_data_dirs(&self) -> AppResult<()> {
        for dir in [self.data_dir(), self.videos_dir(), self.frames_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Clamp a requested retrieval depth into the configured range.
    pub fn clamp_top_k(&self, top_k: usize) -> usize {
        top_k.clamp(self.retrieval.min_top_k, self.retrieval.max_top_k)
    }

    /// Clamp a requested sampling rate into the configured range.
    /// NaN falls back to the default rate.
    pub fn clamp_fps(&self, fps: f64) -> f64 {
        let fps = if fps.is_nan() { self.sampling.default_fps } else { fps };
        fps.clamp(self.sampling.min_fps, self.sampling.max_fps)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "mock"];
        if !known_providers.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                known_providers.join(", ")
            )));
        }

        if !self.ollama.endpoint.starts_with("http://")
            && !self.ollama.endpoint.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "Ollama endpoint must be an http(s) URL: {}",
                self.ollama.endpoint
            )));
        }

        if !["l2", "cosine"].contains(&self.store.metric.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown distance metric: {}. Supported: l2, cosine",
                self.store.metric
            )));
        }

        if self.store.collection.trim().is_empty() {
            return Err(AppError::Config("Collection name must not be empty".to_string()));
        }

        if self.store.batch_size == 0 {
            return Err(AppError::Config("Store batch size must be at least 1".to_string()));
        }

        let s = &self.sampling;
        if !(s.min_fps > 0.0 && s.min_fps <= s.default_fps && s.default_fps <= s.max_fps) {
            return Err(AppError::Config(format!(
                "Sampling rates must satisfy 0 < min ({}) <= default ({}) <= max ({})",
                s.min_fps, s.default_fps, s.max_fps
            )));
        }

        let r = &self.retrieval;
        if !(r.min_top_k >= 1 && r.min_top_k <= r.default_top_k && r.default_top_k <= r.max_top_k)
        {
            return Err(AppError::Config(format!(
                "Top-k bounds must satisfy 1 <= min ({}) <= default ({}) <= max ({})",
                r.min_top_k, r.default_top_k, r.max_top_k
            )));
        }

        if self.scenes.num_clusters == 0 || self.scenes.analysis_rate <= 0.0 {
            return Err(AppError::Config(
                "Scene detection needs at least one cluster and a positive analysis rate"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
