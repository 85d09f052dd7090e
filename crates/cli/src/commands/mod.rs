//! Command handlers for the VisionRAG CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod delete;
pub mod health;
pub mod process;
pub mod stats;
pub mod videos;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use delete::DeleteCommand;
pub use health::HealthCommand;
pub use process::ProcessCommand;
pub use stats::StatsCommand;
pub use videos::VideosCommand;

use visionrag_core::{config::AppConfig, AppError, AppResult};
use visionrag_index::{check_models, Services};

/// Refuse to run model-backed commands until the server and both models answer.
pub(crate) async fn ensure_models_ready(services: &Services, config: &AppConfig) -> AppResult<()> {
    let check = check_models(
        services.llm.as_ref(),
        services.embedder.as_ref(),
        &config.ollama.llm_model,
    )
    .await;

    if check.ready() {
        return Ok(());
    }

    let issues = check.issues(services.embedder.model_name(), &config.ollama.llm_model);
    Err(AppError::connectivity(
        format!("Ollama at {}", config.ollama.endpoint),
        issues.join(" "),
    ))
}

/// Pretty-print a JSON value to stdout.
pub(crate) fn print_json(value: &impl serde::Serialize) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
