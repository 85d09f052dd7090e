//! VisionRAG CLI
//!
//! Main entry point for the visionrag command-line tool.
//! Processes surveillance video into a local index and answers questions about it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DeleteCommand, HealthCommand, ProcessCommand, StatsCommand, VideosCommand};
use std::path::PathBuf;
use visionrag_core::{
    config::{AppConfig, ConfigOverrides},
    logging, AppResult,
};

/// VisionRAG - question answering over CCTV footage
#[derive(Parser, Debug)]
#[command(name = "visionrag")]
#[command(about = "Question answering over CCTV footage with local models", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "VISIONRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "VISIONRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Ollama server URL
    #[arg(long, global = true, env = "OLLAMA_BASE_URL")]
    endpoint: Option<String>,

    /// Model used to answer questions
    #[arg(long, global = true, env = "OLLAMA_LLM_MODEL")]
    llm_model: Option<String>,

    /// Model used to embed captions and questions
    #[arg(long, global = true, env = "OLLAMA_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process and index a video file
    Process(ProcessCommand),

    /// Ask a question about a processed video
    Ask(AskCommand),

    /// List processed videos
    Videos(VideosCommand),

    /// Delete a processed video
    Delete(DeleteCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Check the inference server and models
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Process(_) => "process",
            Commands::Ask(_) => "ask",
            Commands::Videos(_) => "videos",
            Commands::Delete(_) => "delete",
            Commands::Stats(_) => "stats",
            Commands::Health(_) => "health",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(ConfigOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        endpoint: cli.endpoint,
        llm_model: cli.llm_model,
        embedding_model: cli.embedding_model,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("VisionRAG CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Endpoint: {}", config.ollama.endpoint);
    tracing::debug!(
        "Models: llm={}, embedding={}, caption={}",
        config.ollama.llm_model,
        config.ollama.embedding_model,
        config.ollama.caption_model
    );

    config.ensure_data_dirs()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Process(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Videos(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::parse_from([
            "visionrag",
            "ask",
            "3f2a9c01b7de",
            "Where is the car?",
            "-k",
            "5",
            "--llm-model",
            "mistral",
        ]);
        assert_eq!(cli.llm_model.as_deref(), Some("mistral"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.video_id, "3f2a9c01b7de");
                assert_eq!(cmd.question, "Where is the car?");
                assert_eq!(cmd.top_k, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_command_names() {
        let cli = Cli::parse_from(["visionrag", "stats", "--json"]);
        assert_eq!(cli.command.name(), "stats");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["visionrag", "learn"]).is_err());
    }
}
