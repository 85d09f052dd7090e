//! Health command handler.

use clap::Args;
use visionrag_core::{config::AppConfig, AppResult};
use visionrag_index::{check_models, Services};

/// Check that the inference server and models are available
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command against {}", config.ollama.endpoint);

        let services = Services::from_config(config)?;
        let check = check_models(
            services.llm.as_ref(),
            services.embedder.as_ref(),
            &config.ollama.llm_model,
        )
        .await;
        let issues = check.issues(services.embedder.model_name(), &config.ollama.llm_model);

        if self.json {
            return super::print_json(&serde_json::json!({
                "endpoint": config.ollama.endpoint,
                "ready": check.ready(),
                "check": check,
                "issues": issues,
            }));
        }

        let mark = |ok: bool| if ok { "ok" } else { "missing" };
        println!("Server ({}): {}", config.ollama.endpoint, if check.server { "ok" } else { "unreachable" });
        println!("Embedding model ({}): {}", services.embedder.model_name(), mark(check.embedding_model));
        println!("LLM model ({}): {}", config.ollama.llm_model, mark(check.llm_model));
        if !check.installed.is_empty() {
            println!("Installed models: {}", check.installed.join(", "));
        }
        for issue in &issues {
            println!("- {}", issue);
        }

        Ok(())
    }
}
