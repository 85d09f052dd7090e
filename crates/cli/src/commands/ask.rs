//! Ask command handler.
//!
//! Answers a question about one processed video from its indexed captions.

use clap::Args;
use visionrag_core::{config::AppConfig, AppResult};
use visionrag_index::{answer, Services};

/// Ask a question about a processed video
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Video ID printed by `process`
    pub video_id: String,

    /// The question to ask
    pub question: String,

    /// Number of frames to retrieve (clamped to the configured range)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for video {}", self.video_id);
        tracing::debug!("Ask options: {:?}", self);

        let services = Services::from_config(config)?;
        super::ensure_models_ready(&services, config).await?;

        if services.catalog.get(&self.video_id)?.is_none() {
            tracing::warn!("Video {} is not in the catalog", self.video_id);
        }

        let top_k = config.clamp_top_k(self.top_k.unwrap_or(config.retrieval.default_top_k));
        let result = answer(
            services.embedder.as_ref(),
            services.store.as_ref(),
            services.llm.as_ref(),
            &services.answer_model,
            &self.video_id,
            &self.question,
            top_k,
        )
        .await?;

        if self.json {
            return super::print_json(&serde_json::json!({
                "videoId": self.video_id,
                "question": self.question,
                "topK": top_k,
                "answer": result.answer,
                "evidence": result.evidence,
            }));
        }

        if result.is_empty() {
            println!("No indexed content found for video {}.", self.video_id);
            println!("Process it first with: visionrag process <video>");
            return Ok(());
        }

        println!("Answer:");
        println!("{}", result.answer);
        println!();
        println!("Evidence:");
        for r in &result.evidence {
            println!("- [{}] {} (similarity {:.3})", r.timestamp_str, r.caption, r.similarity_score);
        }

        Ok(())
    }
}
