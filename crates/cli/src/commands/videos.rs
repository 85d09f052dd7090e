//! Videos command handler.

use clap::Args;
use visionrag_core::{config::AppConfig, AppResult};
use visionrag_index::VideoCatalog;

/// List processed videos
#[derive(Args, Debug)]
pub struct VideosCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl VideosCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing videos command");

        let catalog = VideoCatalog::open(&config.index_path())?;
        let videos = catalog.list()?;

        if self.json {
            return super::print_json(&videos);
        }

        if videos.is_empty() {
            println!("No videos processed yet");
            return Ok(());
        }

        for video in &videos {
            println!(
                "{}  {}  {:.1}s  {} frames  {} entries  {}",
                video.id,
                video.original_name,
                video.duration,
                video.frames,
                video.indexed,
                video.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Ok(())
    }
}
