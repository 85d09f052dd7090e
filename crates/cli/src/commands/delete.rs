//! Delete command handler.

use clap::Args;
use visionrag_core::{config::AppConfig, AppResult};
use visionrag_index::{delete_video, Services};

/// Delete a video's index entries, catalog row and stored files
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Video ID printed by `process`
    pub video_id: String,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for video {}", self.video_id);

        let services = Services::from_config(config)?;
        let known = services.catalog.get(&self.video_id)?.is_some();
        let deleted = delete_video(&services, &self.video_id, &config.frames_dir()).await?;

        if !known && deleted == 0 {
            println!("Video {} not found", self.video_id);
        } else {
            println!("Deleted video {} ({} entries)", self.video_id, deleted);
        }

        Ok(())
    }
}
